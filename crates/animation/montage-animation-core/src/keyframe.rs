//! Keyframes and time-sorted keyframe sequences.
//!
//! A segment between frames `i` and `i+1` is shaped by the easing stored on frame
//! `i+1` (the frame being approached). Outside the keyframe range the sequence
//! clamps to its first or last value.

use serde::{Deserialize, Deserializer, Serialize};

use montage_api_core::{Value, ValueKind};

use crate::ease::Easing;
use crate::error::AnimationError;
use crate::interp::functions::{Animator, Interpolate};
use crate::sampling::find_segment;
use crate::time::Time;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyFrame<T> {
    pub time: Time,
    pub value: T,
    #[serde(default)]
    pub easing: Easing,
}

impl<T> KeyFrame<T> {
    pub fn new(time: Time, value: T, easing: Easing) -> Self {
        Self {
            time,
            value,
            easing,
        }
    }

    pub fn linear(time: Time, value: T) -> Self {
        Self::new(time, value, Easing::Linear)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct KeyFrameAnimation<T> {
    keyframes: Vec<KeyFrame<T>>,
}

impl<T> Default for KeyFrameAnimation<T> {
    fn default() -> Self {
        Self {
            keyframes: Vec::new(),
        }
    }
}

impl<T> KeyFrameAnimation<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from frames in any order. Frames with equal times keep their relative order.
    pub fn from_keyframes(frames: impl IntoIterator<Item = KeyFrame<T>>) -> Self {
        let mut keyframes: Vec<KeyFrame<T>> = frames.into_iter().collect();
        keyframes.sort_by_key(|k| k.time);
        Self { keyframes }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    pub fn keyframes(&self) -> &[KeyFrame<T>] {
        &self.keyframes
    }

    pub fn get(&self, index: usize) -> Option<&KeyFrame<T>> {
        self.keyframes.get(index)
    }

    /// Index at which a frame at `time` would be inserted: after any frames at the same time.
    pub fn insertion_index(&self, time: Time) -> usize {
        self.keyframes.partition_point(|k| k.time <= time)
    }

    /// Insert keeping time order; returns the index the frame landed at.
    pub fn insert(&mut self, frame: KeyFrame<T>) -> usize {
        let index = self.insertion_index(frame.time);
        self.keyframes.insert(index, frame);
        index
    }

    /// Insert at `index` when that keeps time order, otherwise fall back to
    /// [`KeyFrameAnimation::insert`]. Used to put a removed frame back exactly where
    /// it was among frames sharing its time.
    pub fn insert_at(&mut self, index: usize, frame: KeyFrame<T>) -> usize {
        let fits = index <= self.keyframes.len()
            && index
                .checked_sub(1)
                .and_then(|i| self.keyframes.get(i))
                .map_or(true, |prev| prev.time <= frame.time)
            && self
                .keyframes
                .get(index)
                .map_or(true, |next| frame.time <= next.time);
        if !fits {
            return self.insert(frame);
        }
        self.keyframes.insert(index, frame);
        index
    }

    pub fn remove(&mut self, index: usize) -> Result<KeyFrame<T>, AnimationError> {
        if index >= self.keyframes.len() {
            return Err(AnimationError::IndexOutOfRange {
                index,
                len: self.keyframes.len(),
            });
        }
        Ok(self.keyframes.remove(index))
    }

    /// Remove every frame, returning them in time order.
    pub fn clear(&mut self) -> Vec<KeyFrame<T>> {
        std::mem::take(&mut self.keyframes)
    }

    /// First and last keyframe times.
    pub fn time_range(&self) -> Option<(Time, Time)> {
        match (self.keyframes.first(), self.keyframes.last()) {
            (Some(first), Some(last)) => Some((first.time, last.time)),
            _ => None,
        }
    }

    /// Whether this animation supplies a value at `t`. Any non-empty animation does,
    /// since evaluation clamps outside the keyframe range.
    pub fn covers(&self, _t: Time) -> bool {
        !self.keyframes.is_empty()
    }
}

impl<T: Clone> KeyFrameAnimation<T> {
    /// Sample at `t` with an explicit animator. `None` when there are no keyframes.
    pub fn evaluate_with<A>(&self, t: Time, animator: &A) -> Option<T>
    where
        A: Animator<T> + ?Sized,
    {
        if self.keyframes.is_empty() {
            return None;
        }
        let (i0, i1, lt) = find_segment(&self.keyframes, t);
        let left = &self.keyframes[i0];
        if i0 == i1 {
            return Some(left.value.clone());
        }
        let right = &self.keyframes[i1];
        let progress = right.easing.ease(lt);
        Some(animator.interpolate(progress, &left.value, &right.value))
    }

    pub fn try_evaluate_with<A>(&self, t: Time, animator: &A) -> Result<T, AnimationError>
    where
        A: Animator<T> + ?Sized,
    {
        self.evaluate_with(t, animator)
            .ok_or(AnimationError::EmptyAnimation)
    }
}

impl<T: Clone + Interpolate> KeyFrameAnimation<T> {
    /// Sample at `t` with the type's default animator.
    pub fn evaluate(&self, t: Time) -> Option<T> {
        self.evaluate_with(t, &DefaultAnimator)
    }
}

struct DefaultAnimator;

impl<T: Interpolate> Animator<T> for DefaultAnimator {
    fn interpolate(&self, progress: f32, old: &T, new: &T) -> T {
        T::interpolate(progress, old, new)
    }
}

impl KeyFrameAnimation<Value> {
    /// Kind of the first keyframe, if any.
    pub fn kind(&self) -> Option<ValueKind> {
        self.keyframes.first().map(|k| k.value.kind())
    }

    /// Verify every keyframe holds a value of `expected` kind.
    pub fn check_kind(&self, expected: ValueKind) -> Result<(), AnimationError> {
        for (index, frame) in self.keyframes.iter().enumerate() {
            let actual = frame.value.kind();
            if actual != expected {
                return Err(AnimationError::KindMismatch {
                    index,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for KeyFrameAnimation<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let frames = Vec::<KeyFrame<T>>::deserialize(deserializer)?;
        Ok(Self::from_keyframes(frames))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Time {
        Time::from_secs(s).unwrap()
    }

    #[test]
    fn insert_keeps_time_order() {
        let mut anim = KeyFrameAnimation::new();
        anim.insert(KeyFrame::linear(secs(2.0), 2.0f32));
        anim.insert(KeyFrame::linear(secs(0.0), 0.0));
        let idx = anim.insert(KeyFrame::linear(secs(1.0), 1.0));
        assert_eq!(idx, 1);
        let times: Vec<f64> = anim.keyframes().iter().map(|k| k.time.as_secs()).collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn empty_animation_yields_nothing() {
        let anim: KeyFrameAnimation<f32> = KeyFrameAnimation::new();
        assert_eq!(anim.evaluate(secs(1.0)), None);
        assert!(!anim.covers(secs(1.0)));
    }

    #[test]
    fn single_frame_holds_everywhere() {
        let anim = KeyFrameAnimation::from_keyframes([KeyFrame::linear(secs(1.0), 10i32)]);
        assert_eq!(anim.evaluate(secs(0.0)), Some(10));
        assert_eq!(anim.evaluate(secs(1.0)), Some(10));
        assert_eq!(anim.evaluate(secs(5.0)), Some(10));
    }

    #[test]
    fn right_frame_easing_shapes_segment() {
        let anim = KeyFrameAnimation::from_keyframes([
            KeyFrame::linear(secs(0.0), 0.0f32),
            KeyFrame::new(secs(1.0), 100.0, Easing::Hold),
        ]);
        assert_eq!(anim.evaluate(secs(0.5)), Some(0.0));
        assert_eq!(anim.evaluate(secs(1.0)), Some(100.0));
    }

    #[test]
    fn insert_at_respects_order() {
        let mut anim = KeyFrameAnimation::from_keyframes([
            KeyFrame::linear(secs(1.0), 1.0f32),
            KeyFrame::linear(secs(1.0), 2.0),
        ]);
        assert_eq!(anim.insert_at(0, KeyFrame::linear(secs(1.0), 0.0)), 0);
        assert_eq!(anim.keyframes()[0].value, 0.0);
        // Out of order: lands by time instead.
        assert_eq!(anim.insert_at(0, KeyFrame::linear(secs(2.0), 9.0)), 3);
    }

    #[test]
    fn remove_out_of_range_is_error() {
        let mut anim = KeyFrameAnimation::from_keyframes([KeyFrame::linear(secs(0.0), 1.0f32)]);
        assert_eq!(
            anim.remove(3),
            Err(AnimationError::IndexOutOfRange { index: 3, len: 1 })
        );
        assert!(anim.remove(0).is_ok());
        assert!(anim.is_empty());
    }

    #[test]
    fn value_kind_check() {
        let anim = KeyFrameAnimation::from_keyframes([
            KeyFrame::linear(secs(0.0), Value::Float(0.0)),
            KeyFrame::linear(secs(1.0), Value::Int(1)),
        ]);
        assert_eq!(anim.kind(), Some(ValueKind::Float));
        assert!(matches!(
            anim.check_kind(ValueKind::Float),
            Err(AnimationError::KindMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn deserialize_sorts_frames() {
        let json = r#"[
            {"time": 2.0, "value": 20.0},
            {"time": 1.0, "value": 10.0, "easing": "quad-in"}
        ]"#;
        let anim: KeyFrameAnimation<f32> = serde_json::from_str(json).unwrap();
        assert_eq!(anim.keyframes()[0].value, 10.0);
        assert_eq!(anim.keyframes()[0].easing, Easing::QuadIn);
    }
}
