//! Segment lookup over time-sorted keyframes.

use crate::keyframe::KeyFrame;
use crate::time::Time;

/// Find the segment [i, i+1] that contains `t`, and return (i, i+1, local_t),
/// where local_t is normalized to [0, 1] between frames[i].time .. frames[i+1].time.
/// Edge cases:
/// - If t < first.time, returns (0, 0, 0) and caller should pick frames[0].
/// - If t >= last.time, returns (last, last, 0) and caller should pick frames[last].
/// - Frames sharing a time: the later one wins once t reaches that time.
pub fn find_segment<T>(frames: &[KeyFrame<T>], t: Time) -> (usize, usize, f32) {
    let n = frames.len();
    if n <= 1 || t < frames[0].time {
        return (0, 0, 0.0);
    }
    if t >= frames[n - 1].time {
        return (n - 1, n - 1, 0.0);
    }
    // First frame strictly after t; 1 <= i1 <= n-1 given the guards above.
    let i1 = frames.partition_point(|k| k.time <= t);
    let i0 = i1 - 1;
    let t0 = frames[i0].time.as_secs();
    let t1 = frames[i1].time.as_secs();
    let denom = (t1 - t0).max(f64::EPSILON);
    let lt = ((t.as_secs() - t0) / denom) as f32;
    (i0, i1, lt.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ease::Easing;

    fn frames(times: &[i64]) -> Vec<KeyFrame<f32>> {
        times
            .iter()
            .map(|&ms| KeyFrame::new(Time::from_millis(ms), 0.0, Easing::Linear))
            .collect()
    }

    #[test]
    fn clamps_outside_range() {
        let f = frames(&[0, 1000]);
        assert_eq!(find_segment(&f, Time::from_millis(-5)), (0, 0, 0.0));
        assert_eq!(find_segment(&f, Time::from_millis(5000)), (1, 1, 0.0));
    }

    #[test]
    fn locates_interior_segment() {
        let f = frames(&[0, 1000, 2000]);
        let (i0, i1, lt) = find_segment(&f, Time::from_millis(1500));
        assert_eq!((i0, i1), (1, 2));
        assert!((lt - 0.5).abs() < 1e-6);
    }

    #[test]
    fn duplicate_times_pick_later_frame() {
        let f = frames(&[0, 1000, 1000, 2000]);
        let (i0, i1, lt) = find_segment(&f, Time::from_millis(1000));
        assert_eq!((i0, i1), (2, 3));
        assert_eq!(lt, 0.0);
    }

    #[test]
    fn duplicate_first_times_pick_later_frame() {
        let f = frames(&[500, 500, 1000]);
        let (i0, i1, lt) = find_segment(&f, Time::from_millis(500));
        assert_eq!((i0, i1), (1, 2));
        assert_eq!(lt, 0.0);
        assert_eq!(find_segment(&f, Time::from_millis(499)), (0, 0, 0.0));
    }
}
