//! Interpolation helpers:
//! - LinearAnimator (component-wise lerp, byte/int rounding)
//! - ColorAnimator (RGB blended in linear light, alpha in encoded space)
//! - HoldAnimator (step semantics for discrete kinds)
//! - interpolate_value (dispatch over Value kinds, fail-soft on mismatch)

use montage_api_core::{Color, CornerRadius, Matrix4, Size, Thickness, Value};

/// Pure interpolation between two values of `T`. `progress` is the eased segment
/// progress; it may leave [0,1] for overshooting curves.
pub trait Animator<T> {
    fn interpolate(&self, progress: f32, old: &T, new: &T) -> T;
}

/// Linear interpolation of scalars. Exact at both endpoints.
#[inline]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    if t == 1.0 {
        return b;
    }
    a + (b - a) * t
}

#[inline]
pub fn lerp_vec2(a: [f32; 2], b: [f32; 2], t: f32) -> [f32; 2] {
    [lerp_f32(a[0], b[0], t), lerp_f32(a[1], b[1], t)]
}

#[inline]
pub fn lerp_vec3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        lerp_f32(a[0], b[0], t),
        lerp_f32(a[1], b[1], t),
        lerp_f32(a[2], b[2], t),
    ]
}

#[inline]
pub fn lerp_vec4(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    [
        lerp_f32(a[0], b[0], t),
        lerp_f32(a[1], b[1], t),
        lerp_f32(a[2], b[2], t),
        lerp_f32(a[3], b[3], t),
    ]
}

/// sRGB electro-optical transfer: encoded [0,1] -> linear light.
#[inline]
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Inverse of [`srgb_to_linear`].
#[inline]
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[inline]
fn unit_to_byte(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Straight `old + (new - old) * progress` for numeric and geometric kinds.
#[derive(Copy, Clone, Debug, Default)]
pub struct LinearAnimator;

impl Animator<f32> for LinearAnimator {
    fn interpolate(&self, progress: f32, old: &f32, new: &f32) -> f32 {
        lerp_f32(*old, *new, progress)
    }
}

impl Animator<u8> for LinearAnimator {
    fn interpolate(&self, progress: f32, old: &u8, new: &u8) -> u8 {
        let a = f32::from(*old) / 255.0;
        let b = f32::from(*new) / 255.0;
        unit_to_byte(lerp_f32(a, b, progress))
    }
}

impl Animator<i32> for LinearAnimator {
    fn interpolate(&self, progress: f32, old: &i32, new: &i32) -> i32 {
        if progress == 1.0 {
            return *new;
        }
        let a = f64::from(*old);
        let b = f64::from(*new);
        let v = a + (b - a) * f64::from(progress);
        v.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
    }
}

impl Animator<[f32; 2]> for LinearAnimator {
    fn interpolate(&self, progress: f32, old: &[f32; 2], new: &[f32; 2]) -> [f32; 2] {
        lerp_vec2(*old, *new, progress)
    }
}

impl Animator<[f32; 3]> for LinearAnimator {
    fn interpolate(&self, progress: f32, old: &[f32; 3], new: &[f32; 3]) -> [f32; 3] {
        lerp_vec3(*old, *new, progress)
    }
}

impl Animator<[f32; 4]> for LinearAnimator {
    fn interpolate(&self, progress: f32, old: &[f32; 4], new: &[f32; 4]) -> [f32; 4] {
        lerp_vec4(*old, *new, progress)
    }
}

impl Animator<Matrix4> for LinearAnimator {
    fn interpolate(&self, progress: f32, old: &Matrix4, new: &Matrix4) -> Matrix4 {
        let mut out = [0.0f32; 16];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = lerp_f32(old.0[i], new.0[i], progress);
        }
        Matrix4(out)
    }
}

impl Animator<Size> for LinearAnimator {
    fn interpolate(&self, progress: f32, old: &Size, new: &Size) -> Size {
        Size::new(
            lerp_f32(old.width, new.width, progress),
            lerp_f32(old.height, new.height, progress),
        )
    }
}

impl Animator<Thickness> for LinearAnimator {
    fn interpolate(&self, progress: f32, old: &Thickness, new: &Thickness) -> Thickness {
        Thickness::new(
            lerp_f32(old.left, new.left, progress),
            lerp_f32(old.top, new.top, progress),
            lerp_f32(old.right, new.right, progress),
            lerp_f32(old.bottom, new.bottom, progress),
        )
    }
}

impl Animator<CornerRadius> for LinearAnimator {
    fn interpolate(&self, progress: f32, old: &CornerRadius, new: &CornerRadius) -> CornerRadius {
        CornerRadius::new(
            lerp_f32(old.top_left, new.top_left, progress),
            lerp_f32(old.top_right, new.top_right, progress),
            lerp_f32(old.bottom_right, new.bottom_right, progress),
            lerp_f32(old.bottom_left, new.bottom_left, progress),
        )
    }
}

/// Blends RGB in linear light and alpha in encoded space, then rounds each channel.
#[derive(Copy, Clone, Debug, Default)]
pub struct ColorAnimator;

impl ColorAnimator {
    #[inline]
    fn channel(progress: f32, a: u8, b: u8) -> u8 {
        let la = srgb_to_linear(f32::from(a) / 255.0);
        let lb = srgb_to_linear(f32::from(b) / 255.0);
        let blended = lerp_f32(la, lb, progress).max(0.0);
        unit_to_byte(linear_to_srgb(blended))
    }
}

impl Animator<Color> for ColorAnimator {
    fn interpolate(&self, progress: f32, old: &Color, new: &Color) -> Color {
        let alpha = lerp_f32(f32::from(old.a) / 255.0, f32::from(new.a) / 255.0, progress);
        Color::argb(
            unit_to_byte(alpha),
            Self::channel(progress, old.r, new.r),
            Self::channel(progress, old.g, new.g),
            Self::channel(progress, old.b, new.b),
        )
    }
}

/// Step semantics: the old value holds until progress reaches 1.
#[derive(Copy, Clone, Debug, Default)]
pub struct HoldAnimator;

impl<T: Clone> Animator<T> for HoldAnimator {
    fn interpolate(&self, progress: f32, old: &T, new: &T) -> T {
        if progress >= 1.0 {
            new.clone()
        } else {
            old.clone()
        }
    }
}

/// Default animator for a value type, used by [`crate::KeyFrameAnimation::evaluate`].
pub trait Interpolate: Sized {
    fn interpolate(progress: f32, old: &Self, new: &Self) -> Self;
}

macro_rules! impl_interpolate {
    ($animator:expr => $($ty:ty),+ $(,)?) => {
        $(
            impl Interpolate for $ty {
                #[inline]
                fn interpolate(progress: f32, old: &Self, new: &Self) -> Self {
                    Animator::<$ty>::interpolate(&$animator, progress, old, new)
                }
            }
        )+
    };
}

impl_interpolate!(LinearAnimator => f32, u8, i32, [f32; 2], [f32; 3], [f32; 4], Matrix4, Size, Thickness, CornerRadius);
impl_interpolate!(ColorAnimator => Color);
impl_interpolate!(HoldAnimator => bool, String);

impl Interpolate for Value {
    fn interpolate(progress: f32, old: &Self, new: &Self) -> Self {
        interpolate_value(progress, old, new)
    }
}

/// Interpolation across Value kinds with the built-in animators.
pub fn interpolate_value(progress: f32, a: &Value, b: &Value) -> Value {
    let lin = LinearAnimator;
    match (a, b) {
        (Value::Byte(va), Value::Byte(vb)) => Value::Byte(lin.interpolate(progress, va, vb)),
        (Value::Int(va), Value::Int(vb)) => Value::Int(lin.interpolate(progress, va, vb)),
        (Value::Float(va), Value::Float(vb)) => Value::Float(lin.interpolate(progress, va, vb)),
        (Value::Vec2(va), Value::Vec2(vb)) => Value::Vec2(lin.interpolate(progress, va, vb)),
        (Value::Vec3(va), Value::Vec3(vb)) => Value::Vec3(lin.interpolate(progress, va, vb)),
        (Value::Vec4(va), Value::Vec4(vb)) => Value::Vec4(lin.interpolate(progress, va, vb)),
        (Value::Matrix4(va), Value::Matrix4(vb)) => {
            Value::Matrix4(lin.interpolate(progress, va, vb))
        }
        (Value::Size(va), Value::Size(vb)) => Value::Size(lin.interpolate(progress, va, vb)),
        (Value::Thickness(va), Value::Thickness(vb)) => {
            Value::Thickness(lin.interpolate(progress, va, vb))
        }
        (Value::CornerRadius(va), Value::CornerRadius(vb)) => {
            Value::CornerRadius(lin.interpolate(progress, va, vb))
        }
        (Value::Color(va), Value::Color(vb)) => {
            Value::Color(ColorAnimator.interpolate(progress, va, vb))
        }
        (Value::Bool(_), Value::Bool(_)) | (Value::Text(_), Value::Text(_)) => {
            HoldAnimator.interpolate(progress, a, b)
        }
        // Fallback: if types mismatch, prefer left (fail-soft).
        _ => a.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_rounds_to_nearest() {
        // 0 -> 255 at 0.5 is 127.5, which rounds up rather than truncating.
        assert_eq!(LinearAnimator.interpolate(0.5, &0u8, &255u8), 128);
        assert_eq!(LinearAnimator.interpolate(0.3, &10u8, &20u8), 13);
    }

    #[test]
    fn color_midpoint_is_brighter_than_gamma_lerp() {
        let black = Color::BLACK;
        let white = Color::WHITE;
        let mid = ColorAnimator.interpolate(0.5, &black, &white);
        // Linear-light midpoint of black and white encodes to ~188, not 128.
        assert_eq!(mid.r, 188);
        assert_eq!(mid.r, mid.g);
        assert_eq!(mid.a, 255);
    }

    #[test]
    fn color_alpha_is_not_gamma_corrected() {
        let a = Color::argb(0, 0, 0, 0);
        let b = Color::argb(255, 0, 0, 0);
        assert_eq!(ColorAnimator.interpolate(0.5, &a, &b).a, 128);
    }

    #[test]
    fn hold_switches_only_at_end() {
        assert!(!HoldAnimator.interpolate(0.9, &false, &true));
        assert!(HoldAnimator.interpolate(1.0, &false, &true));
    }

    #[test]
    fn value_mismatch_prefers_left() {
        let out = interpolate_value(0.5, &Value::Float(1.0), &Value::Int(3));
        assert_eq!(out, Value::Float(1.0));
    }
}
