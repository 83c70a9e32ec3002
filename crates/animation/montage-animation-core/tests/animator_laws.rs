use approx::assert_abs_diff_eq;
use montage_animation_core::{Animator, AnimatorRegistry, ColorAnimator, LinearAnimator};
use montage_api_core::{Color, CornerRadius, Matrix4, Size, Thickness, Value};

fn sample_pairs() -> Vec<(Value, Value)> {
    vec![
        (Value::Byte(3), Value::Byte(250)),
        (Value::Int(-40), Value::Int(17)),
        (Value::Float(0.1), Value::Float(0.3)),
        (Value::Vec2([0.1, -2.0]), Value::Vec2([7.3, 2.2])),
        (Value::vec3(0.1, 0.2, 0.3), Value::vec3(-1.7, 9.1, 3.3)),
        (Value::Vec4([0.0, 0.7, 1.3, 9.9]), Value::Vec4([4.4, -0.7, 0.3, 1.1])),
        (
            Value::Matrix4(Matrix4::IDENTITY),
            Value::Matrix4(Matrix4::translation(1.1, 2.2, 3.3)),
        ),
        (
            Value::Size(Size::new(1.5, 2.5)),
            Value::Size(Size::new(1920.0, 1080.0)),
        ),
        (
            Value::Thickness(Thickness::uniform(0.3)),
            Value::Thickness(Thickness::new(1.0, 2.0, 3.0, 4.0)),
        ),
        (
            Value::CornerRadius(CornerRadius::uniform(0.7)),
            Value::CornerRadius(CornerRadius::new(4.0, 3.0, 2.0, 1.0)),
        ),
        (
            Value::Color(Color::argb(10, 20, 30, 40)),
            Value::Color(Color::argb(250, 200, 150, 100)),
        ),
        (Value::Bool(false), Value::Bool(true)),
        (Value::text("left"), Value::text("right")),
    ]
}

#[test]
fn endpoints_are_exact_for_every_kind() {
    let reg = AnimatorRegistry::with_builtins();
    for (a, b) in sample_pairs() {
        assert_eq!(reg.interpolate(0.0, &a, &b), a, "progress 0 for {:?}", a.kind());
        assert_eq!(reg.interpolate(1.0, &a, &b), b, "progress 1 for {:?}", a.kind());
    }
}

#[test]
fn identical_endpoints_are_fixed_points() {
    let reg = AnimatorRegistry::with_builtins();
    for (a, _) in sample_pairs() {
        for step in 0..=10 {
            let t = step as f32 / 10.0;
            assert_eq!(reg.interpolate(t, &a, &a), a, "t={t} for {:?}", a.kind());
        }
    }
}

#[test]
fn opaque_color_blend_is_monotonic() {
    let from = Color::rgb(255, 10, 128);
    let to = Color::rgb(0, 240, 128);
    let mut prev = from;
    for step in 1..=100 {
        let t = step as f32 / 100.0;
        let c = ColorAnimator.interpolate(t, &from, &to);
        assert!(c.r <= prev.r, "red rose at t={t}");
        assert!(c.g >= prev.g, "green fell at t={t}");
        assert_eq!(c.b, 128);
        assert_eq!(c.a, 255);
        prev = c;
    }
    assert_eq!(prev, to);
}

#[test]
fn linear_scalar_midpoints() {
    let v: f32 = LinearAnimator.interpolate(0.25, &0.0f32, &100.0f32);
    assert_abs_diff_eq!(v, 25.0, epsilon = 1e-6);
    let s: Size = LinearAnimator.interpolate(0.5, &Size::new(0.0, 10.0), &Size::new(10.0, 20.0));
    assert_abs_diff_eq!(s.width, 5.0, epsilon = 1e-6);
    assert_abs_diff_eq!(s.height, 15.0, epsilon = 1e-6);
}
