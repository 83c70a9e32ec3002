//! Value: runtime instances stored in property slots and keyframes.
//! Continuous components use f32, matching the animator math.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::color::Color;
use crate::geometry::{CornerRadius, Matrix4, Size, Thickness};

/// Coarse kind of a [`Value`], used as the declared type of a property and as the
/// dispatch key for interpolation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Bool,
    Byte,
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Matrix4,
    Size,
    Thickness,
    CornerRadius,
    Color,
    Text,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Bool => "Bool",
            ValueKind::Byte => "Byte",
            ValueKind::Int => "Int",
            ValueKind::Float => "Float",
            ValueKind::Vec2 => "Vec2",
            ValueKind::Vec3 => "Vec3",
            ValueKind::Vec4 => "Vec4",
            ValueKind::Matrix4 => "Matrix4",
            ValueKind::Size => "Size",
            ValueKind::Thickness => "Thickness",
            ValueKind::CornerRadius => "CornerRadius",
            ValueKind::Color => "Color",
            ValueKind::Text => "Text",
        }
    }

    /// Whether values of this kind blend continuously. Discrete kinds hold their
    /// left value across a keyframe segment.
    #[inline]
    pub fn is_continuous(&self) -> bool {
        !matches!(self, ValueKind::Bool | ValueKind::Text)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum Value {
    /// Boolean (step)
    Bool(bool),

    /// 8-bit unsigned channel (opacity bytes, palette indices)
    Byte(u8),

    /// Signed integer
    Int(i32),

    /// Scalar float
    Float(f32),

    /// 2D vector
    Vec2([f32; 2]),

    /// 3D vector
    Vec3([f32; 3]),

    /// 4D vector
    Vec4([f32; 4]),

    /// Row-major 4x4 matrix
    Matrix4(Matrix4),

    /// Width/height pair
    Size(Size),

    /// Left/top/right/bottom edge widths
    Thickness(Thickness),

    /// Per-corner radii
    CornerRadius(CornerRadius),

    /// Gamma-encoded ARGB color
    Color(Color),

    /// Text / string; step-only for interpolation
    Text(String),
}

impl Value {
    /// Return the coarse kind of this value.
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Byte(_) => ValueKind::Byte,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Vec2(_) => ValueKind::Vec2,
            Value::Vec3(_) => ValueKind::Vec3,
            Value::Vec4(_) => ValueKind::Vec4,
            Value::Matrix4(_) => ValueKind::Matrix4,
            Value::Size(_) => ValueKind::Size,
            Value::Thickness(_) => ValueKind::Thickness,
            Value::CornerRadius(_) => ValueKind::CornerRadius,
            Value::Color(_) => ValueKind::Color,
            Value::Text(_) => ValueKind::Text,
        }
    }

    /// Zero value of a kind. Used when a property is registered without an
    /// explicit default.
    pub fn zero(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Bool => Value::Bool(false),
            ValueKind::Byte => Value::Byte(0),
            ValueKind::Int => Value::Int(0),
            ValueKind::Float => Value::Float(0.0),
            ValueKind::Vec2 => Value::Vec2([0.0; 2]),
            ValueKind::Vec3 => Value::Vec3([0.0; 3]),
            ValueKind::Vec4 => Value::Vec4([0.0; 4]),
            ValueKind::Matrix4 => Value::Matrix4(Matrix4::IDENTITY),
            ValueKind::Size => Value::Size(Size::default()),
            ValueKind::Thickness => Value::Thickness(Thickness::default()),
            ValueKind::CornerRadius => Value::CornerRadius(CornerRadius::default()),
            ValueKind::Color => Value::Color(Color::TRANSPARENT),
            ValueKind::Text => Value::Text(String::new()),
        }
    }

    /// Scalar view used by range validators. Only numeric scalar kinds answer.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Byte(v) => Some(f64::from(*v)),
            Value::Int(v) => Some(f64::from(*v)),
            Value::Float(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    /// Rebuild a scalar value of the same kind from `v`, saturating to the kind's range.
    pub fn with_scalar(&self, v: f64) -> Option<Self> {
        match self {
            Value::Byte(_) => Some(Value::Byte(v.round().clamp(0.0, 255.0) as u8)),
            Value::Int(_) => Some(Value::Int(
                v.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32,
            )),
            Value::Float(_) => Some(Value::Float(v as f32)),
            _ => None,
        }
    }

    /// Convenience constructors
    pub fn f(v: f32) -> Self {
        Value::Float(v)
    }

    pub fn vec3(x: f32, y: f32, z: f32) -> Self {
        Value::Vec3([x, y, z])
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }
}

/// Failure converting between the untyped [`Value`] and a concrete Rust type.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("expected a {expected} value, got {actual}")]
    KindMismatch {
        expected: ValueKind,
        actual: ValueKind,
    },
    #[error("invalid color literal '{literal}': {reason}")]
    InvalidColor { literal: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(Value::Float(1.0).kind(), ValueKind::Float);
        assert_eq!(Value::Byte(3).kind(), ValueKind::Byte);
        assert_eq!(Value::text("a").kind(), ValueKind::Text);
        assert_eq!(Value::zero(ValueKind::Color).kind(), ValueKind::Color);
    }

    #[test]
    fn scalar_rebuild_saturates() {
        assert_eq!(Value::Byte(0).with_scalar(300.0), Some(Value::Byte(255)));
        assert_eq!(Value::Int(0).with_scalar(-2.6), Some(Value::Int(-3)));
        assert_eq!(Value::Text(String::new()).with_scalar(1.0), None);
    }

    #[test]
    fn json_shape_is_tagged() {
        let json = serde_json::to_value(Value::Float(2.5)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "Float", "data": 2.5}));
        let back: Value = serde_json::from_value(json).unwrap();
        assert_eq!(back, Value::Float(2.5));
    }
}
