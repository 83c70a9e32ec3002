//! Bridges between concrete Rust types and the untyped [`Value`] slot representation.
//!
//! Typed property handles in the document crate are generic over [`PropertyValue`];
//! the registry stores the declared [`ValueKind`] so untyped writes can be checked
//! against it.

use crate::color::Color;
use crate::geometry::{CornerRadius, Matrix4, Size, Thickness};
use crate::value::{Value, ValueError, ValueKind};

pub trait PropertyValue: Clone + PartialEq + Sized + 'static {
    const KIND: ValueKind;

    fn into_value(self) -> Value;

    fn from_value(value: &Value) -> Option<Self>;

    /// Like [`PropertyValue::from_value`] but reports the mismatched kind.
    fn try_from_value(value: &Value) -> Result<Self, ValueError> {
        Self::from_value(value).ok_or(ValueError::KindMismatch {
            expected: Self::KIND,
            actual: value.kind(),
        })
    }
}

macro_rules! impl_property_value {
    ($ty:ty, $variant:ident) => {
        impl PropertyValue for $ty {
            const KIND: ValueKind = ValueKind::$variant;

            #[inline]
            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            #[inline]
            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        }
    };
}

impl_property_value!(bool, Bool);
impl_property_value!(u8, Byte);
impl_property_value!(i32, Int);
impl_property_value!(f32, Float);
impl_property_value!([f32; 2], Vec2);
impl_property_value!([f32; 3], Vec3);
impl_property_value!([f32; 4], Vec4);
impl_property_value!(Matrix4, Matrix4);
impl_property_value!(Size, Size);
impl_property_value!(Thickness, Thickness);
impl_property_value!(CornerRadius, CornerRadius);
impl_property_value!(Color, Color);
impl_property_value!(String, Text);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}
