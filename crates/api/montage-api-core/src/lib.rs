//! montage-api-core: shared value vocabulary and object path grammar (engine-agnostic).
//!
//! Everything that crosses a crate boundary in the editing runtime is expressed in
//! these types: property values travel as [`Value`], strongly typed accessors go
//! through [`PropertyValue`], and cross-object references are stored as
//! [`ObjectPath`] strings.

pub mod coercion;
pub mod color;
pub mod geometry;
pub mod object_path;
pub mod value;

pub use coercion::PropertyValue;
pub use color::Color;
pub use geometry::{CornerRadius, Matrix4, Size, Thickness};
pub use object_path::{ObjectPath, PathSegment, PathSyntaxError};
pub use value::{Value, ValueError, ValueKind};
