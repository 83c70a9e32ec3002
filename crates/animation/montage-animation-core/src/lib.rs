//! montage-animation-core: per-type interpolation, easing and keyframe sequences.
//!
//! Everything here is pure: evaluating an animation never mutates it and never
//! touches the document that owns it.

pub mod ease;
pub mod error;
pub mod interp;
pub mod keyframe;
pub mod sampling;
pub mod time;

pub use ease::Easing;
pub use error::AnimationError;
pub use interp::functions::{Animator, ColorAnimator, HoldAnimator, Interpolate, LinearAnimator};
pub use interp::{AnimatorRegistry, TypedAnimator};
pub use keyframe::{KeyFrame, KeyFrameAnimation};
pub use time::Time;

pub type Result<T> = core::result::Result<T, AnimationError>;
