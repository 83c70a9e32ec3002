//! Error types for keyframe animation

use montage_api_core::ValueKind;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum AnimationError {
    /// A keyframe's value kind differs from the animation's kind
    #[error("Keyframe {index} has kind {actual}, animation expects {expected}")]
    KindMismatch {
        index: usize,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// Evaluation requested on an animation without keyframes
    #[error("Animation has no keyframes")]
    EmptyAnimation,

    /// Non-finite keyframe time
    #[error("Invalid time value: {time}")]
    InvalidTime { time: f64 },

    /// Keyframe index past the end of the sequence
    #[error("Keyframe index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Serialization error
    #[error("Serialization error: {reason}")]
    Serialization { reason: String },
}

impl AnimationError {
    /// Recoverable errors leave the animation untouched and can be retried with other input.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::EmptyAnimation | Self::IndexOutOfRange { .. }
        )
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::KindMismatch { .. } | Self::InvalidTime { .. } => "validation",
            Self::EmptyAnimation | Self::IndexOutOfRange { .. } => "data",
            Self::Serialization { .. } => "serialization",
        }
    }
}

impl From<serde_json::Error> for AnimationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}
