//! Error types for the document runtime

use montage_animation_core::AnimationError;
use montage_api_core::{PathSyntaxError, ValueKind};

use crate::ids::ObjectId;

/// Why a path could not be turned back into a bindable object.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PathResolutionError {
    /// The text does not follow the path grammar
    #[error("Malformed path '{path}': {source}")]
    Malformed {
        path: String,
        #[source]
        source: PathSyntaxError,
    },

    /// A name or id segment has no matching child
    #[error("Path '{path}': no object matches segment '{segment}'")]
    NotFound { path: String, segment: String },

    /// The path leads to an object that is not a bindable of the expected kind
    #[error("Path '{path}' resolves to {actual:?}, expected a {expected} bindable")]
    TypeMismatch {
        path: String,
        expected: ValueKind,
        actual: Option<ValueKind>,
    },

    /// The target is already bound to a different object
    #[error("Path '{path}' resolves to {target}, which is bound elsewhere")]
    AlreadyBound { path: String, target: ObjectId },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum DocumentError {
    /// Property not registered on the object's type or any of its bases
    #[error("Unknown property '{property}' on type '{type_name}'")]
    UnknownProperty { type_name: String, property: String },

    /// Value kind differs from the property's declared kind
    #[error("Type mismatch on '{property}': expected {expected}, got {actual}")]
    TypeMismatch {
        property: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// (owner, name) registered twice
    #[error("Property '{property}' is already registered on type '{type_name}'")]
    DuplicateProperty { type_name: String, property: String },

    #[error("Unknown type '{type_name}'")]
    UnknownType { type_name: String },

    #[error("Type '{type_name}' is already registered")]
    DuplicateType { type_name: String },

    #[error(transparent)]
    PathResolution(#[from] PathResolutionError),

    /// The object's ancestor chain does not form a bindable location
    #[error("Object {object} has no serializable location: {reason}")]
    UnresolvableLocation { object: ObjectId, reason: String },

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    /// Lifecycle violation: double undo, redo without undo, undo before do
    #[error("Invalid state for command '{command}': {reason}")]
    InvalidCommandState { command: String, reason: String },

    /// Graph edge or handle pointing at an object that no longer exists
    #[error("Object {object} does not exist")]
    DanglingObject { object: ObjectId },

    #[error("Index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Operation requires the object to be reachable from the document root
    #[error("Object {object} is not attached to the document")]
    NotAttached { object: ObjectId },

    /// Parent/child change that would break the tree shape
    #[error("Invalid hierarchy change: {reason}")]
    InvalidHierarchy { reason: String },

    /// Item looked up in a list it does not belong to
    #[error("Item not found in {list}")]
    NotInList { list: String },

    /// Rejected by the property's validator or flags
    #[error("Validation failed for '{property}': {reason}")]
    Validation { property: String, reason: String },

    #[error("Object {object} has no bindable property")]
    NotBindable { object: ObjectId },

    /// Keyframe edit on a property without an attached animation
    #[error("No animation attached to '{property}' on object {object}")]
    NoAnimation { object: ObjectId, property: String },

    #[error(transparent)]
    Animation(#[from] AnimationError),

    #[error("Serialization error: {reason}")]
    Serialization { reason: String },
}

impl DocumentError {
    /// Non-fatal conditions that callers may report as no-ops.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NothingToUndo | Self::NothingToRedo | Self::PathResolution(_)
        )
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnknownProperty { .. }
            | Self::DuplicateProperty { .. }
            | Self::UnknownType { .. }
            | Self::DuplicateType { .. } => "registry",
            Self::TypeMismatch { .. } | Self::Validation { .. } => "validation",
            Self::PathResolution(_)
            | Self::UnresolvableLocation { .. }
            | Self::NotBindable { .. } => "binding",
            Self::NothingToUndo | Self::NothingToRedo | Self::InvalidCommandState { .. } => {
                "history"
            }
            Self::DanglingObject { .. }
            | Self::IndexOutOfRange { .. }
            | Self::NotAttached { .. }
            | Self::InvalidHierarchy { .. }
            | Self::NotInList { .. } => "hierarchy",
            Self::NoAnimation { .. } | Self::Animation(_) => "animation",
            Self::Serialization { .. } => "serialization",
        }
    }

    pub(crate) fn invalid_state(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCommandState {
            command: command.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for DocumentError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = core::result::Result<T, DocumentError>;
