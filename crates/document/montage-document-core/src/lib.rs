//! Montage document runtime.
//!
//! A [`TypeSystem`] declares object types and their typed properties; a
//! [`Document`] holds a tree of [`CoreObject`]s whose property values resolve
//! animation, then local value, then default. Bindings link leaf properties across
//! the tree and persist as [`ObjectPath`](montage_api_core::ObjectPath) hints.
//! Edits go through [`commands`] so they can be undone.

mod binding;
pub mod commands;
pub mod config;
mod document;
pub mod error;
mod hierarchy;
pub mod ids;
mod notify;
pub mod object;
pub mod persist;
pub mod registry;

pub use binding::UnresolvedBinding;
pub use commands::{
    AddCommand, BatchCommand, BindCommand, ChangePropertyCommand, Children, ClearCommand,
    Command, CommandEvent, CommandKind, CommandRecorder, DisconnectCommand, KeyFrames,
    ListTarget, MoveCommand, RemoveCommand, Reorderable, SetAnimationCommand,
};
pub use config::DocumentConfig;
pub use document::Document;
pub use error::{DocumentError, PathResolutionError, Result};
pub use ids::{ObjectId, PropertyId, SubscriptionId};
pub use notify::PropertyChanged;
pub use object::{ContainerKind, CoreObject, NodeKind};
pub use persist::{DocumentRecord, LoadReport, ObjectRecord, SkippedEntry, FORMAT_VERSION};
pub use registry::{
    Property, PropertyBuilder, PropertyFlags, PropertyMetadata, TypeInfo, TypeSystem,
    CORE_OBJECT, NAME,
};

pub use montage_animation_core::{Easing, KeyFrame, KeyFrameAnimation, Time};
pub use montage_api_core::{ObjectPath, PropertyValue, Value, ValueKind};
