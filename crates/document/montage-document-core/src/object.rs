//! CoreObject: one node of the document tree.
//!
//! Objects live in the document arena keyed by [`ObjectId`]. The parent link is a
//! plain id (non-owning); the ordered child list is the owning edge. Property
//! values are sparse: only explicitly set values are stored, everything else reads
//! through to the registered default.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use montage_animation_core::KeyFrameAnimation;
use montage_api_core::{ObjectPath, Value};

use crate::ids::{ObjectId, PropertyId};

/// Containers that hold editable properties below an effect.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContainerKind {
    /// A single value endpoint; the only container that can be bound.
    Leaf,
    /// Unnamed collection of leaves addressed by child id.
    Group,
    /// Group shown expanded in editors; addressed the same way as `Group`.
    ExpandGroup,
}

/// Structural role of an object in the tree.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Root,
    Scene,
    Clip,
    Effect,
    Property(ContainerKind),
}

impl NodeKind {
    pub const LEAF: NodeKind = NodeKind::Property(ContainerKind::Leaf);
    pub const GROUP: NodeKind = NodeKind::Property(ContainerKind::Group);

    #[inline]
    pub fn is_group(&self) -> bool {
        matches!(
            self,
            NodeKind::Property(ContainerKind::Group | ContainerKind::ExpandGroup)
        )
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, NodeKind::Property(ContainerKind::Leaf))
    }
}

#[derive(Clone, Debug)]
pub struct CoreObject {
    id: ObjectId,
    type_name: String,
    kind: NodeKind,
    values: IndexMap<PropertyId, Value>,
    animations: IndexMap<PropertyId, KeyFrameAnimation<Value>>,
    pub(crate) parent: Option<ObjectId>,
    pub(crate) children: Vec<ObjectId>,
    pub(crate) bound_to: Option<ObjectId>,
    pub(crate) bind_hint: Option<ObjectPath>,
}

impl CoreObject {
    pub(crate) fn new(id: ObjectId, type_name: &str, kind: NodeKind) -> Self {
        Self {
            id,
            type_name: type_name.to_string(),
            kind,
            values: IndexMap::new(),
            animations: IndexMap::new(),
            parent: None,
            children: Vec::new(),
            bound_to: None,
            bind_hint: None,
        }
    }

    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    /// Live binding partner.
    pub fn bound_to(&self) -> Option<ObjectId> {
        self.bound_to
    }

    /// Path of the partner as last written or loaded.
    pub fn bind_hint(&self) -> Option<&ObjectPath> {
        self.bind_hint.as_ref()
    }

    pub fn local_value(&self, property: PropertyId) -> Option<&Value> {
        self.values.get(&property)
    }

    pub fn local_values(&self) -> impl Iterator<Item = (PropertyId, &Value)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    pub fn animation(&self, property: PropertyId) -> Option<&KeyFrameAnimation<Value>> {
        self.animations.get(&property)
    }

    pub fn animations(&self) -> impl Iterator<Item = (PropertyId, &KeyFrameAnimation<Value>)> {
        self.animations.iter().map(|(k, v)| (*k, v))
    }

    pub(crate) fn put_local(&mut self, property: PropertyId, value: Option<Value>) -> Option<Value> {
        match value {
            Some(v) => self.values.insert(property, v),
            None => self.values.shift_remove(&property),
        }
    }

    pub(crate) fn put_animation(
        &mut self,
        property: PropertyId,
        animation: Option<KeyFrameAnimation<Value>>,
    ) -> Option<KeyFrameAnimation<Value>> {
        match animation {
            Some(a) => self.animations.insert(property, a),
            None => self.animations.shift_remove(&property),
        }
    }

    pub(crate) fn animation_mut(
        &mut self,
        property: PropertyId,
    ) -> Option<&mut KeyFrameAnimation<Value>> {
        self.animations.get_mut(&property)
    }
}
