//! Type table and property registry.
//!
//! A [`TypeSystem`] is built once (types first, then their properties through
//! [`PropertyBuilder`]) and then frozen into an `Arc` shared by every document that
//! uses it. Owner types form single-inheritance chains rooted at [`CORE_OBJECT`];
//! properties declared on a base are visible on every derived type.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use bitflags::bitflags;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use montage_animation_core::AnimatorRegistry;
use montage_api_core::{PropertyValue, Value, ValueKind};

use crate::error::{DocumentError, Result};
use crate::ids::PropertyId;

/// Built-in base type of every object.
pub const CORE_OBJECT: &str = "CoreObject";

/// `Name` is registered first on [`CORE_OBJECT`] by [`TypeSystem::new`].
pub const NAME: Property<String> = Property::from_id(PropertyId(0));

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PropertyFlags: u8 {
        /// Reads may be overridden by an attached keyframe animation.
        const ANIMATABLE   = 1 << 0;
        /// Shown in property editors.
        const DESIGNABLE   = 1 << 1;
        /// Written to the persisted form when it differs from the default.
        const SERIALIZABLE = 1 << 2;
        /// The value endpoint that bindings link and propagate.
        const BINDABLE     = 1 << 3;
    }
}

/// Coerces or rejects a candidate value. `Err` carries a human-readable reason.
pub type ValidatorFn = Arc<dyn Fn(Value) -> std::result::Result<Value, String> + Send + Sync>;

/// Typed handle to a registered property.
pub struct Property<T> {
    id: PropertyId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Property<T> {
    pub(crate) const fn from_id(id: PropertyId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn id(&self) -> PropertyId {
        self.id
    }
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Property<T> {}

impl<T> PartialEq for Property<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Property").field(&self.id).finish()
    }
}

impl<T> From<Property<T>> for PropertyId {
    fn from(p: Property<T>) -> Self {
        p.id
    }
}

pub struct PropertyMetadata {
    id: PropertyId,
    owner: String,
    name: String,
    kind: ValueKind,
    default: Value,
    flags: PropertyFlags,
    serialize_name: String,
    range: Option<(f64, f64)>,
    validators: Vec<ValidatorFn>,
}

impl PropertyMetadata {
    pub fn id(&self) -> PropertyId {
        self.id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    pub fn flags(&self) -> PropertyFlags {
        self.flags
    }

    pub fn is_animatable(&self) -> bool {
        self.flags.contains(PropertyFlags::ANIMATABLE)
    }

    pub fn is_serializable(&self) -> bool {
        self.flags.contains(PropertyFlags::SERIALIZABLE)
    }

    pub fn serialize_name(&self) -> &str {
        &self.serialize_name
    }

    pub fn range(&self) -> Option<(f64, f64)> {
        self.range
    }

    /// Kind check, range clamp, then custom validators in registration order.
    pub fn coerce(&self, value: Value) -> Result<Value> {
        if value.kind() != self.kind {
            return Err(DocumentError::TypeMismatch {
                property: self.name.clone(),
                expected: self.kind,
                actual: value.kind(),
            });
        }
        let mut value = value;
        if let (Some((min, max)), Some(v)) = (self.range, value.as_scalar()) {
            if let Some(clamped) = value.with_scalar(v.clamp(min, max)) {
                value = clamped;
            }
        }
        for validator in &self.validators {
            value = validator(value).map_err(|reason| DocumentError::Validation {
                property: self.name.clone(),
                reason,
            })?;
        }
        Ok(value)
    }
}

impl fmt::Debug for PropertyMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMetadata")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("flags", &self.flags)
            .field("serialize_name", &self.serialize_name)
            .field("range", &self.range)
            .field("validators", &self.validators.len())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct TypeInfo {
    name: String,
    base: Option<String>,
    own: Vec<PropertyId>,
}

impl TypeInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// Properties declared directly on this type, in registration order.
    pub fn own_properties(&self) -> &[PropertyId] {
        &self.own
    }
}

#[derive(Debug)]
pub struct TypeSystem {
    types: IndexMap<String, TypeInfo>,
    properties: Vec<PropertyMetadata>,
    animators: AnimatorRegistry,
}

impl Default for TypeSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeSystem {
    /// A type system holding only [`CORE_OBJECT`] with its `Name` property and the
    /// built-in animators.
    pub fn new() -> Self {
        let mut types = IndexMap::new();
        types.insert(
            CORE_OBJECT.to_string(),
            TypeInfo {
                name: CORE_OBJECT.to_string(),
                base: None,
                own: vec![NAME.id()],
            },
        );
        let name = PropertyMetadata {
            id: NAME.id(),
            owner: CORE_OBJECT.to_string(),
            name: "Name".to_string(),
            kind: ValueKind::Text,
            default: Value::Text(String::new()),
            flags: PropertyFlags::SERIALIZABLE | PropertyFlags::DESIGNABLE,
            serialize_name: "name".to_string(),
            range: None,
            validators: Vec::new(),
        };
        Self {
            types,
            properties: vec![name],
            animators: AnimatorRegistry::with_builtins(),
        }
    }

    /// Register an owner type. `base` defaults to [`CORE_OBJECT`].
    pub fn register_type(&mut self, name: &str, base: Option<&str>) -> Result<()> {
        if self.types.contains_key(name) {
            return Err(DocumentError::DuplicateType {
                type_name: name.to_string(),
            });
        }
        let base = base.unwrap_or(CORE_OBJECT);
        if !self.types.contains_key(base) {
            return Err(DocumentError::UnknownType {
                type_name: base.to_string(),
            });
        }
        tracing::trace!(type_name = name, base, "registering type");
        self.types.insert(
            name.to_string(),
            TypeInfo {
                name: name.to_string(),
                base: Some(base.to_string()),
                own: Vec::new(),
            },
        );
        Ok(())
    }

    /// Start registering property `name` of type `T` on `owner`.
    pub fn register_property<T: PropertyValue>(
        &mut self,
        owner: &str,
        name: &str,
    ) -> PropertyBuilder<'_, T> {
        PropertyBuilder {
            types: self,
            owner: owner.to_string(),
            name: name.to_string(),
            default: None,
            flags: PropertyFlags::SERIALIZABLE,
            serialize_name: None,
            range: None,
            validators: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn animators(&self) -> &AnimatorRegistry {
        &self.animators
    }

    /// Override interpolation for this type system before it is frozen.
    pub fn animators_mut(&mut self) -> &mut AnimatorRegistry {
        &mut self.animators
    }

    pub fn freeze(self) -> Arc<TypeSystem> {
        Arc::new(self)
    }

    pub fn type_info(&self, name: &str) -> Result<&TypeInfo> {
        self.types
            .get(name)
            .ok_or_else(|| DocumentError::UnknownType {
                type_name: name.to_string(),
            })
    }

    pub fn contains_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// `name` followed by its bases up to [`CORE_OBJECT`]. Empty for unknown types.
    pub fn ancestry<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a TypeInfo> + 'a {
        let mut next = self.types.get(name);
        std::iter::from_fn(move || {
            let current = next?;
            next = current.base.as_deref().and_then(|b| self.types.get(b));
            Some(current)
        })
    }

    pub fn is_subtype(&self, name: &str, base: &str) -> bool {
        self.ancestry(name).any(|t| t.name == base)
    }

    pub fn property(&self, id: PropertyId) -> Option<&PropertyMetadata> {
        self.properties.get(id.index())
    }

    /// All properties visible on `type_name`, base-first in registration order.
    pub fn properties_of(&self, type_name: &str) -> Vec<&PropertyMetadata> {
        let chain: Vec<&TypeInfo> = self.ancestry(type_name).collect();
        chain
            .iter()
            .rev()
            .flat_map(|t| t.own.iter())
            .filter_map(|id| self.property(*id))
            .collect()
    }

    pub fn find_property(&self, type_name: &str, name: &str) -> Option<&PropertyMetadata> {
        self.ancestry(type_name)
            .flat_map(|t| t.own.iter())
            .filter_map(|id| self.property(*id))
            .find(|p| p.name == name)
    }

    pub fn find_by_serialize_name(
        &self,
        type_name: &str,
        serialize_name: &str,
    ) -> Option<&PropertyMetadata> {
        self.ancestry(type_name)
            .flat_map(|t| t.own.iter())
            .filter_map(|id| self.property(*id))
            .find(|p| p.serialize_name == serialize_name)
    }

    /// Metadata for `id` if it is visible on `type_name`.
    pub fn metadata_for(&self, type_name: &str, id: PropertyId) -> Result<&PropertyMetadata> {
        let unknown = || DocumentError::UnknownProperty {
            type_name: type_name.to_string(),
            property: self
                .property(id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| format!("#{}", id.index())),
        };
        let meta = self.property(id).ok_or_else(unknown)?;
        if self.is_subtype(type_name, &meta.owner) {
            Ok(meta)
        } else {
            Err(unknown())
        }
    }

    /// The bind endpoint of `type_name`, if it declares or inherits one.
    pub fn bindable_property(&self, type_name: &str) -> Option<&PropertyMetadata> {
        self.ancestry(type_name)
            .flat_map(|t| t.own.iter())
            .filter_map(|id| self.property(*id))
            .find(|p| p.flags.contains(PropertyFlags::BINDABLE))
    }
}

/// Fluent property declaration; nothing is registered until [`PropertyBuilder::register`].
pub struct PropertyBuilder<'a, T: PropertyValue> {
    types: &'a mut TypeSystem,
    owner: String,
    name: String,
    default: Option<T>,
    flags: PropertyFlags,
    serialize_name: Option<String>,
    range: Option<(f64, f64)>,
    validators: Vec<ValidatorFn>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: PropertyValue> PropertyBuilder<'a, T> {
    pub fn default_value(mut self, value: T) -> Self {
        self.default = Some(value);
        self
    }

    pub fn animatable(mut self) -> Self {
        self.flags |= PropertyFlags::ANIMATABLE;
        self
    }

    pub fn designable(mut self) -> Self {
        self.flags |= PropertyFlags::DESIGNABLE;
        self
    }

    pub fn bindable(mut self) -> Self {
        self.flags |= PropertyFlags::BINDABLE;
        self
    }

    /// Exclude from the persisted form.
    pub fn transient(mut self) -> Self {
        self.flags.remove(PropertyFlags::SERIALIZABLE);
        self
    }

    pub fn serialize_name(mut self, name: &str) -> Self {
        self.serialize_name = Some(name.to_string());
        self
    }

    /// Clamp scalar values into `[min, max]`.
    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min.min(max), min.max(max)));
        self
    }

    pub fn validator<F>(mut self, f: F) -> Self
    where
        F: Fn(T) -> std::result::Result<T, String> + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(
            move |value: Value| -> std::result::Result<Value, String> {
                let typed = T::try_from_value(&value).map_err(|e| e.to_string())?;
                f(typed).map(PropertyValue::into_value)
            },
        ));
        self
    }

    pub fn register(self) -> Result<Property<T>> {
        let PropertyBuilder {
            types,
            owner,
            name,
            default,
            flags,
            serialize_name,
            range,
            validators,
            _marker,
        } = self;

        types.type_info(&owner)?;
        let duplicate = || DocumentError::DuplicateProperty {
            type_name: owner.clone(),
            property: name.clone(),
        };
        if types.find_property(&owner, &name).is_some() {
            return Err(duplicate());
        }
        let serialize_name = serialize_name.unwrap_or_else(|| name.clone());
        if types.find_by_serialize_name(&owner, &serialize_name).is_some() {
            return Err(duplicate());
        }
        if flags.contains(PropertyFlags::BINDABLE) && types.bindable_property(&owner).is_some() {
            return Err(DocumentError::Validation {
                property: name,
                reason: format!("type '{owner}' already has a bindable property"),
            });
        }

        let id = PropertyId(types.properties.len() as u32);
        let mut meta = PropertyMetadata {
            id,
            owner: owner.clone(),
            name,
            kind: T::KIND,
            default: Value::zero(T::KIND),
            flags,
            serialize_name,
            range,
            validators,
        };
        if let Some(default) = default {
            // Defaults obey the same range/validators as later writes.
            meta.default = meta.coerce(default.into_value())?;
        }
        tracing::trace!(owner = %owner, property = %meta.name, kind = %meta.kind, "registering property");
        types.properties.push(meta);
        if let Some(info) = types.types.get_mut(&owner) {
            info.own.push(id);
        }
        Ok(Property::from_id(id))
    }
}
