//! Document: the arena of CoreObjects plus the value layer.
//!
//! Effective value of a property at time `t`:
//! 1. the attached animation, when the property is animatable and the animation
//!    covers `t`;
//! 2. otherwise the local value, when one is set;
//! 3. otherwise the registered default.
//!
//! Writes through [`Document::set_value`] coerce through the property metadata, are
//! no-ops when the value is unchanged, raise [`PropertyChanged`], and propagate to a
//! bound partner. Setting a value never detaches an animation.

use std::sync::Arc;

use hashbrown::HashMap;

use montage_animation_core::{AnimationError, KeyFrame, KeyFrameAnimation, Time};
use montage_api_core::{PropertyValue, Value};

use crate::config::DocumentConfig;
use crate::error::{DocumentError, Result};
use crate::ids::{IdAllocator, ObjectId, PropertyId, SubscriptionId};
use crate::notify::{Notifier, PropertyChanged};
use crate::object::{CoreObject, NodeKind};
use crate::registry::{Property, PropertyMetadata, TypeSystem, CORE_OBJECT, NAME};

/// Source write, partner write, and one write back to the source.
const MAX_MIRROR_WRITES: usize = 3;

/// Local value of one property before a write, used to undo it exactly.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PriorLocal {
    pub object: ObjectId,
    pub property: PropertyId,
    pub value: Option<Value>,
}

#[derive(Debug)]
pub struct Document {
    pub(crate) types: Arc<TypeSystem>,
    pub(crate) config: DocumentConfig,
    pub(crate) objects: HashMap<ObjectId, CoreObject>,
    pub(crate) root: ObjectId,
    pub(crate) ids: IdAllocator,
    pub(crate) notifier: Notifier,
}

impl Document {
    pub fn new(types: Arc<TypeSystem>) -> Self {
        Self::with_config(types, DocumentConfig::default())
    }

    /// Empty document whose root is a bare [`CORE_OBJECT`] of kind [`NodeKind::Root`].
    pub fn with_config(types: Arc<TypeSystem>, config: DocumentConfig) -> Self {
        let mut ids = IdAllocator::new();
        let root = ids.alloc();
        let mut objects = HashMap::new();
        objects.insert(root, CoreObject::new(root, CORE_OBJECT, NodeKind::Root));
        Self {
            types,
            config,
            objects,
            root,
            ids,
            notifier: Notifier::default(),
        }
    }

    pub fn types(&self) -> &Arc<TypeSystem> {
        &self.types
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    pub fn root(&self) -> ObjectId {
        self.root
    }

    /// Number of objects held, attached or not.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn object(&self, id: ObjectId) -> Result<&CoreObject> {
        self.objects
            .get(&id)
            .ok_or(DocumentError::DanglingObject { object: id })
    }

    pub(crate) fn object_mut(&mut self, id: ObjectId) -> Result<&mut CoreObject> {
        self.objects
            .get_mut(&id)
            .ok_or(DocumentError::DanglingObject { object: id })
    }

    /// Create a detached object. It joins the tree through an `AddCommand` or
    /// [`Document::attach`].
    pub fn create(&mut self, type_name: &str, kind: NodeKind) -> Result<ObjectId> {
        self.types.type_info(type_name)?;
        if kind == NodeKind::Root {
            return Err(DocumentError::InvalidHierarchy {
                reason: "a document has exactly one root".into(),
            });
        }
        let id = self.ids.alloc();
        self.objects.insert(id, CoreObject::new(id, type_name, kind));
        tracing::trace!(%id, type_name, ?kind, "created object");
        Ok(id)
    }

    pub fn create_named(&mut self, type_name: &str, kind: NodeKind, name: &str) -> Result<ObjectId> {
        let id = self.create(type_name, kind)?;
        self.set_value(id, NAME, name.to_string())?;
        Ok(id)
    }

    pub fn name_of(&self, id: ObjectId) -> Result<String> {
        match self.base_value(id, NAME.id())? {
            Value::Text(s) => Ok(s),
            _ => Ok(String::new()),
        }
    }

    fn metadata(&self, object: ObjectId, property: PropertyId) -> Result<&PropertyMetadata> {
        let obj = self.object(object)?;
        self.types.metadata_for(obj.type_name(), property)
    }

    /// Typed effective value at `at`.
    pub fn get_value<T: PropertyValue>(
        &self,
        object: ObjectId,
        property: Property<T>,
        at: Time,
    ) -> Result<T> {
        let meta = self.metadata(object, property.id())?;
        if meta.kind() != T::KIND {
            return Err(DocumentError::TypeMismatch {
                property: meta.name().to_string(),
                expected: meta.kind(),
                actual: T::KIND,
            });
        }
        let value = self.value_at(object, property.id(), at)?;
        T::try_from_value(&value).map_err(|_| DocumentError::TypeMismatch {
            property: meta.name().to_string(),
            expected: T::KIND,
            actual: value.kind(),
        })
    }

    /// Untyped effective value at `at`.
    pub fn value_at(&self, object: ObjectId, property: PropertyId, at: Time) -> Result<Value> {
        let obj = self.object(object)?;
        let meta = self.types.metadata_for(obj.type_name(), property)?;
        if meta.is_animatable() {
            if let Some(anim) = obj.animation(property).filter(|a| a.covers(at)) {
                if let Some(v) = anim.evaluate_with(at, self.types.animators()) {
                    return Ok(v);
                }
            }
        }
        Ok(obj
            .local_value(property)
            .cloned()
            .unwrap_or_else(|| meta.default_value().clone()))
    }

    /// Local value or default, ignoring animations.
    pub fn base_value(&self, object: ObjectId, property: PropertyId) -> Result<Value> {
        let obj = self.object(object)?;
        let meta = self.types.metadata_for(obj.type_name(), property)?;
        Ok(obj
            .local_value(property)
            .cloned()
            .unwrap_or_else(|| meta.default_value().clone()))
    }

    pub fn set_value<T: PropertyValue>(
        &mut self,
        object: ObjectId,
        property: Property<T>,
        value: T,
    ) -> Result<()> {
        self.apply_local(object, property.id(), Some(value.into_value()))
            .map(|_| ())
    }

    pub fn set_value_untyped(
        &mut self,
        object: ObjectId,
        property: PropertyId,
        value: Value,
    ) -> Result<()> {
        self.apply_local(object, property, Some(value)).map(|_| ())
    }

    /// Drop the local value so reads fall back to the default.
    pub fn clear_value(&mut self, object: ObjectId, property: PropertyId) -> Result<()> {
        self.apply_local(object, property, None).map(|_| ())
    }

    /// Write (or clear) a local value and propagate it across a binding. Returns the
    /// prior local values of every slot touched, in write order. On failure every
    /// slot already written is restored before the error is returned.
    pub(crate) fn apply_local(
        &mut self,
        object: ObjectId,
        property: PropertyId,
        value: Option<Value>,
    ) -> Result<Vec<PriorLocal>> {
        let mut priors: Vec<PriorLocal> = Vec::new();
        let mut next = Some((object, property, value));
        while let Some((obj, prop, value)) = next.take() {
            let prior = match self.write_checked(obj, prop, value) {
                Ok(Some(prior)) => prior,
                Ok(None) => break,
                Err(err) => {
                    self.rollback(priors);
                    return Err(err);
                }
            };
            priors.push(prior);
            // The partner may coerce differently (another range); its value then
            // flows back so both ends settle on the same value.
            let step = self.binding_partner(obj, prop).and_then(|partner| match partner {
                Some((p_obj, p_prop)) if priors.len() < MAX_MIRROR_WRITES => {
                    let value = self.base_value(obj, prop)?;
                    if self.base_value(p_obj, p_prop)? == value {
                        Ok(None)
                    } else {
                        Ok(Some((p_obj, p_prop, Some(value))))
                    }
                }
                _ => Ok(None),
            });
            match step {
                Ok(step) => next = step,
                Err(err) => {
                    self.rollback(priors);
                    return Err(err);
                }
            }
        }
        Ok(priors)
    }

    /// Coerce and store one slot. `Ok(None)` when nothing changed.
    fn write_checked(
        &mut self,
        object: ObjectId,
        property: PropertyId,
        value: Option<Value>,
    ) -> Result<Option<PriorLocal>> {
        let types = Arc::clone(&self.types);
        let obj = self.object(object)?;
        let meta = types.metadata_for(obj.type_name(), property)?;
        let prior = obj.local_value(property).cloned();
        let current = prior
            .clone()
            .unwrap_or_else(|| meta.default_value().clone());

        let (stored, new) = match value {
            Some(v) => {
                let v = meta.coerce(v)?;
                if v == current {
                    return Ok(None);
                }
                (Some(v.clone()), v)
            }
            None => {
                if prior.is_none() {
                    return Ok(None);
                }
                (None, meta.default_value().clone())
            }
        };
        self.object_mut(object)?.put_local(property, stored);
        self.notify(object, meta, current, new);
        Ok(Some(PriorLocal {
            object,
            property,
            value: prior,
        }))
    }

    /// Put back prior local values, newest first, without validation or propagation.
    pub(crate) fn restore_locals(&mut self, priors: Vec<PriorLocal>) -> Result<()> {
        let mut first_err = None;
        for prior in priors.into_iter().rev() {
            if let Err(err) = self.write_raw(prior.object, prior.property, prior.value) {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn rollback(&mut self, priors: Vec<PriorLocal>) {
        if let Err(err) = self.restore_locals(priors) {
            tracing::warn!(error = %err, "rollback of property writes incomplete");
        }
    }

    fn write_raw(&mut self, object: ObjectId, property: PropertyId, value: Option<Value>) -> Result<()> {
        let types = Arc::clone(&self.types);
        let obj = self.object_mut(object)?;
        let meta = types.metadata_for(obj.type_name(), property)?;
        let old = obj
            .put_local(property, value.clone())
            .unwrap_or_else(|| meta.default_value().clone());
        let new = value.unwrap_or_else(|| meta.default_value().clone());
        self.notify(object, meta, old, new);
        Ok(())
    }

    fn notify(&mut self, object: ObjectId, meta: &PropertyMetadata, old: Value, new: Value) {
        if old == new {
            return;
        }
        self.notifier.emit(&PropertyChanged {
            object,
            property: meta.id(),
            name: meta.name().to_string(),
            old,
            new,
        });
    }

    /// Partner slot that mirrors `property` on `object`, if `property` is the
    /// object's bind endpoint and the object is bound.
    fn binding_partner(
        &self,
        object: ObjectId,
        property: PropertyId,
    ) -> Result<Option<(ObjectId, PropertyId)>> {
        let obj = self.object(object)?;
        let Some(partner) = obj.bound_to else {
            return Ok(None);
        };
        match self.types.bindable_property(obj.type_name()) {
            Some(own) if own.id() == property => {}
            _ => return Ok(None),
        }
        let partner_obj = self.object(partner)?;
        let theirs = self
            .types
            .bindable_property(partner_obj.type_name())
            .ok_or(DocumentError::NotBindable { object: partner })?;
        Ok(Some((partner, theirs.id())))
    }

    // ---- animations ----

    pub fn animation(
        &self,
        object: ObjectId,
        property: PropertyId,
    ) -> Result<Option<&KeyFrameAnimation<Value>>> {
        self.metadata(object, property)?;
        Ok(self.object(object)?.animation(property))
    }

    /// Attach, replace or (with `None`) detach the animation of an animatable
    /// property. Returns the previous animation.
    pub fn set_animation(
        &mut self,
        object: ObjectId,
        property: PropertyId,
        animation: Option<KeyFrameAnimation<Value>>,
    ) -> Result<Option<KeyFrameAnimation<Value>>> {
        let types = Arc::clone(&self.types);
        let meta = types.metadata_for(self.object(object)?.type_name(), property)?;
        if let Some(anim) = &animation {
            check_animatable(meta)?;
            anim.check_kind(meta.kind())
                .map_err(|err| kind_error(meta, err))?;
        }
        Ok(self.object_mut(object)?.put_animation(property, animation))
    }

    /// Insert a keyframe into an attached animation, keeping time order.
    pub fn insert_keyframe(
        &mut self,
        object: ObjectId,
        property: PropertyId,
        frame: KeyFrame<Value>,
    ) -> Result<usize> {
        let types = Arc::clone(&self.types);
        let meta = types.metadata_for(self.object(object)?.type_name(), property)?;
        check_animatable(meta)?;
        if frame.value.kind() != meta.kind() {
            return Err(DocumentError::TypeMismatch {
                property: meta.name().to_string(),
                expected: meta.kind(),
                actual: frame.value.kind(),
            });
        }
        Ok(self.animation_mut(object, property)?.insert(frame))
    }

    pub fn remove_keyframe(
        &mut self,
        object: ObjectId,
        property: PropertyId,
        index: usize,
    ) -> Result<KeyFrame<Value>> {
        Ok(self.animation_mut(object, property)?.remove(index)?)
    }

    pub(crate) fn animation_mut(
        &mut self,
        object: ObjectId,
        property: PropertyId,
    ) -> Result<&mut KeyFrameAnimation<Value>> {
        let name = self.metadata(object, property)?.name().to_string();
        self.object_mut(object)?
            .animation_mut(property)
            .ok_or(DocumentError::NoAnimation {
                object,
                property: name,
            })
    }

    // ---- notifications ----

    /// Listen to value changes of one object.
    pub fn subscribe<F>(&mut self, object: ObjectId, callback: F) -> SubscriptionId
    where
        F: FnMut(&PropertyChanged) + 'static,
    {
        self.notifier.subscribe(Some(object), Box::new(callback))
    }

    /// Listen to value changes of every object.
    pub fn subscribe_all<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&PropertyChanged) + 'static,
    {
        self.notifier.subscribe(None, Box::new(callback))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.notifier.len()
    }

    pub(crate) fn emit(&mut self, event: &PropertyChanged) {
        self.notifier.emit(event);
    }
}

fn check_animatable(meta: &PropertyMetadata) -> Result<()> {
    if meta.is_animatable() {
        Ok(())
    } else {
        Err(DocumentError::Validation {
            property: meta.name().to_string(),
            reason: "property is not animatable".into(),
        })
    }
}

fn kind_error(meta: &PropertyMetadata, err: AnimationError) -> DocumentError {
    match err {
        AnimationError::KindMismatch { actual, .. } => DocumentError::TypeMismatch {
            property: meta.name().to_string(),
            expected: meta.kind(),
            actual,
        },
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use montage_animation_core::Easing;

    use super::*;

    struct Fixture {
        doc: Document,
        layer: ObjectId,
        opacity: Property<f32>,
        label: Property<String>,
    }

    fn fixture() -> Fixture {
        let mut ts = TypeSystem::new();
        ts.register_type("Layer", None).unwrap();
        let opacity = ts
            .register_property::<f32>("Layer", "Opacity")
            .default_value(100.0)
            .animatable()
            .range(0.0, 100.0)
            .register()
            .unwrap();
        let label = ts
            .register_property::<String>("Layer", "Label")
            .register()
            .unwrap();
        let mut doc = Document::new(ts.freeze());
        let layer = doc.create("Layer", NodeKind::Effect).unwrap();
        Fixture {
            doc,
            layer,
            opacity,
            label,
        }
    }

    #[test]
    fn fresh_object_reads_default() {
        let f = fixture();
        assert_eq!(f.doc.get_value(f.layer, f.opacity, Time::ZERO).unwrap(), 100.0);
        assert_eq!(f.doc.get_value(f.layer, f.label, Time::ZERO).unwrap(), "");
    }

    #[test]
    fn set_value_coerces_and_notifies() {
        let mut f = fixture();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        f.doc.subscribe(f.layer, move |e| sink.borrow_mut().push(e.clone()));

        f.doc.set_value(f.layer, f.opacity, 250.0).unwrap();
        assert_eq!(f.doc.get_value(f.layer, f.opacity, Time::ZERO).unwrap(), 100.0);
        // Clamped to the default: nothing stored, nothing raised.
        assert!(seen.borrow().is_empty());
        assert!(f.doc.object(f.layer).unwrap().local_value(f.opacity.id()).is_none());

        f.doc.set_value(f.layer, f.opacity, 40.0).unwrap();
        let events = seen.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Opacity");
        assert_eq!(events[0].old, Value::Float(100.0));
        assert_eq!(events[0].new, Value::Float(40.0));
    }

    #[test]
    fn equal_value_is_noop() {
        let mut f = fixture();
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        f.doc.subscribe_all(move |_| *c.borrow_mut() += 1);
        f.doc.set_value(f.layer, f.opacity, 50.0).unwrap();
        f.doc.set_value(f.layer, f.opacity, 50.0).unwrap();
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn clear_value_restores_default() {
        let mut f = fixture();
        f.doc.set_value(f.layer, f.opacity, 10.0).unwrap();
        f.doc.clear_value(f.layer, f.opacity.id()).unwrap();
        assert_eq!(f.doc.get_value(f.layer, f.opacity, Time::ZERO).unwrap(), 100.0);
    }

    #[test]
    fn animation_overrides_local_value() {
        let mut f = fixture();
        let anim = KeyFrameAnimation::from_keyframes([
            KeyFrame::linear(Time::ZERO, Value::Float(0.0)),
            KeyFrame::new(Time::from_millis(1000), Value::Float(80.0), Easing::Linear),
        ]);
        f.doc
            .set_animation(f.layer, f.opacity.id(), Some(anim))
            .unwrap();
        f.doc.set_value(f.layer, f.opacity, 10.0).unwrap();
        let v = f
            .doc
            .get_value(f.layer, f.opacity, Time::from_millis(500))
            .unwrap();
        assert!((v - 40.0).abs() < 1e-4);
        // Local value is kept underneath the animation.
        assert_eq!(
            f.doc.base_value(f.layer, f.opacity.id()).unwrap(),
            Value::Float(10.0)
        );
        f.doc.set_animation(f.layer, f.opacity.id(), None).unwrap();
        assert_eq!(f.doc.get_value(f.layer, f.opacity, Time::ZERO).unwrap(), 10.0);
    }

    #[test]
    fn animation_rules() {
        let mut f = fixture();
        let text_anim = KeyFrameAnimation::from_keyframes([KeyFrame::linear(
            Time::ZERO,
            Value::text("x"),
        )]);
        assert!(matches!(
            f.doc.set_animation(f.layer, f.label.id(), Some(text_anim.clone())),
            Err(DocumentError::Validation { .. })
        ));
        assert!(matches!(
            f.doc.set_animation(f.layer, f.opacity.id(), Some(text_anim)),
            Err(DocumentError::TypeMismatch { .. })
        ));
        assert!(matches!(
            f.doc
                .insert_keyframe(f.layer, f.opacity.id(), KeyFrame::linear(Time::ZERO, Value::Float(1.0))),
            Err(DocumentError::NoAnimation { .. })
        ));
    }

    #[test]
    fn unknown_property_and_dangling_object() {
        let mut f = fixture();
        let plain = f.doc.create(CORE_OBJECT, NodeKind::Scene).unwrap();
        assert!(matches!(
            f.doc.get_value(plain, f.opacity, Time::ZERO),
            Err(DocumentError::UnknownProperty { .. })
        ));
        assert!(matches!(
            f.doc.get_value(ObjectId(999), f.opacity, Time::ZERO),
            Err(DocumentError::DanglingObject { .. })
        ));
        assert!(matches!(
            f.doc.create("Missing", NodeKind::Scene),
            Err(DocumentError::UnknownType { .. })
        ));
    }

    #[test]
    fn documents_do_not_share_state() {
        let f = fixture();
        let mut other = Document::new(Arc::clone(f.doc.types()));
        let layer = other.create("Layer", NodeKind::Effect).unwrap();
        other.set_value(layer, f.opacity, 5.0).unwrap();
        assert_eq!(f.doc.get_value(f.layer, f.opacity, Time::ZERO).unwrap(), 100.0);
    }
}
