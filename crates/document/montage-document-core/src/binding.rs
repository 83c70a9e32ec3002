//! Bindings between leaf property containers.
//!
//! A bound pair mirrors the value of each side's bind endpoint. The partner is
//! persisted as an [`ObjectPath`] hint (`Scene.Clip[effect][prop]`, or with one
//! extra group id); on load hints are resolved in deferred passes so forward
//! references work.

use hashbrown::HashSet;

use montage_api_core::{ObjectPath, PathSegment, ValueKind};

use crate::document::{Document, PriorLocal};
use crate::error::{DocumentError, PathResolutionError, Result};
use crate::ids::ObjectId;
use crate::object::NodeKind;

/// Link fields of one object, captured before a binding change.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct LinkState {
    object: ObjectId,
    bound_to: Option<ObjectId>,
    hint: Option<ObjectPath>,
}

/// Everything needed to revert a bind, unbind or sever.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct BindingUndo {
    pub links: Vec<LinkState>,
    pub values: Vec<PriorLocal>,
}

/// A persisted hint that could not be linked.
#[derive(Clone, Debug, PartialEq)]
pub struct UnresolvedBinding {
    pub object: ObjectId,
    pub hint: ObjectPath,
    pub error: PathResolutionError,
}

impl Document {
    /// Value kind of the object's bind endpoint. Only leaf containers are bindable.
    pub fn bindable_kind(&self, id: ObjectId) -> Result<ValueKind> {
        let obj = self.object(id)?;
        if !obj.kind().is_leaf() {
            return Err(DocumentError::NotBindable { object: id });
        }
        self.types
            .bindable_property(obj.type_name())
            .map(|p| p.kind())
            .ok_or(DocumentError::NotBindable { object: id })
    }

    /// Path of a bindable leaf: `Scene.Clip[effect][leaf]` when the parent is an
    /// effect, `Scene.Clip[effect][group][leaf]` when it is a group.
    pub fn serialize_location(&self, id: ObjectId) -> Result<ObjectPath> {
        self.bindable_kind(id)?;
        let unresolvable = |reason: &str| DocumentError::UnresolvableLocation {
            object: id,
            reason: reason.to_string(),
        };
        let kind_of = |n: usize| {
            self.ancestor(id, n)
                .and_then(|a| self.objects.get(&a))
                .map(|o| (o.id(), o.kind()))
        };

        let (parent, parent_kind) = kind_of(1).ok_or_else(|| unresolvable("no parent"))?;
        let (effect, group, hops) = match parent_kind {
            NodeKind::Effect => (parent, None, 3),
            k if k.is_group() => {
                let (effect, kind) = kind_of(2).ok_or_else(|| unresolvable("group has no parent"))?;
                if kind != NodeKind::Effect {
                    return Err(unresolvable("group is not inside an effect"));
                }
                (effect, Some(parent), 4)
            }
            _ => return Err(unresolvable("parent is neither an effect nor a group")),
        };
        let (clip, clip_kind) = kind_of(hops - 1).ok_or_else(|| unresolvable("effect has no clip"))?;
        let (scene, scene_kind) = kind_of(hops).ok_or_else(|| unresolvable("clip has no scene"))?;
        if clip_kind != NodeKind::Clip || scene_kind != NodeKind::Scene {
            return Err(unresolvable("ancestors are not a scene and a clip"));
        }

        let scene_name = self.name_of(scene)?;
        let clip_name = self.name_of(clip)?;
        let path = match group {
            None => ObjectPath::property(&scene_name, &clip_name, effect.0, id.0),
            Some(g) => ObjectPath::grouped_property(&scene_name, &clip_name, effect.0, g.0, id.0),
        };
        path.map_err(|e| unresolvable(&e.to_string()))
    }

    /// Walk `path` from the root and return the bindable leaf it names, checking
    /// that its endpoint kind equals `expected`.
    pub fn resolve(
        &self,
        path: &ObjectPath,
        expected: ValueKind,
    ) -> std::result::Result<ObjectId, PathResolutionError> {
        let text = path.to_string();
        let grouped = path.is_grouped();
        let mut current = self.root;
        for (i, segment) in path.segments().iter().enumerate() {
            let (next, label) = match segment {
                PathSegment::Name(name) => (self.find_child_by_name(current, name), name.clone()),
                PathSegment::Id(id) => (self.find_child(current, ObjectId(*id)), format!("[{id}]")),
            };
            let not_found = || PathResolutionError::NotFound {
                path: text.clone(),
                segment: label.clone(),
            };
            let next = next.ok_or_else(not_found)?;
            let kind = self.objects.get(&next).map(|o| o.kind()).ok_or_else(not_found)?;
            let fits = match (i, grouped) {
                (0, _) => kind == NodeKind::Scene,
                (1, _) => kind == NodeKind::Clip,
                (2, _) => kind == NodeKind::Effect,
                (3, true) => kind.is_group(),
                _ => true,
            };
            if !fits {
                return Err(not_found());
            }
            current = next;
        }
        match self.bindable_kind(current) {
            Ok(kind) if kind == expected => Ok(current),
            Ok(kind) => Err(PathResolutionError::TypeMismatch {
                path: text,
                expected,
                actual: Some(kind),
            }),
            Err(_) => Err(PathResolutionError::TypeMismatch {
                path: text,
                expected,
                actual: None,
            }),
        }
    }

    pub fn resolve_str(
        &self,
        path: &str,
        expected: ValueKind,
    ) -> std::result::Result<ObjectId, PathResolutionError> {
        let parsed = ObjectPath::parse(path).map_err(|source| PathResolutionError::Malformed {
            path: path.to_string(),
            source,
        })?;
        self.resolve(&parsed, expected)
    }

    /// Link `a` and `b`, dropping any previous partner of either, and copy `b`'s
    /// endpoint value into `a`.
    pub(crate) fn bind(&mut self, a: ObjectId, b: ObjectId) -> Result<BindingUndo> {
        if a == b {
            return Err(DocumentError::InvalidHierarchy {
                reason: format!("{a} cannot be bound to itself"),
            });
        }
        let kind_a = self.bindable_kind(a)?;
        let kind_b = self.bindable_kind(b)?;
        if kind_a != kind_b {
            let property = self.endpoint_name(a);
            return Err(DocumentError::TypeMismatch {
                property,
                expected: kind_a,
                actual: kind_b,
            });
        }
        for id in [a, b] {
            if !self.is_attached(id) {
                return Err(DocumentError::NotAttached { object: id });
            }
        }
        let path_a = self.serialize_location(a)?;
        let path_b = self.serialize_location(b)?;

        let mut involved = vec![a, b];
        for id in [a, b] {
            if let Some(p) = self.object(id)?.bound_to() {
                if !involved.contains(&p) {
                    involved.push(p);
                }
            }
        }
        let links = self.snapshot_links(&involved)?;

        for id in &involved {
            self.set_link(*id, None, None)?;
        }
        self.set_link(a, Some(b), Some(path_b))?;
        self.set_link(b, Some(a), Some(path_a))?;

        let copy = self.endpoint_value(b).and_then(|(value, _)| {
            let pid = self.endpoint_id(a)?;
            self.apply_local(a, pid, Some(value))
        });
        match copy {
            Ok(values) => {
                tracing::debug!(%a, %b, "bound");
                Ok(BindingUndo { links, values })
            }
            Err(err) => {
                self.restore_links(links)?;
                Err(err)
            }
        }
    }

    /// Clear the link of `a` and its partner, hints included.
    pub(crate) fn unbind(&mut self, a: ObjectId) -> Result<BindingUndo> {
        let mut involved = vec![a];
        if let Some(p) = self.object(a)?.bound_to() {
            involved.push(p);
        }
        let links = self.snapshot_links(&involved)?;
        for id in &involved {
            self.set_link(*id, None, None)?;
        }
        tracing::debug!(%a, "unbound");
        Ok(BindingUndo {
            links,
            values: Vec::new(),
        })
    }

    pub(crate) fn restore_binding(&mut self, undo: BindingUndo) -> Result<()> {
        self.restore_locals(undo.values)?;
        self.restore_links(undo.links)
    }

    /// Cut every binding that crosses the boundary of the subtree at `root`.
    /// Bindings wholly inside the subtree are kept.
    pub(crate) fn sever_external(&mut self, root: ObjectId) -> Result<Vec<LinkState>> {
        let inside: HashSet<ObjectId> = self.descendants(root)?.into_iter().collect();
        let mut involved = Vec::new();
        for id in &inside {
            if let Some(p) = self.object(*id)?.bound_to() {
                if !inside.contains(&p) {
                    involved.push(*id);
                    involved.push(p);
                }
            }
        }
        involved.sort();
        let links = self.snapshot_links(&involved)?;
        for id in &involved {
            self.set_link(*id, None, None)?;
        }
        Ok(links)
    }

    pub(crate) fn restore_links(&mut self, links: Vec<LinkState>) -> Result<()> {
        for link in links.into_iter().rev() {
            self.set_link(link.object, link.bound_to, link.hint)?;
        }
        Ok(())
    }

    /// Attached bindable leaves with a hint but no live partner, in id order.
    pub fn pending_bindings(&self) -> Vec<ObjectId> {
        let mut pending: Vec<ObjectId> = self
            .objects
            .values()
            .filter(|o| o.bind_hint().is_some() && o.bound_to().is_none())
            .map(|o| o.id())
            .filter(|id| self.is_attached(*id) && self.bindable_kind(*id).is_ok())
            .collect();
        pending.sort();
        pending
    }

    /// Link pending hints, retrying for up to `resolve_passes` passes. Returns the
    /// hints that still fail.
    pub fn resolve_bindings(&mut self) -> Vec<UnresolvedBinding> {
        let passes = self.config.resolve_passes.max(1);
        let mut pending = self.pending_bindings();
        let mut failures = Vec::new();
        for pass in 1..=passes {
            failures.clear();
            let mut progressed = false;
            for id in std::mem::take(&mut pending) {
                match self.link_hint(id) {
                    Ok(linked) => progressed |= linked,
                    Err(failure) => {
                        pending.push(id);
                        failures.push(failure);
                    }
                }
            }
            if pending.is_empty() || !progressed {
                break;
            }
            tracing::debug!(pass, remaining = pending.len(), "retrying deferred bindings");
        }
        for f in &failures {
            tracing::warn!(object = %f.object, hint = %f.hint, error = %f.error, "binding left unresolved");
        }
        failures
    }

    /// `Ok(false)` when there was nothing to do.
    fn link_hint(&mut self, id: ObjectId) -> std::result::Result<bool, UnresolvedBinding> {
        let Some(obj) = self.objects.get(&id) else {
            return Ok(false);
        };
        let Some(hint) = obj.bind_hint().cloned() else {
            return Ok(false);
        };
        if obj.bound_to().is_some() {
            return Ok(false);
        }
        let Ok(kind) = self.bindable_kind(id) else {
            return Ok(false);
        };
        let fail = |error| UnresolvedBinding {
            object: id,
            hint: hint.clone(),
            error,
        };
        let target = self.resolve(&hint, kind).map_err(fail)?;
        let partner_of_target = self.objects.get(&target).and_then(|o| o.bound_to());
        if target == id || partner_of_target.map_or(false, |p| p != id) {
            return Err(fail(PathResolutionError::AlreadyBound {
                path: hint.to_string(),
                target,
            }));
        }
        let back_hint = self.serialize_location(id).ok();
        if let Some(obj) = self.objects.get_mut(&id) {
            obj.bound_to = Some(target);
        }
        if let Some(t) = self.objects.get_mut(&target) {
            t.bound_to = Some(id);
            if t.bind_hint.is_none() {
                t.bind_hint = back_hint;
            }
        }
        tracing::trace!(%id, %target, "resolved deferred binding");
        Ok(true)
    }

    fn snapshot_links(&self, ids: &[ObjectId]) -> Result<Vec<LinkState>> {
        ids.iter()
            .map(|id| {
                let obj = self.object(*id)?;
                Ok(LinkState {
                    object: *id,
                    bound_to: obj.bound_to(),
                    hint: obj.bind_hint().cloned(),
                })
            })
            .collect()
    }

    fn set_link(&mut self, id: ObjectId, bound_to: Option<ObjectId>, hint: Option<ObjectPath>) -> Result<()> {
        let obj = self.object_mut(id)?;
        obj.bound_to = bound_to;
        obj.bind_hint = hint;
        Ok(())
    }

    fn endpoint_id(&self, id: ObjectId) -> Result<crate::ids::PropertyId> {
        let obj = self.object(id)?;
        self.types
            .bindable_property(obj.type_name())
            .map(|p| p.id())
            .ok_or(DocumentError::NotBindable { object: id })
    }

    fn endpoint_name(&self, id: ObjectId) -> String {
        self.objects
            .get(&id)
            .and_then(|o| self.types.bindable_property(o.type_name()))
            .map(|p| p.name().to_string())
            .unwrap_or_default()
    }

    fn endpoint_value(&self, id: ObjectId) -> Result<(montage_api_core::Value, crate::ids::PropertyId)> {
        let pid = self.endpoint_id(id)?;
        Ok((self.base_value(id, pid)?, pid))
    }
}

#[cfg(test)]
mod tests {
    use montage_animation_core::Time;
    use montage_api_core::Value;

    use super::*;
    use crate::registry::{Property, TypeSystem, CORE_OBJECT};

    struct Tree {
        doc: Document,
        value: Property<f32>,
        clip: ObjectId,
        effect: ObjectId,
    }

    fn tree() -> Tree {
        let mut ts = TypeSystem::new();
        ts.register_type("FloatProperty", None).unwrap();
        let value = ts
            .register_property::<f32>("FloatProperty", "Value")
            .bindable()
            .register()
            .unwrap();
        ts.register_type("PercentProperty", None).unwrap();
        ts.register_property::<f32>("PercentProperty", "Value")
            .range(0.0, 100.0)
            .bindable()
            .register()
            .unwrap();
        ts.register_type("TextProperty", None).unwrap();
        ts.register_property::<String>("TextProperty", "Text")
            .bindable()
            .register()
            .unwrap();
        let mut doc = Document::new(ts.freeze());
        let root = doc.root();
        let scene = doc.create_named(CORE_OBJECT, NodeKind::Scene, "Scene1").unwrap();
        let clip = doc.create_named(CORE_OBJECT, NodeKind::Clip, "Clip2").unwrap();
        let effect = doc.create(CORE_OBJECT, NodeKind::Effect).unwrap();
        doc.attach(root, None, scene).unwrap();
        doc.attach(scene, None, clip).unwrap();
        doc.attach(clip, None, effect).unwrap();
        Tree {
            doc,
            value,
            clip,
            effect,
        }
    }

    fn leaf(doc: &mut Document, parent: ObjectId, type_name: &str) -> ObjectId {
        let id = doc.create(type_name, NodeKind::LEAF).unwrap();
        doc.attach(parent, None, id).unwrap();
        id
    }

    #[test]
    fn serialize_and_resolve_round_trip() {
        let mut t = tree();
        let direct = leaf(&mut t.doc, t.effect, "FloatProperty");
        let group = t.doc.create(CORE_OBJECT, NodeKind::GROUP).unwrap();
        t.doc.attach(t.effect, None, group).unwrap();
        let nested = leaf(&mut t.doc, group, "FloatProperty");

        let p = t.doc.serialize_location(direct).unwrap();
        assert_eq!(p.to_string(), format!("Scene1.Clip2[{}][{}]", t.effect.0, direct.0));
        assert_eq!(t.doc.resolve(&p, ValueKind::Float).unwrap(), direct);

        let g = t.doc.serialize_location(nested).unwrap();
        assert!(g.is_grouped());
        assert_eq!(t.doc.resolve(&g, ValueKind::Float).unwrap(), nested);
    }

    #[test]
    fn serialized_text_parses_back_to_the_same_leaf() {
        let mut t = tree();
        let direct = leaf(&mut t.doc, t.effect, "FloatProperty");
        let group = t.doc.create(CORE_OBJECT, NodeKind::GROUP).unwrap();
        t.doc.attach(t.effect, None, group).unwrap();
        let nested = leaf(&mut t.doc, group, "FloatProperty");

        for (id, segments) in [(direct, 4), (nested, 5)] {
            let text = t.doc.serialize_location(id).unwrap().to_string();
            let parsed = ObjectPath::parse(&text).unwrap();
            assert_eq!(parsed.segments().len(), segments);
            assert_eq!(t.doc.resolve_str(&text, ValueKind::Float).unwrap(), id);
        }
    }

    #[test]
    fn resolve_failures() {
        let mut t = tree();
        let direct = leaf(&mut t.doc, t.effect, "FloatProperty");
        let text = format!("Scene1.Clip2[{}][{}]", t.effect.0, direct.0);
        assert!(matches!(
            t.doc.resolve_str(&text, ValueKind::Text),
            Err(PathResolutionError::TypeMismatch { actual: Some(ValueKind::Float), .. })
        ));
        assert!(matches!(
            t.doc.resolve_str("Scene1.Missing[1][2]", ValueKind::Float),
            Err(PathResolutionError::NotFound { segment, .. }) if segment == "Missing"
        ));
        assert!(matches!(
            t.doc.resolve_str("Scene1..Clip2", ValueKind::Float),
            Err(PathResolutionError::Malformed { .. })
        ));
        // The effect itself is not a leaf.
        let effect_path = format!("Scene1.Clip2[{}][{}]", t.clip.0, t.effect.0);
        assert!(t.doc.resolve_str(&effect_path, ValueKind::Float).is_err());
    }

    #[test]
    fn detached_leaf_has_no_location() {
        let mut t = tree();
        let loose = t.doc.create("FloatProperty", NodeKind::LEAF).unwrap();
        assert!(matches!(
            t.doc.serialize_location(loose),
            Err(DocumentError::UnresolvableLocation { .. })
        ));
        assert!(matches!(
            t.doc.serialize_location(t.effect),
            Err(DocumentError::NotBindable { .. })
        ));
    }

    #[test]
    fn bind_copies_and_mirrors() {
        let mut t = tree();
        let a = leaf(&mut t.doc, t.effect, "FloatProperty");
        let b = leaf(&mut t.doc, t.effect, "FloatProperty");
        t.doc.set_value(b, t.value, 7.0).unwrap();

        let undo = t.doc.bind(a, b).unwrap();
        assert_eq!(t.doc.get_value(a, t.value, Time::ZERO).unwrap(), 7.0);
        t.doc.set_value(a, t.value, 3.0).unwrap();
        assert_eq!(t.doc.get_value(b, t.value, Time::ZERO).unwrap(), 3.0);

        t.doc.set_value(a, t.value, 7.0).unwrap();
        t.doc.restore_binding(undo).unwrap();
        assert_eq!(t.doc.object(a).unwrap().bound_to(), None);
        assert_eq!(t.doc.get_value(a, t.value, Time::ZERO).unwrap(), 0.0);
    }

    #[test]
    fn clamped_partner_value_flows_back() {
        let mut t = tree();
        let wide = leaf(&mut t.doc, t.effect, "FloatProperty");
        let pct = leaf(&mut t.doc, t.effect, "PercentProperty");
        let pct_value = t.doc.endpoint_id(pct).unwrap();
        t.doc.bind(wide, pct).unwrap();

        let priors = t.doc.apply_local(wide, t.value.id(), Some(Value::Float(150.0))).unwrap();
        assert_eq!(t.doc.get_value(wide, t.value, Time::ZERO).unwrap(), 100.0);
        assert_eq!(t.doc.base_value(pct, pct_value).unwrap(), Value::Float(100.0));

        t.doc.restore_locals(priors).unwrap();
        assert_eq!(t.doc.get_value(wide, t.value, Time::ZERO).unwrap(), 0.0);
        assert_eq!(t.doc.base_value(pct, pct_value).unwrap(), Value::Float(0.0));
    }

    #[test]
    fn bind_rejects_mismatched_kinds() {
        let mut t = tree();
        let a = leaf(&mut t.doc, t.effect, "FloatProperty");
        let s = leaf(&mut t.doc, t.effect, "TextProperty");
        assert!(matches!(
            t.doc.bind(a, s),
            Err(DocumentError::TypeMismatch { .. })
        ));
        let loose = t.doc.create("FloatProperty", NodeKind::LEAF).unwrap();
        assert!(matches!(
            t.doc.bind(a, loose),
            Err(DocumentError::NotAttached { .. })
        ));
    }

    #[test]
    fn rebinding_drops_previous_partner() {
        let mut t = tree();
        let a = leaf(&mut t.doc, t.effect, "FloatProperty");
        let b = leaf(&mut t.doc, t.effect, "FloatProperty");
        let c = leaf(&mut t.doc, t.effect, "FloatProperty");
        t.doc.bind(a, b).unwrap();
        t.doc.bind(a, c).unwrap();
        assert_eq!(t.doc.object(b).unwrap().bound_to(), None);
        assert_eq!(t.doc.object(b).unwrap().bind_hint(), None);
        assert_eq!(t.doc.object(c).unwrap().bound_to(), Some(a));
    }

    #[test]
    fn deferred_hint_links_once_target_exists() {
        let mut t = tree();
        let a = leaf(&mut t.doc, t.effect, "FloatProperty");
        let b = leaf(&mut t.doc, t.effect, "FloatProperty");
        let hint = t.doc.serialize_location(b).unwrap();
        t.doc.object_mut(a).unwrap().bind_hint = Some(hint);
        assert_eq!(t.doc.pending_bindings(), vec![a]);

        assert!(t.doc.resolve_bindings().is_empty());
        assert_eq!(t.doc.object(a).unwrap().bound_to(), Some(b));
        assert_eq!(t.doc.object(b).unwrap().bound_to(), Some(a));
        assert!(t.doc.object(b).unwrap().bind_hint().is_some());
    }

    #[test]
    fn unresolvable_hint_is_reported() {
        let mut t = tree();
        let a = leaf(&mut t.doc, t.effect, "FloatProperty");
        t.doc.object_mut(a).unwrap().bind_hint = Some(ObjectPath::parse("Nowhere.Clip[1][2]").unwrap());
        let failures = t.doc.resolve_bindings();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].object, a);
        assert!(t.doc.object(a).unwrap().bind_hint().is_some());
    }
}
