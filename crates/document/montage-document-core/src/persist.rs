//! Persisted form of a document.
//!
//! Loading bypasses the command stack: objects come back with their stored ids,
//! the id allocator is advanced past the highest one, and bind hints are resolved
//! in deferred passes once the whole tree exists.

use std::sync::Arc;

use hashbrown::HashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use montage_animation_core::KeyFrameAnimation;
use montage_api_core::{ObjectPath, Value};

use crate::binding::UnresolvedBinding;
use crate::config::DocumentConfig;
use crate::document::Document;
use crate::error::{DocumentError, Result};
use crate::ids::ObjectId;
use crate::notify::PropertyChanged;
use crate::object::{CoreObject, NodeKind};
use crate::registry::TypeSystem;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub version: u32,
    pub root: ObjectRecord,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    #[serde(rename = "type")]
    pub type_name: String,
    pub id: ObjectId,
    pub kind: NodeKind,
    /// Non-default serializable values keyed by serialize name.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub animations: IndexMap<String, KeyFrameAnimation<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_hint: Option<ObjectPath>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ObjectRecord>,
}

/// A stored entry that was dropped on load.
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedEntry {
    pub object: ObjectId,
    pub key: String,
    pub reason: String,
}

/// Non-fatal findings of a load.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadReport {
    pub unresolved: Vec<UnresolvedBinding>,
    pub skipped: Vec<SkippedEntry>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty() && self.skipped.is_empty()
    }
}

impl Document {
    pub fn to_record(&self) -> Result<DocumentRecord> {
        Ok(DocumentRecord {
            version: FORMAT_VERSION,
            root: self.object_record(self.root)?,
        })
    }

    fn object_record(&self, id: ObjectId) -> Result<ObjectRecord> {
        let obj = self.object(id)?;
        let mut properties = IndexMap::new();
        let mut animations = IndexMap::new();
        for meta in self.types.properties_of(obj.type_name()) {
            if !meta.is_serializable() {
                continue;
            }
            if let Some(v) = obj.local_value(meta.id()) {
                if v != meta.default_value() {
                    properties.insert(meta.serialize_name().to_string(), v.clone());
                }
            }
            if let Some(anim) = obj.animation(meta.id()) {
                animations.insert(meta.serialize_name().to_string(), anim.clone());
            }
        }
        // A live partner's current location wins over the stored hint.
        let bind_hint = match obj.bound_to() {
            Some(partner) => self
                .serialize_location(partner)
                .ok()
                .or_else(|| obj.bind_hint().cloned()),
            None => obj.bind_hint().cloned(),
        };
        let children = obj
            .children()
            .iter()
            .map(|c| self.object_record(*c))
            .collect::<Result<Vec<_>>>()?;
        Ok(ObjectRecord {
            type_name: obj.type_name().to_string(),
            id,
            kind: obj.kind(),
            properties,
            animations,
            bind_hint,
            children,
        })
    }

    pub fn from_record(
        types: Arc<TypeSystem>,
        record: &DocumentRecord,
        config: DocumentConfig,
    ) -> Result<(Document, LoadReport)> {
        let mut doc = Document::with_config(types, config);
        let report = doc.load_record(record)?;
        Ok((doc, report))
    }

    /// Replace the whole tree with `record`. Subscriptions survive; with
    /// `notify_on_load` they see every restored value. On error the document is
    /// left untouched.
    pub fn load_record(&mut self, record: &DocumentRecord) -> Result<LoadReport> {
        if record.version > FORMAT_VERSION {
            return Err(DocumentError::Serialization {
                reason: format!(
                    "format version {} is newer than supported {}",
                    record.version, FORMAT_VERSION
                ),
            });
        }
        if record.root.kind != NodeKind::Root {
            return Err(DocumentError::InvalidHierarchy {
                reason: format!("top-level object {} is not a root", record.root.id),
            });
        }
        let types = Arc::clone(&self.types);
        let mut loader = Loader {
            types: &types,
            objects: HashMap::new(),
            report: LoadReport::default(),
        };
        loader.load(&record.root, None)?;
        let Loader {
            objects,
            mut report,
            ..
        } = loader;

        // Ids handed out before the load stay retired.
        for id in objects.keys() {
            self.ids.advance_past(*id);
        }
        self.objects = objects;
        self.root = record.root.id;
        report.unresolved = self.resolve_bindings();
        if self.config.notify_on_load {
            self.replay_loaded_values();
        }
        tracing::debug!(
            objects = self.len(),
            unresolved = report.unresolved.len(),
            skipped = report.skipped.len(),
            "document loaded"
        );
        Ok(report)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_record()?)?)
    }

    pub fn from_json(
        types: Arc<TypeSystem>,
        json: &str,
        config: DocumentConfig,
    ) -> Result<(Document, LoadReport)> {
        let record: DocumentRecord = serde_json::from_str(json)?;
        Self::from_record(types, &record, config)
    }

    /// Raise a change event for every stored value, as if it had just been set.
    pub fn replay_loaded_values(&mut self) {
        let mut ids: Vec<ObjectId> = self.objects.keys().copied().collect();
        ids.sort();
        let types = Arc::clone(&self.types);
        let mut events = Vec::new();
        for id in ids {
            let Some(obj) = self.objects.get(&id) else {
                continue;
            };
            for (pid, value) in obj.local_values() {
                if let Some(meta) = types.property(pid) {
                    events.push(PropertyChanged {
                        object: id,
                        property: pid,
                        name: meta.name().to_string(),
                        old: meta.default_value().clone(),
                        new: value.clone(),
                    });
                }
            }
        }
        for event in &events {
            self.emit(event);
        }
    }
}

struct Loader<'a> {
    types: &'a TypeSystem,
    objects: HashMap<ObjectId, CoreObject>,
    report: LoadReport,
}

impl Loader<'_> {
    fn load(&mut self, record: &ObjectRecord, parent: Option<ObjectId>) -> Result<()> {
        self.types.type_info(&record.type_name)?;
        if self.objects.contains_key(&record.id) {
            return Err(DocumentError::InvalidHierarchy {
                reason: format!("object id {} appears twice", record.id),
            });
        }
        if parent.is_some() && record.kind == NodeKind::Root {
            return Err(DocumentError::InvalidHierarchy {
                reason: format!("nested root {}", record.id),
            });
        }

        let mut obj = CoreObject::new(record.id, &record.type_name, record.kind);
        obj.parent = parent;
        obj.bind_hint = record.bind_hint.clone();
        obj.children = record.children.iter().map(|c| c.id).collect();

        for (key, value) in &record.properties {
            let Some(meta) = self.types.find_by_serialize_name(&record.type_name, key) else {
                self.skip(record.id, key, "no such property".into());
                continue;
            };
            match meta.coerce(value.clone()) {
                Ok(v) if v == *meta.default_value() => {}
                Ok(v) => {
                    obj.put_local(meta.id(), Some(v));
                }
                Err(err) => self.skip(record.id, key, err.to_string()),
            }
        }
        for (key, anim) in &record.animations {
            let Some(meta) = self.types.find_by_serialize_name(&record.type_name, key) else {
                self.skip(record.id, key, "no such property".into());
                continue;
            };
            if !meta.is_animatable() {
                self.skip(record.id, key, "property is not animatable".into());
                continue;
            }
            match anim.check_kind(meta.kind()) {
                Ok(()) => {
                    obj.put_animation(meta.id(), Some(anim.clone()));
                }
                Err(err) => self.skip(record.id, key, err.to_string()),
            }
        }

        self.objects.insert(record.id, obj);
        for child in &record.children {
            self.load(child, Some(record.id))?;
        }
        Ok(())
    }

    fn skip(&mut self, object: ObjectId, key: &str, reason: String) {
        tracing::warn!(%object, key, %reason, "skipping stored entry");
        self.report.skipped.push(SkippedEntry {
            object,
            key: key.to_string(),
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use montage_animation_core::Time;

    use super::*;
    use crate::registry::{Property, CORE_OBJECT};

    fn types() -> (Arc<TypeSystem>, Property<f32>) {
        let mut ts = TypeSystem::new();
        ts.register_type("Layer", None).unwrap();
        let opacity = ts
            .register_property::<f32>("Layer", "Opacity")
            .default_value(100.0)
            .serialize_name("opacity")
            .register()
            .unwrap();
        ts.register_property::<f32>("Layer", "Scratch")
            .transient()
            .register()
            .unwrap();
        (ts.freeze(), opacity)
    }

    #[test]
    fn only_non_default_serializable_values_are_written() {
        let (types, opacity) = types();
        let mut doc = Document::new(Arc::clone(&types));
        let layer = doc.create_named("Layer", NodeKind::Scene, "L").unwrap();
        doc.attach(doc.root(), None, layer).unwrap();
        doc.set_value(layer, opacity, 40.0).unwrap();
        let scratch = types.find_property("Layer", "Scratch").unwrap().id();
        doc.set_value_untyped(layer, scratch, Value::Float(3.0)).unwrap();

        let record = doc.to_record().unwrap();
        let stored = &record.root.children[0];
        assert_eq!(stored.properties.len(), 2);
        assert_eq!(stored.properties["name"], Value::text("L"));
        assert_eq!(stored.properties["opacity"], Value::Float(40.0));
        assert!(record.root.properties.is_empty());
    }

    #[test]
    fn load_keeps_ids_and_advances_allocator() {
        let (types, opacity) = types();
        let mut doc = Document::new(Arc::clone(&types));
        let layer = doc.create("Layer", NodeKind::Scene).unwrap();
        doc.attach(doc.root(), None, layer).unwrap();
        doc.set_value(layer, opacity, 12.0).unwrap();

        let json = doc.to_json().unwrap();
        let (mut loaded, report) =
            Document::from_json(types, &json, DocumentConfig::default()).unwrap();
        assert!(report.is_clean());
        assert_eq!(loaded.get_value(layer, opacity, Time::ZERO).unwrap(), 12.0);
        let fresh = loaded.create(CORE_OBJECT, NodeKind::Scene).unwrap();
        assert!(fresh > layer);
        assert_eq!(loaded.to_record().unwrap(), doc.to_record().unwrap());
    }

    #[test]
    fn unknown_and_mistyped_entries_are_skipped() {
        let (types, _) = types();
        let json = r#"{
            "version": 1,
            "root": {
                "type": "CoreObject", "id": 0, "kind": "root",
                "children": [{
                    "type": "Layer", "id": 4, "kind": "scene",
                    "properties": {
                        "opacity": {"type": "Text", "data": "loud"},
                        "ghost": {"type": "Float", "data": 1.0}
                    }
                }]
            }
        }"#;
        let (doc, report) = Document::from_json(types, json, DocumentConfig::default()).unwrap();
        assert_eq!(report.skipped.len(), 2);
        assert!(doc.contains(ObjectId(4)));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let (types, _) = types();
        let json = r#"{"version": 1, "root": {"type": "CoreObject", "id": 0, "kind": "root",
            "children": [{"type": "Layer", "id": 0, "kind": "scene"}]}}"#;
        assert!(matches!(
            Document::from_json(types, json, DocumentConfig::default()),
            Err(DocumentError::InvalidHierarchy { .. })
        ));
    }

    #[test]
    fn reload_notifies_when_configured() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let (types, opacity) = types();
        let mut source = Document::new(Arc::clone(&types));
        let layer = source.create("Layer", NodeKind::Scene).unwrap();
        source.attach(source.root(), None, layer).unwrap();
        source.set_value(layer, opacity, 5.0).unwrap();
        let record = source.to_record().unwrap();

        let config = DocumentConfig {
            notify_on_load: true,
            ..DocumentConfig::default()
        };
        let mut target = Document::with_config(types, config);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        target.subscribe_all(move |e| sink.borrow_mut().push(e.name.clone()));
        target.load_record(&record).unwrap();
        assert_eq!(*seen.borrow(), vec!["Opacity".to_string()]);
    }

    #[test]
    fn unknown_type_is_fatal() {
        let (types, _) = types();
        let json = r#"{"version": 1, "root": {"type": "Nope", "id": 0, "kind": "root"}}"#;
        assert!(matches!(
            Document::from_json(types, json, DocumentConfig::default()),
            Err(DocumentError::UnknownType { .. })
        ));
    }
}
