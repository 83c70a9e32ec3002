use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;

use montage_api_core::Color;
use montage_document_core::{
    Document, DocumentRecord, NodeKind, ObjectId, Property, TypeSystem, CORE_OBJECT,
};

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    documents: HashMap<String, String>,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn lookup<'a>(map: &'a HashMap<String, String>, kind: &str, name: &str) -> Result<&'a str> {
    map.get(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

/// Stored documents, loadable against [`standard_types`].
pub mod documents {
    use super::*;

    pub fn keys() -> Vec<String> {
        let mut keys: Vec<String> = MANIFEST.documents.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn json(name: &str) -> Result<String> {
        let rel = lookup(&MANIFEST.documents, "document", name)?;
        read_to_string(rel)
    }

    pub fn record(name: &str) -> Result<DocumentRecord> {
        let text = json(name)?;
        serde_json::from_str(&text).with_context(|| format!("failed to parse document fixture {name}"))
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let rel = lookup(&MANIFEST.documents, "document", name)?;
        Ok(resolve_path(rel))
    }
}

/// The type table every fixture document is written against.
#[derive(Debug, Clone)]
pub struct StandardTypes {
    pub types: Arc<TypeSystem>,
    pub enabled: Property<bool>,
    pub opacity: Property<f32>,
    pub tint: Property<Color>,
    pub float_value: Property<f32>,
    pub color_value: Property<Color>,
    pub text_value: Property<String>,
}

pub fn standard_types() -> Result<StandardTypes> {
    let mut ts = TypeSystem::new();
    for name in ["Scene", "Clip", "Effect", "PropertyGroup"] {
        ts.register_type(name, None)?;
    }
    let enabled = ts
        .register_property::<bool>("Effect", "Enabled")
        .default_value(true)
        .designable()
        .serialize_name("enabled")
        .register()?;

    ts.register_type("Layer", Some("Effect"))?;
    let opacity = ts
        .register_property::<f32>("Layer", "Opacity")
        .default_value(100.0)
        .animatable()
        .designable()
        .range(0.0, 100.0)
        .serialize_name("opacity")
        .register()?;
    let tint = ts
        .register_property::<Color>("Layer", "Tint")
        .default_value(Color::WHITE)
        .animatable()
        .serialize_name("tint")
        .register()?;

    ts.register_type("FloatProperty", None)?;
    let float_value = ts
        .register_property::<f32>("FloatProperty", "Value")
        .animatable()
        .bindable()
        .serialize_name("value")
        .register()?;
    ts.register_type("ColorProperty", None)?;
    let color_value = ts
        .register_property::<Color>("ColorProperty", "Value")
        .default_value(Color::BLACK)
        .animatable()
        .bindable()
        .serialize_name("value")
        .register()?;
    ts.register_type("TextProperty", None)?;
    let text_value = ts
        .register_property::<String>("TextProperty", "Value")
        .bindable()
        .serialize_name("value")
        .register()?;

    Ok(StandardTypes {
        types: ts.freeze(),
        enabled,
        opacity,
        tint,
        float_value,
        color_value,
        text_value,
    })
}

/// Scene, clip and effect ids of a freshly built chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chain {
    pub scene: ObjectId,
    pub clip: ObjectId,
    pub effect: ObjectId,
}

/// Attach `scene/clip/Layer` under the root, outside the command stack.
pub fn build_chain(doc: &mut Document, scene: &str, clip: &str) -> Result<Chain> {
    let root = doc.root();
    let scene_id = doc.create_named("Scene", NodeKind::Scene, scene)?;
    let clip_id = doc.create_named("Clip", NodeKind::Clip, clip)?;
    let effect = doc.create("Layer", NodeKind::Effect)?;
    doc.attach(root, None, scene_id)?;
    doc.attach(scene_id, None, clip_id)?;
    doc.attach(clip_id, None, effect)?;
    Ok(Chain {
        scene: scene_id,
        clip: clip_id,
        effect,
    })
}

/// Create a detached leaf of `type_name`.
pub fn leaf(doc: &mut Document, type_name: &str) -> Result<ObjectId> {
    Ok(doc.create(type_name, NodeKind::LEAF)?)
}

/// Create a detached property group.
pub fn group(doc: &mut Document) -> Result<ObjectId> {
    Ok(doc.create("PropertyGroup", NodeKind::GROUP)?)
}

/// Plain `CoreObject` used where only tree shape matters.
pub fn plain(doc: &mut Document, kind: NodeKind) -> Result<ObjectId> {
    Ok(doc.create(CORE_OBJECT, kind)?)
}
