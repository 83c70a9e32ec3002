use montage_animation_core::KeyFrameAnimation;
use montage_api_core::{PropertyValue, Value};

use crate::commands::Command;
use crate::document::{Document, PriorLocal};
use crate::error::{DocumentError, Result};
use crate::ids::{ObjectId, PropertyId};
use crate::registry::Property;

/// Set or clear one local value. Old and new values are captured when the command
/// is built; writes propagated to a bound partner are captured when it runs.
#[derive(Debug)]
pub struct ChangePropertyCommand {
    object: ObjectId,
    property: PropertyId,
    label: String,
    old: Option<Value>,
    new: Option<Value>,
    applied: Vec<PriorLocal>,
}

impl ChangePropertyCommand {
    pub fn new<T: PropertyValue>(
        doc: &Document,
        object: ObjectId,
        property: Property<T>,
        value: T,
    ) -> Result<Self> {
        Self::build(doc, object, property.id(), Some(value.into_value()))
    }

    pub fn untyped(doc: &Document, object: ObjectId, property: PropertyId, value: Value) -> Result<Self> {
        Self::build(doc, object, property, Some(value))
    }

    /// Remove the local value so the property reads its default again.
    pub fn clear(doc: &Document, object: ObjectId, property: PropertyId) -> Result<Self> {
        Self::build(doc, object, property, None)
    }

    fn build(doc: &Document, object: ObjectId, property: PropertyId, new: Option<Value>) -> Result<Self> {
        let obj = doc.object(object)?;
        let meta = doc.types().metadata_for(obj.type_name(), property)?;
        if let Some(v) = &new {
            if v.kind() != meta.kind() {
                return Err(DocumentError::TypeMismatch {
                    property: meta.name().to_string(),
                    expected: meta.kind(),
                    actual: v.kind(),
                });
            }
        }
        Ok(Self {
            object,
            property,
            label: meta.name().to_string(),
            old: obj.local_value(property).cloned(),
            new,
            applied: Vec::new(),
        })
    }

    /// Local value at construction time.
    pub fn old_value(&self) -> Option<&Value> {
        self.old.as_ref()
    }

    pub fn new_value(&self) -> Option<&Value> {
        self.new.as_ref()
    }
}

impl Command for ChangePropertyCommand {
    fn name(&self) -> String {
        match self.new {
            Some(_) => format!("Change {}", self.label),
            None => format!("Clear {}", self.label),
        }
    }

    fn do_(&mut self, doc: &mut Document) -> Result<()> {
        self.applied = doc.apply_local(self.object, self.property, self.new.clone())?;
        Ok(())
    }

    fn undo(&mut self, doc: &mut Document) -> Result<()> {
        doc.restore_locals(std::mem::take(&mut self.applied))
    }
}

/// Attach, replace or detach the animation of one property.
#[derive(Debug)]
pub struct SetAnimationCommand {
    object: ObjectId,
    property: PropertyId,
    label: String,
    animation: Option<KeyFrameAnimation<Value>>,
    previous: Option<KeyFrameAnimation<Value>>,
}

impl SetAnimationCommand {
    pub fn new(
        doc: &Document,
        object: ObjectId,
        property: PropertyId,
        animation: Option<KeyFrameAnimation<Value>>,
    ) -> Result<Self> {
        let obj = doc.object(object)?;
        let meta = doc.types().metadata_for(obj.type_name(), property)?;
        Ok(Self {
            object,
            property,
            label: meta.name().to_string(),
            animation,
            previous: None,
        })
    }
}

impl Command for SetAnimationCommand {
    fn name(&self) -> String {
        match self.animation {
            Some(_) => format!("Animate {}", self.label),
            None => format!("Remove animation of {}", self.label),
        }
    }

    fn do_(&mut self, doc: &mut Document) -> Result<()> {
        self.previous = doc.set_animation(self.object, self.property, self.animation.clone())?;
        Ok(())
    }

    fn undo(&mut self, doc: &mut Document) -> Result<()> {
        doc.set_animation(self.object, self.property, self.previous.take())?;
        Ok(())
    }
}
