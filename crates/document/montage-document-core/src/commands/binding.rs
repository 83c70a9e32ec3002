use crate::binding::BindingUndo;
use crate::commands::Command;
use crate::document::Document;
use crate::error::{DocumentError, Result};
use crate::ids::ObjectId;

/// Bind two leaves. `source` takes `target`'s current value.
#[derive(Debug)]
pub struct BindCommand {
    source: ObjectId,
    target: ObjectId,
    undo: Option<BindingUndo>,
}

impl BindCommand {
    pub fn new(source: ObjectId, target: ObjectId) -> Self {
        Self {
            source,
            target,
            undo: None,
        }
    }
}

impl Command for BindCommand {
    fn name(&self) -> String {
        format!("Bind {} to {}", self.source, self.target)
    }

    fn do_(&mut self, doc: &mut Document) -> Result<()> {
        self.undo = Some(doc.bind(self.source, self.target)?);
        Ok(())
    }

    fn undo(&mut self, doc: &mut Document) -> Result<()> {
        let undo = self
            .undo
            .take()
            .ok_or_else(|| DocumentError::invalid_state(self.name(), "nothing recorded"))?;
        doc.restore_binding(undo)
    }
}

/// Remove the binding of a leaf from both sides.
#[derive(Debug)]
pub struct DisconnectCommand {
    object: ObjectId,
    undo: Option<BindingUndo>,
}

impl DisconnectCommand {
    pub fn new(object: ObjectId) -> Self {
        Self { object, undo: None }
    }
}

impl Command for DisconnectCommand {
    fn name(&self) -> String {
        format!("Disconnect {}", self.object)
    }

    fn do_(&mut self, doc: &mut Document) -> Result<()> {
        self.undo = Some(doc.unbind(self.object)?);
        Ok(())
    }

    fn undo(&mut self, doc: &mut Document) -> Result<()> {
        let undo = self
            .undo
            .take()
            .ok_or_else(|| DocumentError::invalid_state(self.name(), "nothing recorded"))?;
        doc.restore_binding(undo)
    }
}
