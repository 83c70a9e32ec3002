use crate::commands::Command;
use crate::document::Document;
use crate::error::Result;

/// Several commands recorded as one history entry.
///
/// Steps run in order and undo in reverse. When a step fails the steps already
/// applied are undone before the error is returned.
pub struct BatchCommand {
    name: String,
    steps: Vec<Box<dyn Command>>,
}

impl BatchCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn with(mut self, step: Box<dyn Command>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn push(&mut self, step: Box<dyn Command>) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn run(&mut self, doc: &mut Document, redo: bool) -> Result<()> {
        for i in 0..self.steps.len() {
            let step = &mut self.steps[i];
            let outcome = if redo { step.redo(doc) } else { step.do_(doc) };
            if let Err(err) = outcome {
                tracing::debug!(batch = %self.name, step = i, error = %err, "rolling back batch");
                for done in self.steps[..i].iter_mut().rev() {
                    if let Err(undo_err) = done.undo(doc) {
                        tracing::warn!(batch = %self.name, error = %undo_err, "batch rollback incomplete");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

impl Command for BatchCommand {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn do_(&mut self, doc: &mut Document) -> Result<()> {
        self.run(doc, false)
    }

    fn redo(&mut self, doc: &mut Document) -> Result<()> {
        self.run(doc, true)
    }

    fn undo(&mut self, doc: &mut Document) -> Result<()> {
        for step in self.steps.iter_mut().rev() {
            step.undo(doc)?;
        }
        Ok(())
    }

    fn discard(&mut self, doc: &mut Document) {
        for step in &mut self.steps {
            step.discard(doc);
        }
    }
}

impl std::fmt::Debug for BatchCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchCommand")
            .field("name", &self.name)
            .field("steps", &self.steps.len())
            .finish()
    }
}
