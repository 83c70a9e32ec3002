use serde::{Deserialize, Serialize};

use crate::commands::{Command, CommandState, TrackedCommand};
use crate::config::DocumentConfig;
use crate::document::Document;
use crate::error::{DocumentError, Result};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandKind {
    Do,
    Undo,
    Redo,
    Cleared,
}

/// Raised after every successful history change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEvent {
    pub kind: CommandKind,
    /// Command name; empty for [`CommandKind::Cleared`].
    pub name: String,
}

type Observer = Box<dyn FnMut(&CommandEvent)>;

/// Undo and redo stacks for one document.
pub struct CommandRecorder {
    undo: Vec<TrackedCommand>,
    redo: Vec<TrackedCommand>,
    history_limit: Option<usize>,
    observers: Vec<Observer>,
}

impl Default for CommandRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRecorder {
    pub fn new() -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            history_limit: None,
            observers: Vec::new(),
        }
    }

    /// Recorder honouring the document's `history_limit`.
    pub fn with_config(config: &DocumentConfig) -> Self {
        Self {
            history_limit: config.history_limit,
            ..Self::new()
        }
    }

    pub fn history_limit(&self) -> Option<usize> {
        self.history_limit
    }

    pub fn set_history_limit(&mut self, doc: &mut Document, limit: Option<usize>) {
        self.history_limit = limit;
        self.enforce_limit(doc);
    }

    pub fn observe<F>(&mut self, observer: F)
    where
        F: FnMut(&CommandEvent) + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Execute `command` and record it. On failure nothing is recorded and the
    /// redo stack is left intact.
    pub fn push(&mut self, doc: &mut Document, command: Box<dyn Command>) -> Result<()> {
        let mut tracked = TrackedCommand::new(command);
        let name = tracked.name();
        if let Err(err) = tracked.do_(doc) {
            tracing::debug!(command = %name, error = %err, "command failed, not recorded");
            return Err(err);
        }
        for stale in self.redo.drain(..).rev() {
            stale.discard(doc);
        }
        self.undo.push(tracked);
        self.enforce_limit(doc);
        tracing::debug!(command = %name, depth = self.undo.len(), "do");
        self.emit(CommandKind::Do, name);
        Ok(())
    }

    pub fn undo(&mut self, doc: &mut Document) -> Result<()> {
        let mut tracked = self.undo.pop().ok_or(DocumentError::NothingToUndo)?;
        debug_assert_eq!(tracked.state(), CommandState::Done);
        let name = tracked.name();
        if let Err(err) = tracked.undo(doc) {
            tracing::debug!(command = %name, error = %err, "undo failed");
            self.undo.push(tracked);
            return Err(err);
        }
        self.redo.push(tracked);
        tracing::debug!(command = %name, "undo");
        self.emit(CommandKind::Undo, name);
        Ok(())
    }

    pub fn redo(&mut self, doc: &mut Document) -> Result<()> {
        let mut tracked = self.redo.pop().ok_or(DocumentError::NothingToRedo)?;
        debug_assert_eq!(tracked.state(), CommandState::Undone);
        let name = tracked.name();
        if let Err(err) = tracked.redo(doc) {
            tracing::debug!(command = %name, error = %err, "redo failed");
            self.redo.push(tracked);
            return Err(err);
        }
        self.undo.push(tracked);
        tracing::debug!(command = %name, "redo");
        self.emit(CommandKind::Redo, name);
        Ok(())
    }

    /// Forget the whole history. The document keeps its current state.
    pub fn clear(&mut self, doc: &mut Document) {
        for cmd in self.redo.drain(..).rev() {
            cmd.discard(doc);
        }
        for cmd in self.undo.drain(..).rev() {
            cmd.discard(doc);
        }
        self.emit(CommandKind::Cleared, String::new());
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Undo history, most recent first.
    pub fn undo_names(&self) -> Vec<String> {
        self.undo.iter().rev().map(TrackedCommand::name).collect()
    }

    /// Redo history, next to redo first.
    pub fn redo_names(&self) -> Vec<String> {
        self.redo.iter().rev().map(TrackedCommand::name).collect()
    }

    fn enforce_limit(&mut self, doc: &mut Document) {
        let Some(limit) = self.history_limit else {
            return;
        };
        if self.undo.len() <= limit {
            return;
        }
        let excess = self.undo.len() - limit;
        for old in self.undo.drain(..excess) {
            tracing::trace!(command = %old.name(), "evicted from history");
            old.discard(doc);
        }
    }

    fn emit(&mut self, kind: CommandKind, name: String) {
        let event = CommandEvent { kind, name };
        for observer in &mut self.observers {
            observer(&event);
        }
    }
}

impl std::fmt::Debug for CommandRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRecorder")
            .field("undo", &self.undo)
            .field("redo", &self.redo)
            .field("history_limit", &self.history_limit)
            .field("observers", &self.observers.len())
            .finish()
    }
}
