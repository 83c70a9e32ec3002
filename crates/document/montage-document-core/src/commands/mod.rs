//! Reversible edits and the undo/redo history.
//!
//! Every mutation of committed document state goes through a [`Command`] pushed on a
//! [`CommandRecorder`]. A command that fails in `do_` leaves the document as it found
//! it and is never recorded.

mod batch;
mod binding;
mod list;
mod property;
mod recorder;

pub use batch::BatchCommand;
pub use binding::{BindCommand, DisconnectCommand};
pub use list::{
    AddCommand, Children, ClearCommand, KeyFrames, ListTarget, MoveCommand, RemoveCommand,
    Reorderable, SeveredLinks,
};
pub use property::{ChangePropertyCommand, SetAnimationCommand};
pub use recorder::{CommandEvent, CommandKind, CommandRecorder};

use crate::document::Document;
use crate::error::{DocumentError, Result};

/// One reversible edit.
///
/// `undo` must restore exactly the state seen before the matching `do_`/`redo`.
pub trait Command {
    /// Label for history lists.
    fn name(&self) -> String;

    fn do_(&mut self, doc: &mut Document) -> Result<()>;

    fn redo(&mut self, doc: &mut Document) -> Result<()> {
        self.do_(doc)
    }

    fn undo(&mut self, doc: &mut Document) -> Result<()>;

    /// Called once when the command leaves the history for good (redo stack
    /// cleared, history limit hit, recorder cleared). Releases anything the
    /// command kept alive, such as a detached subtree.
    fn discard(&mut self, _doc: &mut Document) {}
}

/// Lifecycle position of a recorded command.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CommandState {
    Fresh,
    Done,
    Undone,
}

/// A command plus the state machine that rejects out-of-order calls.
pub(crate) struct TrackedCommand {
    command: Box<dyn Command>,
    state: CommandState,
}

impl TrackedCommand {
    pub(crate) fn new(command: Box<dyn Command>) -> Self {
        Self {
            command,
            state: CommandState::Fresh,
        }
    }

    pub(crate) fn name(&self) -> String {
        self.command.name()
    }

    pub(crate) fn state(&self) -> CommandState {
        self.state
    }

    pub(crate) fn do_(&mut self, doc: &mut Document) -> Result<()> {
        if self.state != CommandState::Fresh {
            return Err(DocumentError::invalid_state(self.name(), "already executed"));
        }
        self.command.do_(doc)?;
        self.state = CommandState::Done;
        Ok(())
    }

    pub(crate) fn undo(&mut self, doc: &mut Document) -> Result<()> {
        if self.state != CommandState::Done {
            return Err(DocumentError::invalid_state(
                self.name(),
                "undo requires a prior do or redo",
            ));
        }
        self.command.undo(doc)?;
        self.state = CommandState::Undone;
        Ok(())
    }

    pub(crate) fn redo(&mut self, doc: &mut Document) -> Result<()> {
        if self.state != CommandState::Undone {
            return Err(DocumentError::invalid_state(
                self.name(),
                "redo requires a prior undo",
            ));
        }
        self.command.redo(doc)?;
        self.state = CommandState::Done;
        Ok(())
    }

    pub(crate) fn discard(mut self, doc: &mut Document) {
        self.command.discard(doc);
    }
}

impl std::fmt::Debug for TrackedCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedCommand")
            .field("name", &self.name())
            .field("state", &self.state)
            .finish()
    }
}
