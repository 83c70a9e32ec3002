//! Generic list edits: add, remove, move and clear over any [`ListTarget`].
//!
//! Indices are resolved when a command runs, not when it is built, so a command
//! queued against an older list state still lands correctly.

use montage_animation_core::KeyFrame;
use montage_api_core::Value;

use crate::binding::LinkState;
use crate::commands::Command;
use crate::document::Document;
use crate::error::{DocumentError, Result};
use crate::ids::{ObjectId, PropertyId};

/// An ordered list inside the document that commands can edit.
pub trait ListTarget {
    type Item: Clone;
    /// State captured by `remove` and handed back to `restore`.
    type Receipt;

    fn label(&self) -> String;

    fn len(&self, doc: &Document) -> Result<usize>;

    fn position(&self, doc: &Document, item: &Self::Item) -> Result<Option<usize>>;

    /// Insert `item` at `index`; returns the index it landed at.
    fn insert(&self, doc: &mut Document, index: usize, item: Self::Item) -> Result<usize>;

    fn remove(&self, doc: &mut Document, index: usize) -> Result<(Self::Item, Self::Receipt)>;

    /// Undo a `remove`.
    fn restore(
        &self,
        doc: &mut Document,
        index: usize,
        item: Self::Item,
        receipt: Self::Receipt,
    ) -> Result<()>;

    /// `item` left the list for good.
    fn release(&self, _doc: &mut Document, _item: Self::Item) {}
}

/// Lists whose order is user-controlled.
pub trait Reorderable: ListTarget {
    fn move_item(&self, doc: &mut Document, from: usize, to: usize) -> Result<()>;
}

/// Child list of an object.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Children(pub ObjectId);

/// Bindings cut when a subtree left the tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SeveredLinks(Vec<LinkState>);

impl ListTarget for Children {
    type Item = ObjectId;
    type Receipt = SeveredLinks;

    fn label(&self) -> String {
        format!("children of {}", self.0)
    }

    fn len(&self, doc: &Document) -> Result<usize> {
        Ok(doc.children(self.0)?.len())
    }

    fn position(&self, doc: &Document, item: &ObjectId) -> Result<Option<usize>> {
        Ok(doc.children(self.0)?.iter().position(|c| c == item))
    }

    fn insert(&self, doc: &mut Document, index: usize, item: ObjectId) -> Result<usize> {
        doc.attach(self.0, Some(index), item)
    }

    fn remove(&self, doc: &mut Document, index: usize) -> Result<(ObjectId, SeveredLinks)> {
        let children = doc.children(self.0)?;
        let child = *children.get(index).ok_or(DocumentError::IndexOutOfRange {
            index,
            len: children.len(),
        })?;
        let links = doc.sever_external(child)?;
        if let Err(err) = doc.detach(child) {
            doc.restore_links(links)?;
            return Err(err);
        }
        Ok((child, SeveredLinks(links)))
    }

    fn restore(
        &self,
        doc: &mut Document,
        index: usize,
        item: ObjectId,
        receipt: SeveredLinks,
    ) -> Result<()> {
        doc.attach(self.0, Some(index), item)?;
        doc.restore_links(receipt.0)
    }

    fn release(&self, doc: &mut Document, item: ObjectId) {
        if let Err(err) = doc.destroy(item) {
            tracing::warn!(object = %item, error = %err, "could not release detached subtree");
        }
    }
}

impl Reorderable for Children {
    fn move_item(&self, doc: &mut Document, from: usize, to: usize) -> Result<()> {
        doc.move_child(self.0, from, to)
    }
}

/// Keyframes of an attached animation. Insertion keeps time order and ignores the
/// requested index.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KeyFrames {
    pub object: ObjectId,
    pub property: PropertyId,
}

impl KeyFrames {
    pub fn new(object: ObjectId, property: PropertyId) -> Self {
        Self { object, property }
    }

    fn frames<'a>(&self, doc: &'a Document) -> Result<&'a [KeyFrame<Value>]> {
        match doc.animation(self.object, self.property)? {
            Some(anim) => Ok(anim.keyframes()),
            None => Err(self.missing(doc)),
        }
    }

    fn missing(&self, doc: &Document) -> DocumentError {
        let property = doc
            .types()
            .property(self.property)
            .map(|p| p.name().to_string())
            .unwrap_or_default();
        DocumentError::NoAnimation {
            object: self.object,
            property,
        }
    }
}

impl ListTarget for KeyFrames {
    type Item = KeyFrame<Value>;
    type Receipt = ();

    fn label(&self) -> String {
        format!("keyframes of {}", self.object)
    }

    fn len(&self, doc: &Document) -> Result<usize> {
        Ok(self.frames(doc)?.len())
    }

    fn position(&self, doc: &Document, item: &KeyFrame<Value>) -> Result<Option<usize>> {
        Ok(self.frames(doc)?.iter().position(|k| k == item))
    }

    fn insert(&self, doc: &mut Document, _index: usize, item: KeyFrame<Value>) -> Result<usize> {
        doc.insert_keyframe(self.object, self.property, item)
    }

    fn remove(&self, doc: &mut Document, index: usize) -> Result<(KeyFrame<Value>, ())> {
        Ok((doc.remove_keyframe(self.object, self.property, index)?, ()))
    }

    fn restore(&self, doc: &mut Document, index: usize, item: KeyFrame<Value>, _receipt: ()) -> Result<()> {
        doc.animation_mut(self.object, self.property)?
            .insert_at(index, item);
        Ok(())
    }
}

/// Insert an item, appending when no index is given.
pub struct AddCommand<L: ListTarget> {
    target: L,
    item: L::Item,
    requested: Option<usize>,
    placed: Option<usize>,
    in_list: bool,
}

impl<L: ListTarget> AddCommand<L> {
    pub fn new(target: L, item: L::Item) -> Self {
        Self {
            target,
            item,
            requested: None,
            placed: None,
            in_list: false,
        }
    }

    pub fn at(target: L, index: usize, item: L::Item) -> Self {
        Self {
            requested: Some(index),
            ..Self::new(target, item)
        }
    }

    /// Where the item landed on the last run.
    pub fn placed_index(&self) -> Option<usize> {
        self.placed
    }

    fn insert_at(&mut self, doc: &mut Document, index: usize) -> Result<()> {
        self.placed = Some(self.target.insert(doc, index, self.item.clone())?);
        self.in_list = true;
        Ok(())
    }
}

impl<L: ListTarget> Command for AddCommand<L> {
    fn name(&self) -> String {
        format!("Add to {}", self.target.label())
    }

    fn do_(&mut self, doc: &mut Document) -> Result<()> {
        let len = self.target.len(doc)?;
        let index = self.requested.unwrap_or(len);
        if index > len {
            return Err(DocumentError::IndexOutOfRange { index, len });
        }
        self.insert_at(doc, index)
    }

    /// Reinserts at the index used by the first run, clamped to the current length.
    fn redo(&mut self, doc: &mut Document) -> Result<()> {
        let len = self.target.len(doc)?;
        let index = self.placed.unwrap_or(len).min(len);
        self.insert_at(doc, index)
    }

    fn undo(&mut self, doc: &mut Document) -> Result<()> {
        let index = self
            .target
            .position(doc, &self.item)?
            .ok_or_else(|| DocumentError::NotInList {
                list: self.target.label(),
            })?;
        self.target.remove(doc, index)?;
        self.in_list = false;
        Ok(())
    }

    fn discard(&mut self, doc: &mut Document) {
        if !self.in_list {
            self.target.release(doc, self.item.clone());
        }
    }
}

/// Remove an item, looked up by value when the command runs.
pub struct RemoveCommand<L: ListTarget> {
    target: L,
    item: L::Item,
    removed: Option<(usize, L::Receipt)>,
}

impl<L: ListTarget> RemoveCommand<L> {
    pub fn new(target: L, item: L::Item) -> Self {
        Self {
            target,
            item,
            removed: None,
        }
    }
}

impl<L: ListTarget> Command for RemoveCommand<L> {
    fn name(&self) -> String {
        format!("Remove from {}", self.target.label())
    }

    fn do_(&mut self, doc: &mut Document) -> Result<()> {
        let index = self
            .target
            .position(doc, &self.item)?
            .ok_or_else(|| DocumentError::NotInList {
                list: self.target.label(),
            })?;
        let (_, receipt) = self.target.remove(doc, index)?;
        self.removed = Some((index, receipt));
        Ok(())
    }

    fn undo(&mut self, doc: &mut Document) -> Result<()> {
        let (index, receipt) = self
            .removed
            .take()
            .ok_or_else(|| DocumentError::invalid_state(self.name(), "nothing removed"))?;
        self.target.restore(doc, index, self.item.clone(), receipt)
    }

    fn discard(&mut self, doc: &mut Document) {
        if self.removed.take().is_some() {
            self.target.release(doc, self.item.clone());
        }
    }
}

/// Move an item to a new position.
pub struct MoveCommand<L: Reorderable> {
    target: L,
    item: L::Item,
    to: usize,
    from: Option<usize>,
}

impl<L: Reorderable> MoveCommand<L> {
    pub fn new(target: L, item: L::Item, to: usize) -> Self {
        Self {
            target,
            item,
            to,
            from: None,
        }
    }
}

impl<L: Reorderable> Command for MoveCommand<L> {
    fn name(&self) -> String {
        format!("Move in {}", self.target.label())
    }

    fn do_(&mut self, doc: &mut Document) -> Result<()> {
        let from = self
            .target
            .position(doc, &self.item)?
            .ok_or_else(|| DocumentError::NotInList {
                list: self.target.label(),
            })?;
        self.target.move_item(doc, from, self.to)?;
        self.from = Some(from);
        Ok(())
    }

    fn undo(&mut self, doc: &mut Document) -> Result<()> {
        let from = self
            .from
            .take()
            .ok_or_else(|| DocumentError::invalid_state(self.name(), "nothing moved"))?;
        self.target.move_item(doc, self.to, from)
    }
}

/// Empty a list.
pub struct ClearCommand<L: ListTarget> {
    target: L,
    /// Removed items, last element first.
    removed: Vec<(L::Item, L::Receipt)>,
}

impl<L: ListTarget> ClearCommand<L> {
    pub fn new(target: L) -> Self {
        Self {
            target,
            removed: Vec::new(),
        }
    }

    /// Items still in the list stay in front; removed ones go back behind them.
    fn restore_all(&mut self, doc: &mut Document) -> Result<()> {
        let kept = self.target.len(doc)?;
        for (offset, (item, receipt)) in self.removed.drain(..).rev().enumerate() {
            self.target.restore(doc, kept + offset, item, receipt)?;
        }
        Ok(())
    }
}

impl<L: ListTarget> Command for ClearCommand<L> {
    fn name(&self) -> String {
        format!("Clear {}", self.target.label())
    }

    fn do_(&mut self, doc: &mut Document) -> Result<()> {
        let len = self.target.len(doc)?;
        for index in (0..len).rev() {
            match self.target.remove(doc, index) {
                Ok(entry) => self.removed.push(entry),
                Err(err) => {
                    if let Err(rollback) = self.restore_all(doc) {
                        tracing::warn!(error = %rollback, "clear rollback incomplete");
                    }
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    fn undo(&mut self, doc: &mut Document) -> Result<()> {
        self.restore_all(doc)
    }

    fn discard(&mut self, doc: &mut Document) {
        for (item, _) in std::mem::take(&mut self.removed) {
            self.target.release(doc, item);
        }
    }
}
