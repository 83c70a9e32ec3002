//! Tree structure over the object arena: parent links, ordered children, attach and
//! detach with cycle checks.

use hashbrown::HashSet;

use crate::document::Document;
use crate::error::{DocumentError, Result};
use crate::ids::ObjectId;
use crate::object::NodeKind;

impl Document {
    pub fn parent(&self, id: ObjectId) -> Result<Option<ObjectId>> {
        Ok(self.object(id)?.parent())
    }

    pub fn children(&self, id: ObjectId) -> Result<&[ObjectId]> {
        Ok(self.object(id)?.children())
    }

    /// Walk `n` parent hops up from `id`. `ancestor(id, 0)` is `id` itself.
    pub fn ancestor(&self, id: ObjectId, n: usize) -> Option<ObjectId> {
        let mut current = self.objects.get(&id)?.id();
        for _ in 0..n {
            current = self.objects.get(&current)?.parent()?;
        }
        Some(current)
    }

    /// Direct child of `parent` with the given id.
    pub fn find_child(&self, parent: ObjectId, id: ObjectId) -> Option<ObjectId> {
        self.objects
            .get(&parent)?
            .children()
            .iter()
            .copied()
            .find(|c| *c == id)
    }

    /// First direct child of `parent` whose Name equals `name`.
    pub fn find_child_by_name(&self, parent: ObjectId, name: &str) -> Option<ObjectId> {
        self.objects
            .get(&parent)?
            .children()
            .iter()
            .copied()
            .find(|c| self.name_of(*c).map_or(false, |n| n == name))
    }

    /// Reachable from the document root.
    pub fn is_attached(&self, id: ObjectId) -> bool {
        let mut current = id;
        // Parent links are acyclic, the bound only guards corrupt input.
        for _ in 0..=self.objects.len() {
            if current == self.root {
                return true;
            }
            match self.objects.get(&current).and_then(|o| o.parent()) {
                Some(p) => current = p,
                None => return false,
            }
        }
        false
    }

    /// `id` followed by its subtree in pre-order.
    pub fn descendants(&self, id: ObjectId) -> Result<Vec<ObjectId>> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let obj = self.object(next)?;
            out.push(next);
            stack.extend(obj.children().iter().rev().copied());
        }
        Ok(out)
    }

    /// Insert `child` into `parent`'s child list at `index` (`None` appends).
    /// Returns the index used.
    pub fn attach(&mut self, parent: ObjectId, index: Option<usize>, child: ObjectId) -> Result<usize> {
        let len = self.object(parent)?.children().len();
        let obj = self.object(child)?;
        if child == self.root || obj.kind() == NodeKind::Root {
            return Err(DocumentError::InvalidHierarchy {
                reason: "the root cannot be a child".into(),
            });
        }
        if let Some(existing) = obj.parent() {
            return Err(DocumentError::InvalidHierarchy {
                reason: format!("{child} already has parent {existing}"),
            });
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(DocumentError::InvalidHierarchy {
                reason: format!("attaching {child} under {parent} would form a cycle"),
            });
        }
        let index = index.unwrap_or(len);
        if index > len {
            return Err(DocumentError::IndexOutOfRange { index, len });
        }
        self.object_mut(parent)?.children.insert(index, child);
        self.object_mut(child)?.parent = Some(parent);
        tracing::trace!(%parent, %child, index, "attached");
        Ok(index)
    }

    /// Remove `child` from its parent. Returns the former parent and position.
    pub fn detach(&mut self, child: ObjectId) -> Result<(ObjectId, usize)> {
        let parent = self
            .object(child)?
            .parent()
            .ok_or_else(|| DocumentError::InvalidHierarchy {
                reason: format!("{child} has no parent"),
            })?;
        let siblings = &mut self.object_mut(parent)?.children;
        let index = siblings
            .iter()
            .position(|c| *c == child)
            .ok_or_else(|| DocumentError::InvalidHierarchy {
                reason: format!("{child} missing from children of {parent}"),
            })?;
        siblings.remove(index);
        self.object_mut(child)?.parent = None;
        tracing::trace!(%parent, %child, index, "detached");
        Ok((parent, index))
    }

    /// Reorder within one child list.
    pub fn move_child(&mut self, parent: ObjectId, from: usize, to: usize) -> Result<()> {
        let children = &mut self.object_mut(parent)?.children;
        let len = children.len();
        if from >= len {
            return Err(DocumentError::IndexOutOfRange { index: from, len });
        }
        if to >= len {
            return Err(DocumentError::IndexOutOfRange { index: to, len });
        }
        let item = children.remove(from);
        children.insert(to, item);
        Ok(())
    }

    /// Drop a detached subtree from the arena. Links from surviving objects into
    /// the subtree are cleared. Attached objects are left alone. Returns the number
    /// of objects removed.
    pub fn destroy(&mut self, id: ObjectId) -> Result<usize> {
        if id == self.root || self.object(id)?.parent().is_some() {
            return Ok(0);
        }
        let doomed: HashSet<ObjectId> = self.descendants(id)?.into_iter().collect();
        for obj in self.objects.values_mut() {
            if doomed.contains(&obj.id()) {
                continue;
            }
            if obj.bound_to.map_or(false, |p| doomed.contains(&p)) {
                obj.bound_to = None;
            }
        }
        for gone in &doomed {
            self.objects.remove(gone);
        }
        tracing::trace!(root = %id, count = doomed.len(), "destroyed detached subtree");
        Ok(doomed.len())
    }

    fn is_ancestor_or_self(&self, candidate: ObjectId, of: ObjectId) -> bool {
        let mut current = Some(of);
        let mut steps = 0;
        while let Some(c) = current {
            if c == candidate {
                return true;
            }
            steps += 1;
            if steps > self.objects.len() {
                break;
            }
            current = self.objects.get(&c).and_then(|o| o.parent());
        }
        false
    }
}
