//! Identifiers and simple allocators for document entities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable object identity. Assigned at creation, never reused within a document,
/// and persisted so that paths survive save/reload.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of a property in its [`crate::TypeSystem`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PropertyId(pub(crate) u32);

impl PropertyId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct SubscriptionId(pub u64);

/// Monotonic allocator for ObjectId.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc(&mut self) -> ObjectId {
        let id = ObjectId(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }

    /// Ensure ids handed out later are strictly greater than `id`.
    #[inline]
    pub fn advance_past(&mut self, id: ObjectId) {
        if id.0 >= self.next {
            self.next = id.0.wrapping_add(1);
        }
    }

    #[inline]
    pub fn peek(&self) -> ObjectId {
        ObjectId(self.next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_monotonic() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.alloc(), ObjectId(0));
        assert_eq!(alloc.alloc(), ObjectId(1));
    }

    #[test]
    fn advance_never_rewinds() {
        let mut alloc = IdAllocator::new();
        alloc.advance_past(ObjectId(41));
        assert_eq!(alloc.alloc(), ObjectId(42));
        alloc.advance_past(ObjectId(3));
        assert_eq!(alloc.alloc(), ObjectId(43));
    }
}
