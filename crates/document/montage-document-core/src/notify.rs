//! Change notifications for data-bound consumers.

use montage_api_core::Value;

use crate::ids::{ObjectId, PropertyId, SubscriptionId};

/// Raised after a property's local/default value changes.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyChanged {
    pub object: ObjectId,
    pub property: PropertyId,
    pub name: String,
    pub old: Value,
    pub new: Value,
}

type Callback = Box<dyn FnMut(&PropertyChanged)>;

struct Subscriber {
    id: SubscriptionId,
    /// `None` listens to every object.
    object: Option<ObjectId>,
    callback: Callback,
}

#[derive(Default)]
pub(crate) struct Notifier {
    next: u64,
    subscribers: Vec<Subscriber>,
}

impl Notifier {
    pub(crate) fn subscribe(&mut self, object: Option<ObjectId>, callback: Callback) -> SubscriptionId {
        let id = SubscriptionId(self.next);
        self.next = self.next.wrapping_add(1);
        self.subscribers.push(Subscriber {
            id,
            object,
            callback,
        });
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    pub(crate) fn emit(&mut self, event: &PropertyChanged) {
        for sub in &mut self.subscribers {
            if sub.object.map_or(true, |o| o == event.object) {
                (sub.callback)(event);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
