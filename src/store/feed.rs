//! In-process change feed for coupon listings.
//!
//! Listeners receive a full snapshot of the collection. A [`Subscription`] removes
//! its listener when unsubscribed or dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::models::Coupon;

pub type Listener = Box<dyn Fn(&[Coupon]) + Send + Sync>;

#[derive(Default)]
pub struct ChangeFeed {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<u64, Arc<Listener>>>,
}

impl ChangeFeed {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn listeners(&self) -> MutexGuard<'_, HashMap<u64, Arc<Listener>>> {
        self.listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(self: &Arc<Self>, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners().insert(id, Arc::new(listener));
        Subscription {
            feed: Arc::downgrade(self),
            id: Some(id),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    pub fn has_listeners(&self) -> bool {
        self.listener_count() > 0
    }

    /// Deliver a snapshot to every listener.
    pub fn publish(&self, snapshot: &[Coupon]) {
        // Listeners may unsubscribe from inside the callback, so call them unlocked.
        let listeners: Vec<Arc<Listener>> = self.listeners().values().cloned().collect();
        for listener in listeners {
            (**listener)(snapshot);
        }
    }

    fn remove(&self, id: u64) {
        self.listeners().remove(&id);
    }
}

/// Handle to a live feed registration.
#[must_use = "dropping a subscription unsubscribes it"]
pub struct Subscription {
    feed: Weak<ChangeFeed>,
    id: Option<u64>,
}

impl Subscription {
    /// A subscription that is not attached to any feed.
    pub fn noop() -> Self {
        Self {
            feed: Weak::new(),
            id: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.id.is_some() && self.feed.strong_count() > 0
    }

    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if let (Some(id), Some(feed)) = (self.id.take(), self.feed.upgrade()) {
            feed.remove(id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}
