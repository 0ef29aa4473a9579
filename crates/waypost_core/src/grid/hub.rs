//! # Event Hub
//!
//! Fan-out of grid events to subscribers, keyed by event kind.
//!
//! Publishing snapshots the handler list and releases the registry lock
//! before invoking anything, so handlers may subscribe or unsubscribe from
//! inside a callback. A consequence is that a handler can still run once
//! after its [`Subscription`] was dropped; callers that care (the bridge)
//! guard their own state against it.

use super::events::{EventKind, GridEvent};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Event callback.
pub type Handler = Arc<dyn Fn(&GridEvent) + Send + Sync>;

/// Subscriber registry.
#[derive(Default)]
pub struct EventHub {
    next_id: AtomicU64,
    handlers: RwLock<HashMap<EventKind, Vec<(u64, Handler)>>>,
}

impl EventHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers `handler` for `kind`. The handler stays registered until
    /// the returned guard is dropped.
    pub fn subscribe<F>(self: &Arc<Self>, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&GridEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers
            .write()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        Subscription {
            hub: Arc::downgrade(self),
            kind,
            id,
        }
    }

    fn unsubscribe(&self, kind: EventKind, id: u64) {
        let mut handlers = self.handlers.write();
        if let Some(list) = handlers.get_mut(&kind) {
            list.retain(|(handler_id, _)| *handler_id != id);
            if list.is_empty() {
                handlers.remove(&kind);
            }
        }
    }

    /// Delivers `event` to every handler of its kind, in registration
    /// order. Returns how many handlers ran.
    pub fn publish(&self, event: &GridEvent) -> usize {
        let snapshot: Vec<Handler> = self
            .handlers
            .read()
            .get(&event.kind())
            .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();
        for handler in &snapshot {
            handler(event);
        }
        snapshot.len()
    }

    /// Number of live handlers for `kind`.
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.handlers.read().get(&kind).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read();
        f.debug_struct("EventHub")
            .field("kinds", &handlers.len())
            .field("handlers", &handlers.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

/// Registration guard. Dropping it detaches the handler, exactly once.
#[must_use = "dropping a Subscription detaches its handler immediately"]
#[derive(Debug)]
pub struct Subscription {
    hub: Weak<EventHub>,
    kind: EventKind,
    id: u64,
}

impl Subscription {
    /// Kind the handler listens to.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.kind, self.id);
        }
    }
}
