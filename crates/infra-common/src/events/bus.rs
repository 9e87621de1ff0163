use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, error};

use super::types::{BusEvent, EventKind, OrchestratorEvent};

/// Callback invoked for each published event of a subscribed kind.
pub type EventHandler = Arc<dyn Fn(&BusEvent) + Send + Sync>;

/// Token returned by [`EventBus::subscribe`]; pass back to unsubscribe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    kind: EventKind,
    id: u64,
}

impl Subscription {
    /// The event kind this subscription listens to.
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

/// In-process publish/subscribe dispatcher keyed by event kind.
///
/// Dispatch is synchronous and in registration order within a kind. A
/// handler that panics is caught and logged; it never prevents later
/// handlers from running and never propagates to the publisher. The
/// subscriber map tolerates concurrent subscribe/unsubscribe interleaved
/// with publish.
pub struct EventBus {
    subscribers: DashMap<EventKind, Vec<(u64, EventHandler)>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `handler` for events of `kind`.
    ///
    /// Handlers registered earlier for the same kind run earlier. No
    /// ordering is guaranteed across kinds.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&BusEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        debug!(kind = %kind, subscription = id, "subscribed event handler");
        Subscription { kind, id }
    }

    /// Remove a previously registered handler. Unknown tokens are a no-op.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        if let Some(mut entry) = self.subscribers.get_mut(&subscription.kind) {
            entry.retain(|(id, _)| *id != subscription.id);
        }
    }

    /// Publish an event to every handler currently registered for its kind.
    ///
    /// The handler list is snapshotted before dispatch, so a handler may
    /// subscribe or unsubscribe reentrantly without deadlocking; such
    /// changes take effect from the next publish.
    pub fn publish(&self, event: OrchestratorEvent) {
        let kind = event.kind();
        let handlers: Vec<(u64, EventHandler)> = match self.subscribers.get(&kind) {
            Some(entry) => entry.value().clone(),
            None => return,
        };

        let bus_event = BusEvent {
            timestamp: Utc::now(),
            event,
        };

        for (id, handler) in handlers {
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(&bus_event)));
            if outcome.is_err() {
                error!(
                    kind = %kind,
                    subscription = id,
                    subject = bus_event.subject_id(),
                    "event handler panicked; continuing dispatch"
                );
            }
        }
    }

    /// Number of handlers registered for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers
            .get(&kind)
            .map(|entry| entry.len())
            .unwrap_or(0)
    }

    /// Drop every registered handler.
    pub fn clear(&self) {
        self.subscribers.clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("kinds", &self.subscribers.len())
            .finish()
    }
}
