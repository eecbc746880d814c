//! In-process publish/subscribe event bus for agent coordination.
//!
//! Delivery is synchronous and depth-first: publishing inside a handler
//! completes fully before control returns to the outer publisher, so the
//! effective execution order is a depth-first traversal of the
//! event-causation graph. Handler failures are isolated — an `Err` from one
//! subscriber is logged and never stops delivery to the rest, and never
//! surfaces to the publisher.
//!
//! # Main types
//!
//! - [`EventBus`] — The broker: subscriptions, fan-out, and the event log.
//! - [`EventHandler`] — The seam every subscriber (agent) implements.

use async_trait::async_trait;
use opsmesh_core::{Event, EventType, OpsmeshResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, warn};

/// A subscriber on the bus. Implementations must tolerate event types they
/// do not recognize (no-op).
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Label used in delivery-failure logs.
    fn handler_name(&self) -> &str;

    /// Reacts to one event. An `Err` is logged by the bus and isolated from
    /// other subscribers and from the publisher.
    async fn on_event(&self, event: &Event) -> OpsmeshResult<()>;
}

/// In-process publish/subscribe broker with an append-only event log.
///
/// Fan-out order equals subscription order (first registered, first
/// invoked). Duplicate registration of the same handler is allowed and
/// causes double invocation; avoiding that is the caller's responsibility.
pub struct EventBus {
    subscribers: RwLock<HashMap<EventType, Vec<Arc<dyn EventHandler>>>>,
    log: RwLock<Vec<Event>>,
    /// Current cascade depth; publishes past `max_cascade_depth` are logged
    /// but not delivered.
    depth: AtomicU32,
    max_cascade_depth: u32,
}

impl EventBus {
    /// Creates a bus with the given cascade-depth limit.
    pub fn new(max_cascade_depth: u32) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            log: RwLock::new(Vec::new()),
            depth: AtomicU32::new(0),
            max_cascade_depth,
        }
    }

    /// Registers a handler for one event type.
    pub async fn subscribe(&self, event_type: EventType, handler: Arc<dyn EventHandler>) {
        let mut subs = self.subscribers.write().await;
        subs.entry(event_type).or_default().push(handler);
    }

    /// Appends the event to the log, then synchronously invokes every
    /// handler subscribed to its type, in subscription order.
    ///
    /// Always returns the published event; subscriber behavior can never
    /// fail a publish.
    pub async fn publish(
        &self,
        event_type: EventType,
        payload: serde_json::Value,
        source: impl Into<String>,
    ) -> Event {
        let event = Event::new(event_type, payload, source);
        self.log.write().await.push(event.clone());

        let depth = self.depth.fetch_add(1, Ordering::SeqCst);
        if depth >= self.max_cascade_depth {
            warn!(
                event_type = %event_type,
                depth,
                limit = self.max_cascade_depth,
                "cascade depth limit reached; event logged but not delivered"
            );
            self.depth.fetch_sub(1, Ordering::SeqCst);
            return event;
        }

        // Snapshot the handler list so handlers may subscribe/publish
        // without holding the map lock.
        let handlers: Vec<Arc<dyn EventHandler>> = {
            let subs = self.subscribers.read().await;
            subs.get(&event_type).cloned().unwrap_or_default()
        };

        for handler in handlers {
            if let Err(e) = handler.on_event(&event).await {
                error!(
                    event_type = %event_type,
                    handler = handler.handler_name(),
                    error = %e,
                    "event handler failed; continuing delivery"
                );
            }
        }

        self.depth.fetch_sub(1, Ordering::SeqCst);
        event
    }

    /// Returns the most recent `limit` events, oldest first.
    pub async fn event_log(&self, limit: usize) -> Vec<Event> {
        let log = self.log.read().await;
        let start = log.len().saturating_sub(limit);
        log[start..].to_vec()
    }

    /// Handler count per event type, for dashboards.
    pub async fn subscriber_counts(&self) -> HashMap<EventType, usize> {
        let subs = self.subscribers.read().await;
        subs.iter().map(|(k, v)| (*k, v.len())).collect()
    }

    /// Clears the event log. Subscriptions are untouched.
    pub async fn clear_log(&self) {
        self.log.write().await.clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(8)
    }
}
