//! In-process push fan-out.
//!
//! The core never talks to a transport directly. It registers a handler on
//! a `PushChannel` and keeps the returned `Subscription` alive for as long
//! as it wants messages.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use sigfeed_core::PushMessage;
use sigfeed_telemetry::Metrics;
use tracing::trace;

/// Callback invoked for every push message.
pub type PushHandler = Arc<dyn Fn(&PushMessage) + Send + Sync>;

/// `subscribe(handler) -> unsubscribe` capability.
pub trait PushChannel: Send + Sync {
    fn subscribe(&self, handler: PushHandler) -> Subscription;
}

/// Handle returned by `PushChannel::subscribe`.
///
/// The handler is removed when the subscription is dropped or
/// `unsubscribe` is called.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[derive(Default)]
struct BusInner {
    handlers: RwLock<HashMap<u64, PushHandler>>,
    next_id: AtomicU64,
}

/// In-process push channel.
#[derive(Clone, Default)]
pub struct PushBus {
    inner: Arc<BusInner>,
}

impl PushBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a message to every current subscriber.
    ///
    /// Returns the number of handlers invoked.
    pub fn publish(&self, msg: &PushMessage) -> usize {
        Metrics::push_message(msg.kind.as_tag());

        // Snapshot so handlers may (un)subscribe without deadlocking.
        let handlers: Vec<PushHandler> = self.inner.handlers.read().values().cloned().collect();
        for handler in &handlers {
            handler(msg);
        }
        trace!(kind = %msg.kind, receivers = handlers.len(), "Push message published");
        handlers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.handlers.read().len()
    }
}

impl PushChannel for PushBus {
    fn subscribe(&self, handler: PushHandler) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.handlers.write().insert(id, handler);

        let weak: Weak<BusInner> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.handlers.write().remove(&id);
            }
        })
    }
}
