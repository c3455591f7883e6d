//! Local "last changed" store.
//!
//! A single slot holding a strictly increasing millisecond timestamp. Any
//! part of the application that believes the signal list changed calls
//! `bump`; the refresh coordinator watches the slot.

use crate::clock::{Clock, SystemClock};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::trace;

#[derive(Clone)]
pub struct ChangeStore {
    tx: Arc<watch::Sender<i64>>,
    clock: Arc<dyn Clock>,
}

impl Default for ChangeStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl ChangeStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            tx: Arc::new(tx),
            clock,
        }
    }

    /// Publish a new change timestamp: `max(now_ms, last + 1)`.
    pub fn bump(&self) -> i64 {
        let now_ms = self.clock.now_ms();
        let mut published = 0;
        self.tx.send_modify(|last| {
            *last = now_ms.max(*last + 1);
            published = *last;
        });
        trace!(last_changed = published, "Local change recorded");
        published
    }

    pub fn last_changed(&self) -> i64 {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<i64> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_bump_is_strictly_increasing_with_frozen_clock() {
        let clock = Arc::new(ManualClock::new(Utc.timestamp_millis_opt(1_000).unwrap()));
        let store = ChangeStore::new(clock.clone());

        assert_eq!(store.bump(), 1_000);
        assert_eq!(store.bump(), 1_001);
        assert_eq!(store.bump(), 1_002);

        clock.set(Utc.timestamp_millis_opt(5_000).unwrap());
        assert_eq!(store.bump(), 5_000);
        assert_eq!(store.last_changed(), 5_000);
    }

    #[tokio::test]
    async fn test_subscribers_see_bumps() {
        let store = ChangeStore::default();
        let mut rx = store.subscribe();
        let value = store.bump();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), value);
    }
}
