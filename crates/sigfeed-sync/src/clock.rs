//! Time sources.
//!
//! Expiry is derived from a periodically republished `now` so every row
//! moves in lockstep, rather than each row reading the wall clock.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Wall-clock abstraction.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Publishes the shared `now` once per tick.
pub struct ExpiryClock {
    clock: Arc<dyn Clock>,
    tick: Duration,
    tx: watch::Sender<DateTime<Utc>>,
}

impl ExpiryClock {
    pub fn new(clock: Arc<dyn Clock>, tick: Duration) -> Self {
        let (tx, _rx) = watch::channel(clock.now());
        Self { clock, tick, tx }
    }

    /// The most recently published instant.
    pub fn now(&self) -> DateTime<Utc> {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<DateTime<Utc>> {
        self.tx.subscribe()
    }

    /// Republish immediately, outside the tick schedule.
    pub fn refresh(&self) -> DateTime<Utc> {
        let now = self.clock.now();
        self.tx.send_replace(now);
        now
    }

    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // First tick completes immediately.
            interval.tick().await;
            debug!(tick_secs = self.tick.as_secs(), "Expiry clock started");

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        let now = self.refresh();
                        trace!(%now, "Expiry clock tick");
                    }
                }
            }
            debug!("Expiry clock stopped");
        })
    }
}
