//! Enrichment cache.
//!
//! Each signal id is in one of three states: absent, loading or present.
//! `ensure_loaded` is the only way to move an id out of absent, and it is
//! safe to call on every render pass: the check-and-mark is atomic, so at
//! most one fetch per id is ever in flight. A failed fetch returns the id to
//! absent so a later pass can retry.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use sigfeed_core::{with_timeout, DynEnrichmentSource, EnrichmentRecord, Signal, SignalId};
use sigfeed_telemetry::Metrics;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Capacity of the update broadcast. Slow receivers see `Lagged`.
const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Observable state of one id.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentState {
    Absent,
    Loading,
    Present(Arc<EnrichmentRecord>),
}

/// Emitted whenever a fetch settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnrichmentUpdate {
    pub signal_id: SignalId,
    /// `false` when the fetch failed and the id went back to absent.
    pub loaded: bool,
}

#[derive(Debug, Clone)]
enum Slot {
    Loading,
    Present(Arc<EnrichmentRecord>),
}

struct Inner {
    source: DynEnrichmentSource,
    slots: DashMap<SignalId, Slot>,
    fetch_timeout: Option<Duration>,
    updates: broadcast::Sender<EnrichmentUpdate>,
    closed: AtomicBool,
}

/// Lazy per-signal enrichment loader. Cheap to clone.
#[derive(Clone)]
pub struct EnrichmentCache {
    inner: Arc<Inner>,
}

impl EnrichmentCache {
    /// `fetch_timeout` of `None` lets a hung fetch stay loading indefinitely.
    pub fn new(source: DynEnrichmentSource, fetch_timeout: Option<Duration>) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                source,
                slots: DashMap::new(),
                fetch_timeout,
                updates,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Start a fetch for `signal_id` unless it is cached or already loading.
    ///
    /// Returns `true` if this call started a fetch. Must be called from
    /// within a tokio runtime.
    pub fn ensure_loaded(&self, signal_id: SignalId) -> bool {
        if self.is_closed() {
            return false;
        }

        match self.inner.slots.entry(signal_id) {
            Entry::Occupied(_) => return false,
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::Loading);
            }
        }

        debug!(signal_id = %signal_id, "Enrichment fetch started");
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let result = with_timeout(
                inner.source.fetch_enrichment(signal_id),
                inner.fetch_timeout,
            )
            .await;
            inner.settle(signal_id, result);
        });
        true
    }

    /// Render-pass helper: `ensure_loaded` for every enriched signal.
    ///
    /// Returns the number of fetches started.
    pub fn ensure_visible(&self, signals: &[Signal]) -> usize {
        signals
            .iter()
            .filter(|s| s.status.is_enriched())
            .filter(|s| self.ensure_loaded(s.id))
            .count()
    }

    pub fn state(&self, signal_id: SignalId) -> EnrichmentState {
        match self.inner.slots.get(&signal_id).map(|slot| slot.clone()) {
            None => EnrichmentState::Absent,
            Some(Slot::Loading) => EnrichmentState::Loading,
            Some(Slot::Present(record)) => EnrichmentState::Present(record),
        }
    }

    pub fn get(&self, signal_id: SignalId) -> Option<Arc<EnrichmentRecord>> {
        match self.inner.slots.get(&signal_id)?.value() {
            Slot::Present(record) => Some(record.clone()),
            Slot::Loading => None,
        }
    }

    pub fn is_loading(&self, signal_id: SignalId) -> bool {
        matches!(
            self.inner.slots.get(&signal_id).as_deref(),
            Some(Slot::Loading)
        )
    }

    /// Every record currently present, in no particular order.
    pub fn cached_records(&self) -> Vec<Arc<EnrichmentRecord>> {
        self.inner
            .slots
            .iter()
            .filter_map(|slot| match slot.value() {
                Slot::Present(record) => Some(record.clone()),
                Slot::Loading => None,
            })
            .collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EnrichmentUpdate> {
        self.inner.updates.subscribe()
    }

    /// Stop starting fetches and drop responses that arrive afterwards.
    ///
    /// In-flight requests are not aborted.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl Inner {
    fn settle(&self, signal_id: SignalId, result: sigfeed_core::ApiResult<EnrichmentRecord>) {
        if self.closed.load(Ordering::SeqCst) {
            debug!(signal_id = %signal_id, "Dropping enrichment response after close");
            return;
        }

        let loaded = match result {
            Ok(record) => {
                self.slots
                    .insert(signal_id, Slot::Present(Arc::new(record)));
                Metrics::enrichment_fetch("ok");
                debug!(signal_id = %signal_id, "Enrichment loaded");
                true
            }
            Err(e) => {
                self.slots.remove(&signal_id);
                Metrics::enrichment_fetch(e.kind());
                warn!(signal_id = %signal_id, error = %e, "Enrichment fetch failed");
                false
            }
        };

        // No receivers is fine.
        let _ = self.updates.send(EnrichmentUpdate { signal_id, loaded });
    }
}
