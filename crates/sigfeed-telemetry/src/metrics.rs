//! Prometheus metrics for the signal feed.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which only happens at static initialization.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram, CounterVec, Encoder, Gauge,
    Histogram, TextEncoder,
};

use crate::error::TelemetryResult;

/// Signal list fetches by outcome (applied/stale/failed).
pub static LIST_FETCH_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sigfeed_list_fetch_total",
        "Signal list fetches by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Signal list fetch latency in milliseconds.
pub static LIST_FETCH_LATENCY_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "sigfeed_list_fetch_latency_ms",
        "Signal list fetch latency in milliseconds",
        vec![10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 15000.0]
    )
    .unwrap()
});

/// Refresh triggers by source (store/push/filter/retry).
pub static REFRESH_TRIGGER_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sigfeed_refresh_trigger_total",
        "Refresh triggers received by source",
        &["source"]
    )
    .unwrap()
});

/// Enrichment fetches by outcome (loaded/failed/discarded).
pub static ENRICHMENT_FETCH_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sigfeed_enrichment_fetch_total",
        "Enrichment fetches by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Translations by outcome (translated/fallback/reset/stale).
pub static TRANSLATION_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sigfeed_translation_total",
        "Note localizations by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Push messages received by type tag.
pub static PUSH_MESSAGE_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sigfeed_push_message_total",
        "Push messages received by type",
        &["type"]
    )
    .unwrap()
});

/// Push connection state (1 = connected).
pub static PUSH_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!("sigfeed_push_connected", "Push connection state (1=connected)").unwrap()
});

/// Push reconnection attempts.
pub static PUSH_RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sigfeed_push_reconnect_total",
        "Push channel reconnection attempts",
        &["reason"]
    )
    .unwrap()
});

/// Unread notifications currently held by the inbox.
pub static INBOX_UNREAD: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!("sigfeed_inbox_unread", "Unread notifications in the inbox").unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record a list fetch outcome.
    pub fn list_fetch(outcome: &str) {
        LIST_FETCH_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn list_fetch_latency(latency_ms: f64) {
        LIST_FETCH_LATENCY_MS.observe(latency_ms);
    }

    /// Record a refresh trigger.
    pub fn refresh_trigger(source: &str) {
        REFRESH_TRIGGER_TOTAL.with_label_values(&[source]).inc();
    }

    pub fn enrichment_fetch(outcome: &str) {
        ENRICHMENT_FETCH_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn translation(outcome: &str) {
        TRANSLATION_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn push_message(tag: &str) {
        PUSH_MESSAGE_TOTAL.with_label_values(&[tag]).inc();
    }

    pub fn push_connected() {
        PUSH_CONNECTED.set(1.0);
    }

    pub fn push_disconnected() {
        PUSH_CONNECTED.set(0.0);
    }

    pub fn push_reconnect(reason: &str) {
        PUSH_RECONNECT_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn inbox_unread(count: usize) {
        INBOX_UNREAD.set(count as f64);
    }

    /// Render all registered metrics in the text exposition format.
    pub fn gather_text() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let families = prometheus::gather();
        let mut buf = Vec::new();
        encoder.encode(&families, &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}
