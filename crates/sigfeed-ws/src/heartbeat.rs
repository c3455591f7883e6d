//! Heartbeat tracking for the push connection.
//!
//! Any inbound frame counts as liveness. A ping is sent only after a quiet
//! interval, and an unanswered ping past the timeout marks the link dead.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
struct HeartbeatState {
    last_ping: Option<DateTime<Utc>>,
    last_message: DateTime<Utc>,
    waiting_for_pong: bool,
}

/// Heartbeat manager for one connection.
#[derive(Debug)]
pub struct HeartbeatManager {
    interval_ms: u64,
    timeout_ms: u64,
    state: RwLock<HeartbeatState>,
}

impl HeartbeatManager {
    pub fn new(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval_ms,
            timeout_ms,
            state: RwLock::new(HeartbeatState {
                last_ping: None,
                last_message: Utc::now(),
                waiting_for_pong: false,
            }),
        }
    }

    /// Reset on (re)connect.
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.last_ping = None;
        state.last_message = Utc::now();
        state.waiting_for_pong = false;
    }

    pub fn record_ping(&self) {
        let mut state = self.state.write();
        state.last_ping = Some(Utc::now());
        state.waiting_for_pong = true;
    }

    pub fn record_pong(&self) {
        let now = Utc::now();
        let mut state = self.state.write();
        state.waiting_for_pong = false;
        state.last_message = now;
        if let Some(ping_time) = state.last_ping {
            debug!(rtt_ms = (now - ping_time).num_milliseconds(), "Received pong");
        }
    }

    pub fn record_message(&self) {
        self.state.write().last_message = Utc::now();
    }

    /// Whether an outstanding ping went unanswered past the timeout.
    pub fn is_timed_out(&self) -> bool {
        let state = self.state.read();
        match (state.waiting_for_pong, state.last_ping) {
            (true, Some(ping)) => (Utc::now() - ping).num_milliseconds() > self.timeout_ms as i64,
            _ => false,
        }
    }

    /// Send a ping only when nothing arrived for a full interval.
    pub fn should_send_ping(&self) -> bool {
        let state = self.state.read();
        if state.waiting_for_pong {
            return false;
        }
        (Utc::now() - state.last_message).num_milliseconds() >= self.interval_ms as i64
    }

    /// Wait for the next heartbeat check.
    pub async fn wait_for_check(&self) {
        tokio::time::sleep(Duration::from_millis((self.interval_ms / 2).max(1))).await;
    }
}
