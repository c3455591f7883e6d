//! WebSocket broadcast functionality.
//!
//! The broadcaster collects a snapshot at a fixed interval and sends it to
//! every connected WebSocket client.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::state::DashboardState;
use crate::types::DashboardMessage;

pub async fn run_broadcaster(
    state: DashboardState,
    tx: broadcast::Sender<String>,
    interval_ms: u64,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }

        // Nobody listening: skip the render pass entirely.
        if tx.receiver_count() == 0 {
            continue;
        }

        let msg = DashboardMessage::Update(state.collect_snapshot());
        match serde_json::to_string(&msg) {
            Ok(json) => match tx.send(json) {
                Ok(n) => trace!(receivers = n, "Broadcast update sent"),
                Err(_) => trace!("No WebSocket receivers connected"),
            },
            Err(e) => {
                debug!(error = %e, "Failed to serialize dashboard update");
            }
        }
    }

    debug!("Dashboard broadcaster stopped");
}
