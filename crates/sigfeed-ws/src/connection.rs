//! WebSocket push transport.
//!
//! Handles connection lifecycle, automatic reconnection with exponential
//! backoff, and heartbeat. Every decoded text frame is published to a
//! `PushBus`; the transport itself never interprets message tags.

use crate::bus::PushBus;
use crate::error::{WsError, WsResult};
use crate::heartbeat::HeartbeatManager;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sigfeed_core::PushMessage;
use sigfeed_telemetry::Metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// WebSocket URL.
    pub url: String,
    /// Bearer token sent in the upgrade request, if any.
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,
    /// Maximum reconnection attempts (0 = infinite).
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential backoff.
    pub reconnect_base_delay_ms: u64,
    /// Maximum delay for exponential backoff.
    pub reconnect_max_delay_ms: u64,
    /// Quiet period after which a ping is sent.
    pub heartbeat_interval_ms: u64,
    /// Pong must arrive within this.
    pub heartbeat_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            auth_token: None,
            max_reconnect_attempts: 0,
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 60000,
            heartbeat_interval_ms: 30000,
            heartbeat_timeout_ms: 10000,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// WebSocket push connection.
pub struct PushConnection {
    config: ConnectionConfig,
    bus: PushBus,
    state: Arc<RwLock<ConnectionState>>,
    heartbeat: HeartbeatManager,
    shutdown_token: CancellationToken,
}

impl PushConnection {
    pub fn new(config: ConnectionConfig, bus: PushBus) -> Self {
        let heartbeat =
            HeartbeatManager::new(config.heartbeat_interval_ms, config.heartbeat_timeout_ms);
        Self {
            config,
            bus,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            heartbeat,
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Signal graceful shutdown of both the message loop and the reconnect loop.
    pub fn shutdown(&self) {
        info!("Push connection shutdown requested");
        self.shutdown_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Connect and run until shutdown or the reconnect budget is spent.
    pub async fn run(&self) -> WsResult<()> {
        let mut attempt = 0u32;

        loop {
            if self.is_shutdown() {
                self.set_state(ConnectionState::Disconnected);
                return Ok(());
            }

            self.set_state(ConnectionState::Connecting);

            let reason = match self.try_connect(&mut attempt).await {
                Ok(()) => {
                    info!("Push connection closed");
                    "closed"
                }
                Err(e) => {
                    error!(error = %e, "Push connection error");
                    e.reconnect_reason()
                }
            };
            Metrics::push_disconnected();

            if self.is_shutdown() {
                self.set_state(ConnectionState::Disconnected);
                return Ok(());
            }

            attempt += 1;
            if self.config.max_reconnect_attempts > 0
                && attempt >= self.config.max_reconnect_attempts
            {
                error!(attempt, "Max reconnection attempts reached");
                self.set_state(ConnectionState::Disconnected);
                return Err(WsError::GaveUp { attempts: attempt });
            }

            self.set_state(ConnectionState::Reconnecting);
            Metrics::push_reconnect(reason);

            let delay = self.calculate_backoff_delay(attempt);
            warn!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting push channel");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    self.set_state(ConnectionState::Disconnected);
                    return Ok(());
                }
            }
        }
    }

    async fn try_connect(&self, attempt: &mut u32) -> WsResult<()> {
        info!(url = %self.config.url, "Connecting push channel");

        let mut request = self.config.url.as_str().into_client_request()?;
        if let Some(token) = &self.config.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| WsError::BadEndpoint(e.to_string()))?;
            request.headers_mut().insert("Authorization", value);
        }

        let (ws_stream, _response) = connect_async(request).await?;
        let (mut write, mut read) = ws_stream.split();

        self.set_state(ConnectionState::Connected);
        Metrics::push_connected();
        *attempt = 0;
        self.heartbeat.reset();
        info!("Push channel connected");

        loop {
            tokio::select! {
                () = self.shutdown_token.cancelled() => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!(error = %e, "Failed to send Close frame during shutdown");
                    }
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.dispatch_text(&text);
                        }
                        Some(Ok(Message::Ping(data))) => {
                            self.heartbeat.record_message();
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            self.heartbeat.record_pong();
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(code, %reason, "Push channel closed by server");
                            return Err(WsError::ServerClosed { code, reason });
                        }
                        Some(Err(e)) => return Err(e.into()),
                        None => {
                            warn!("Push stream ended");
                            return Ok(());
                        }
                        _ => {}
                    }
                }

                () = self.heartbeat.wait_for_check() => {
                    if self.heartbeat.is_timed_out() {
                        return Err(WsError::PongTimeout);
                    }
                    if self.heartbeat.should_send_ping() {
                        write.send(Message::Ping(Vec::new())).await?;
                        self.heartbeat.record_ping();
                        debug!("Sent heartbeat ping");
                    }
                }
            }
        }
    }

    /// Decode one text frame and publish it.
    ///
    /// Frames that are not tagged JSON objects are dropped.
    fn dispatch_text(&self, text: &str) -> bool {
        self.heartbeat.record_message();
        match PushMessage::parse(text) {
            Ok(msg) => {
                debug!(kind = %msg.kind, "Push message received");
                self.bus.publish(&msg);
                true
            }
            Err(e) => {
                debug!(error = %e, "Ignoring undecodable push frame");
                false
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
    }

    fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.reconnect_base_delay_ms;
        let max = self.config.reconnect_max_delay_ms;

        // base * 2^(attempt-1), capped
        let exponent = attempt.saturating_sub(1).min(10);
        let delay = base.saturating_mul(1u64 << exponent).min(max);

        Duration::from_millis(delay + rand_jitter())
    }
}

/// Random jitter (0-250ms) derived from the clock's sub-second nanos.
fn rand_jitter() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 250) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::PushChannel;
    use sigfeed_core::PushKind;
    use std::sync::Mutex;

    #[test]
    fn test_default_config() {
        let config = ConnectionConfig::default();
        assert_eq!(config.max_reconnect_attempts, 0);
        assert_eq!(config.heartbeat_interval_ms, 30000);
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let config = ConnectionConfig {
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 5000,
            ..Default::default()
        };
        let conn = PushConnection::new(config, PushBus::new());

        let first = conn.calculate_backoff_delay(1).as_millis() as u64;
        let third = conn.calculate_backoff_delay(3).as_millis() as u64;
        let tenth = conn.calculate_backoff_delay(10).as_millis() as u64;
        assert!((1000..1250).contains(&first));
        assert!((4000..4250).contains(&third));
        assert!((5000..5250).contains(&tenth));
    }

    #[test]
    fn test_dispatch_publishes_decoded_frames() {
        let bus = PushBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let _sub = bus.subscribe(Arc::new(move |msg: &PushMessage| {
            seen_clone.lock().unwrap().push(msg.kind.clone());
        }));
        let conn = PushConnection::new(ConnectionConfig::default(), bus);

        assert!(conn.dispatch_text(r#"{"type":"signals:new","signal_id":1}"#));
        assert!(conn.dispatch_text(r#"{"type":"unknown:thing"}"#));
        assert!(!conn.dispatch_text("garbage"));

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![PushKind::SignalsNew, PushKind::Other("unknown:thing".into())]
        );
    }

    #[test]
    fn test_shutdown_flag() {
        let conn = PushConnection::new(ConnectionConfig::default(), PushBus::new());
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(!conn.is_shutdown());
        conn.shutdown();
        assert!(conn.is_shutdown());
    }
}
