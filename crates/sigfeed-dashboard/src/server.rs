//! HTTP server implementation using axum.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures_util::stream::StreamExt;
use futures_util::SinkExt;
use sigfeed_core::SignalFilters;
use sigfeed_inbox::InboxSnapshot;
use sigfeed_telemetry::Metrics;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use crate::config::DashboardConfig;
use crate::error::{DashboardError, DashboardResult};
use crate::state::DashboardState;
use crate::types::{CommandAck, DashboardMessage, FeedSnapshot, LanguageRequest};

/// Connection limiter to prevent too many concurrent WebSocket connections.
pub struct ConnectionLimiter {
    current: AtomicUsize,
    max: usize,
}

impl ConnectionLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            current: AtomicUsize::new(0),
            max,
        }
    }

    /// Reserve a slot. The slot is released when the guard drops.
    pub fn try_acquire(self: &Arc<Self>) -> Option<ConnectionGuard> {
        loop {
            let current = self.current.load(Ordering::Acquire);
            if current >= self.max {
                return None;
            }
            if self
                .current
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(ConnectionGuard {
                    limiter: self.clone(),
                });
            }
        }
    }

    pub fn current_count(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }
}

pub struct ConnectionGuard {
    limiter: Arc<ConnectionLimiter>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.limiter.current.fetch_sub(1, Ordering::Release);
    }
}

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    dashboard_state: DashboardState,
    broadcast_tx: broadcast::Sender<String>,
    connection_limiter: Arc<ConnectionLimiter>,
    config: DashboardConfig,
}

impl AppState {
    pub fn new(
        dashboard_state: DashboardState,
        broadcast_tx: broadcast::Sender<String>,
        config: DashboardConfig,
    ) -> Self {
        Self {
            dashboard_state,
            broadcast_tx,
            connection_limiter: Arc::new(ConnectionLimiter::new(config.max_connections)),
            config,
        }
    }
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/filters", post(set_filters))
        .route("/api/refresh", post(refresh))
        .route("/api/inbox/open", post(open_inbox))
        .route("/api/inbox/close", post(close_inbox))
        .route("/api/language", post(set_language))
        .route("/ws", get(ws_handler))
        .route("/metrics", get(metrics))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(cors)
        .with_state(state)
}

/// Reject requests without valid basic auth when auth is configured.
async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if state.config.auth_enabled() && !check_basic_auth(request.headers(), &state.config) {
        return unauthorized_response();
    }
    next.run(request).await
}

async fn get_snapshot(State(state): State<AppState>) -> Json<FeedSnapshot> {
    Json(state.dashboard_state.collect_snapshot())
}

async fn set_filters(
    State(state): State<AppState>,
    Json(filters): Json<SignalFilters>,
) -> DashboardResult<Json<CommandAck>> {
    state.dashboard_state.set_filters(filters).await?;
    Ok(Json(CommandAck { changed: true }))
}

async fn refresh(State(state): State<AppState>) -> DashboardResult<Json<CommandAck>> {
    state.dashboard_state.retry().await?;
    Ok(Json(CommandAck { changed: true }))
}

async fn open_inbox(State(state): State<AppState>) -> Json<InboxSnapshot> {
    let (changed, snapshot) = state.dashboard_state.open_inbox();
    debug!(changed, "Inbox open requested");
    Json(snapshot)
}

async fn close_inbox(State(state): State<AppState>) -> Json<InboxSnapshot> {
    let (changed, snapshot) = state.dashboard_state.close_inbox();
    debug!(changed, "Inbox close requested");
    Json(snapshot)
}

async fn set_language(
    State(state): State<AppState>,
    Json(request): Json<LanguageRequest>,
) -> DashboardResult<Json<CommandAck>> {
    if request.language.code().is_empty() {
        return Err(DashboardError::BadRequest("language must not be empty".into()));
    }
    let changed = state.dashboard_state.set_language(request.language);
    Ok(Json(CommandAck { changed }))
}

async fn metrics() -> DashboardResult<String> {
    Ok(Metrics::gather_text()?)
}

/// WebSocket upgrade handler.
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let guard = match state.connection_limiter.try_acquire() {
        Some(guard) => guard,
        None => {
            warn!(
                current = state.connection_limiter.current_count(),
                max = state.config.max_connections,
                "WebSocket connection limit reached"
            );
            return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
        }
    };

    info!(
        connections = state.connection_limiter.current_count(),
        "New WebSocket connection"
    );

    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, guard))
}

/// Handle a WebSocket connection.
async fn handle_ws_connection(socket: WebSocket, state: AppState, _guard: ConnectionGuard) {
    let (mut sender, mut receiver) = socket.split();

    let mut broadcast_rx = state.broadcast_tx.subscribe();

    let initial_msg = DashboardMessage::Snapshot(state.dashboard_state.collect_snapshot());
    if let Ok(json) = serde_json::to_string(&initial_msg) {
        if sender.send(Message::Text(json.into())).await.is_err() {
            debug!("Failed to send initial snapshot, client disconnected");
            return;
        }
    }

    // Incoming frames only matter for close detection.
    let mut incoming_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    debug!("Client sent close frame");
                    break;
                }
                Err(e) => {
                    debug!(error = %e, "WebSocket receive error");
                    break;
                }
                _ => {}
            }
        }
    });

    loop {
        tokio::select! {
            result = broadcast_rx.recv() => {
                match result {
                    Ok(msg) => {
                        if sender.send(Message::Text(msg.into())).await.is_err() {
                            debug!("Failed to send message, client disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "WebSocket client lagged, catching up");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                }
            }
            _ = &mut incoming_task => {
                debug!("Incoming task completed, closing connection");
                break;
            }
        }
    }

    incoming_task.abort();
    info!(
        connections = state.connection_limiter.current_count().saturating_sub(1),
        "WebSocket connection closed"
    );
}

/// Check basic authentication.
fn check_basic_auth(headers: &HeaderMap, config: &DashboardConfig) -> bool {
    let Some(auth_str) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    else {
        return false;
    };

    let Some(encoded) = auth_str.strip_prefix("Basic ") else {
        return false;
    };

    let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
        return false;
    };

    let expected = format!("{}:{}", config.username, config.password);
    decoded == expected.as_bytes()
}

fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"Signal Feed\"")],
        "Unauthorized",
    )
        .into_response()
}

/// Run the dashboard HTTP server until `shutdown` fires.
pub async fn run_server(
    dashboard_state: DashboardState,
    config: DashboardConfig,
    shutdown: CancellationToken,
) -> DashboardResult<()> {
    // Slow clients may fall this many updates behind before lagging.
    let (broadcast_tx, _) = broadcast::channel::<String>(32);

    let state = AppState::new(
        dashboard_state.clone(),
        broadcast_tx.clone(),
        config.clone(),
    );
    let app = create_router(state);

    tokio::spawn(crate::broadcast::run_broadcaster(
        dashboard_state,
        broadcast_tx,
        config.update_interval_ms,
        shutdown.clone(),
    ));

    let addr = config.socket_addr();
    info!(%addr, "Starting dashboard server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("Dashboard server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_auth() -> DashboardConfig {
        DashboardConfig {
            username: "ops".into(),
            password: "hunter2".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_basic_auth_accepts_matching_credentials() {
        let config = config_with_auth();
        let mut headers = HeaderMap::new();
        let value = format!("Basic {}", STANDARD.encode("ops:hunter2"));
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        assert!(check_basic_auth(&headers, &config));
    }

    #[test]
    fn test_basic_auth_rejects_wrong_or_missing() {
        let config = config_with_auth();
        assert!(!check_basic_auth(&HeaderMap::new(), &config));

        let mut headers = HeaderMap::new();
        let value = format!("Basic {}", STANDARD.encode("ops:wrong"));
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        assert!(!check_basic_auth(&headers, &config));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert!(!check_basic_auth(&headers, &config));
    }

    #[test]
    fn test_connection_limiter_releases_on_drop() {
        let limiter = Arc::new(ConnectionLimiter::new(1));
        let guard = limiter.try_acquire().unwrap();
        assert!(limiter.try_acquire().is_none());
        assert_eq!(limiter.current_count(), 1);
        drop(guard);
        assert!(limiter.try_acquire().is_some());
    }
}
