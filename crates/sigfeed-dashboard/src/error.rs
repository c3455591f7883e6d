//! Dashboard error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sigfeed_sync::SyncError;
use sigfeed_telemetry::TelemetryError;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Refresh unavailable: {0}")]
    Sync(#[from] SyncError),

    #[error("Metrics unavailable: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

pub type DashboardResult<T> = Result<T, DashboardError>;

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Sync(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Io(_) | Self::Telemetry(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!(status = status.as_u16(), error = %self, "Dashboard request failed");
        (status, self.to_string()).into_response()
    }
}
