//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API client error: {0}")]
    Client(#[from] sigfeed_client::ClientError),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] sigfeed_ws::WsError),

    #[error("Dashboard error: {0}")]
    Dashboard(#[from] sigfeed_dashboard::DashboardError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] sigfeed_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
