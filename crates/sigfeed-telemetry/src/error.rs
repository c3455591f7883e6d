//! Telemetry errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed.
    #[error("Tracing subscriber already set: {0}")]
    SubscriberInstalled(String),

    #[error("Metrics encoding failed: {0}")]
    Encode(#[from] prometheus::Error),

    #[error("Metrics output is not UTF-8: {0}")]
    NotUtf8(#[from] std::string::FromUtf8Error),
}

pub type TelemetryResult<T> = Result<T, TelemetryError>;
