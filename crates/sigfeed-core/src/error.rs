//! Error types for sigfeed-core.

use std::time::Duration;
use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Unknown variant for {field}: {value}")]
    UnknownVariant { field: &'static str, value: String },

    #[error("Invalid push message: {0}")]
    InvalidPushMessage(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Failure of a call to an external collaborator (REST API, translator).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Network failure: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Response decode failed: {0}")]
    Decode(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Translation failed: {0}")]
    Translation(String),
}

impl ApiError {
    /// Whether this failure belongs to the NetworkFailure class.
    ///
    /// Translation failures are non-fatal and handled separately.
    pub fn is_network_failure(&self) -> bool {
        !matches!(self, Self::Translation(_))
    }

    /// Short label for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Http { .. } => "http",
            Self::Decode(_) => "decode",
            Self::Timeout(_) => "timeout",
            Self::Translation(_) => "translation",
        }
    }
}

/// Result type alias for collaborator calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_is_not_network_failure() {
        assert!(!ApiError::Translation("length mismatch".into()).is_network_failure());
        assert!(ApiError::Timeout(Duration::from_secs(1)).is_network_failure());
        assert!(ApiError::Http {
            status: 502,
            body: String::new()
        }
        .is_network_failure());
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::Http {
            status: 503,
            body: "unavailable".into(),
        };
        assert_eq!(err.to_string(), "HTTP 503: unavailable");
        assert_eq!(err.kind(), "http");
    }
}
