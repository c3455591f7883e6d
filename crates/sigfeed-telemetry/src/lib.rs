//! Prometheus metrics and structured logging for the signal feed.
//!
//! - Prometheus metrics for list refreshes, enrichment, translation and push traffic
//! - Structured JSON logging with tracing in production, pretty output otherwise

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
