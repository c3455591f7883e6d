//! Live signal feed service.
//!
//! Wires every component together:
//! - REST client for the signal list, enrichment and translation
//! - Push channel (WebSocket) fanned out to the coordinator and the inbox
//! - Refresh coordinator, caches, language sync and expiry clock
//! - Dashboard HTTP/WebSocket surface

pub mod app;
pub mod config;
pub mod error;

pub use app::{Application, Components, Sources};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
