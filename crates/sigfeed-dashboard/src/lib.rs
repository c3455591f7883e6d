//! sigfeed-dashboard - HTTP/WebSocket surface for the live signal feed.
//!
//! Exposes what the view layer observes and accepts the UI events that
//! drive the core:
//!
//! ```text
//! GET  /api/snapshot     → FeedSnapshot (a render pass: lazily loads enrichment)
//! POST /api/filters      → filter change (immediate fetch)
//! POST /api/refresh      → "try again"
//! POST /api/inbox/open   → inbox open transition
//! POST /api/inbox/close  → inbox close transition
//! POST /api/language     → display language switch
//! GET  /ws               → initial snapshot, then periodic updates
//! GET  /metrics          → Prometheus text format
//! ```

mod broadcast;
mod config;
mod error;
mod server;
mod state;
mod types;

pub use config::DashboardConfig;
pub use error::{DashboardError, DashboardResult};
pub use server::{create_router, run_server, AppState};
pub use state::DashboardState;
pub use types::{
    CommandAck, DashboardMessage, EnrichmentView, FeedSnapshot, LanguageRequest, RowView,
};
