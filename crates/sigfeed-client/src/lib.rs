//! REST client for the signal feed backend.
//!
//! `ApiClient` implements the three collaborator ports the core consumes:
//! - `SignalSource` via `GET /signals`
//! - `EnrichmentSource` via `GET /signals/{id}/enrichment`
//! - `Translator` via `POST /translate`

pub mod client;
pub mod error;

pub use client::{ApiClient, ApiClientConfig};
pub use error::{ClientError, ClientResult};
