//! Collaborator ports.
//!
//! The REST API and the translation facility are external; the core only
//! sees these traits, so tests substitute in-memory fakes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::enrichment::EnrichmentRecord;
use crate::error::{ApiError, ApiResult};
use crate::filters::{SignalFilters, SignalPage};
use crate::language::Language;
use crate::signal::SignalId;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// `fetchSignals(filters) -> {signals, total}`.
pub trait SignalSource: Send + Sync {
    fn fetch_signals(&self, filters: SignalFilters) -> BoxFuture<'_, ApiResult<SignalPage>>;
}

/// `fetchEnrichment(signalId) -> EnrichmentRecord`.
pub trait EnrichmentSource: Send + Sync {
    fn fetch_enrichment(&self, signal_id: SignalId) -> BoxFuture<'_, ApiResult<EnrichmentRecord>>;
}

/// `translate(texts, targetLanguage) -> texts`.
///
/// Implementations must preserve order and length.
pub trait Translator: Send + Sync {
    fn translate(
        &self,
        texts: Vec<String>,
        target: Language,
    ) -> BoxFuture<'_, ApiResult<Vec<String>>>;
}

pub type DynSignalSource = Arc<dyn SignalSource>;
pub type DynEnrichmentSource = Arc<dyn EnrichmentSource>;
pub type DynTranslator = Arc<dyn Translator>;

/// Bound a collaborator call. `None` waits indefinitely.
pub async fn with_timeout<T, F>(fut: F, limit: Option<Duration>) -> ApiResult<T>
where
    F: Future<Output = ApiResult<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .unwrap_or(Err(ApiError::Timeout(limit))),
        None => fut.await,
    }
}
