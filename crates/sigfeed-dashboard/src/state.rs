//! Dashboard state.
//!
//! Aggregates the refresh coordinator, caches, inbox and language into the
//! snapshot the UI renders, and forwards UI events back to their owners.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::info;

use sigfeed_cache::{EnrichmentCache, EnrichmentState, TranslationCache};
use sigfeed_core::{Language, SignalFilters, SignalRow};
use sigfeed_inbox::{InboxSnapshot, NotificationInbox};
use sigfeed_sync::{RefreshHandle, SyncResult};

use crate::types::{EnrichmentView, FeedSnapshot, RowView};

#[derive(Clone)]
pub struct DashboardState {
    refresh: RefreshHandle,
    enrichment: EnrichmentCache,
    translations: TranslationCache,
    inbox: Arc<NotificationInbox>,
    language: Arc<watch::Sender<Language>>,
    /// Shared `now` republished by the expiry clock.
    now: watch::Receiver<DateTime<Utc>>,
}

impl DashboardState {
    pub fn new(
        refresh: RefreshHandle,
        enrichment: EnrichmentCache,
        translations: TranslationCache,
        inbox: Arc<NotificationInbox>,
        language: Arc<watch::Sender<Language>>,
        now: watch::Receiver<DateTime<Utc>>,
    ) -> Self {
        Self {
            refresh,
            enrichment,
            translations,
            inbox,
            language,
            now,
        }
    }

    /// Build a snapshot. This is a render pass: enriched rows that are not
    /// cached yet get their fetch started here.
    pub fn collect_snapshot(&self) -> FeedSnapshot {
        let feed = self.refresh.state();
        let now = *self.now.borrow();
        let language = self.language();

        self.enrichment.ensure_visible(&feed.signals);

        let rows = feed
            .signals
            .iter()
            .map(|signal| RowView {
                row: SignalRow::derive(signal, now),
                enrichment: signal
                    .status
                    .is_enriched()
                    .then(|| self.enrichment_view(signal.id, &language)),
            })
            .collect();

        FeedSnapshot {
            timestamp_ms: Utc::now().timestamp_millis(),
            rows,
            total: feed.total,
            loading: feed.loading,
            error: feed.error,
            filters: feed.filters,
            language,
            inbox: self.inbox.snapshot(),
        }
    }

    fn enrichment_view(
        &self,
        signal_id: sigfeed_core::SignalId,
        language: &Language,
    ) -> EnrichmentView {
        match self.enrichment.state(signal_id) {
            EnrichmentState::Loading => EnrichmentView::Loading,
            EnrichmentState::Absent => EnrichmentView::Unavailable,
            EnrichmentState::Present(record) => EnrichmentView::Ready {
                notes: self.translations.display_notes(&record, language),
                record: (*record).clone(),
            },
        }
    }

    pub fn language(&self) -> Language {
        self.language.borrow().clone()
    }

    /// Switch the display language. Returns `false` if it was already active.
    pub fn set_language(&self, language: Language) -> bool {
        let changed = self.language.send_if_modified(|current| {
            if *current == language {
                return false;
            }
            *current = language.clone();
            true
        });
        if changed {
            info!(language = %language, "Display language switched");
        }
        changed
    }

    pub async fn set_filters(&self, filters: SignalFilters) -> SyncResult<()> {
        self.refresh.set_filters(filters).await
    }

    pub async fn retry(&self) -> SyncResult<()> {
        self.refresh.retry().await
    }

    pub fn open_inbox(&self) -> (bool, InboxSnapshot) {
        let changed = self.inbox.open();
        (changed, self.inbox.snapshot())
    }

    pub fn close_inbox(&self) -> (bool, InboxSnapshot) {
        let changed = self.inbox.close();
        (changed, self.inbox.snapshot())
    }
}
