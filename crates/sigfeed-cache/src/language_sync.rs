//! Keeps the translation cache aligned with the active display language.
//!
//! - On a language change, every cached enrichment record is re-localized,
//!   not just the ones currently on screen.
//! - When a new enrichment record lands, it is localized for the current
//!   language.

use crate::enrichment::EnrichmentCache;
use crate::translation::TranslationCache;
use sigfeed_core::Language;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct LanguageSync {
    enrichment: EnrichmentCache,
    translations: TranslationCache,
    language: watch::Receiver<Language>,
    shutdown: CancellationToken,
}

impl LanguageSync {
    pub fn new(
        enrichment: EnrichmentCache,
        translations: TranslationCache,
        language: watch::Receiver<Language>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            enrichment,
            translations,
            language,
            shutdown,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        let mut updates = self.enrichment.subscribe();
        let initial = self.language.borrow().clone();
        info!(language = %initial, "Language sync started");

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,

                changed = self.language.changed() => {
                    if changed.is_err() {
                        debug!("Language source dropped");
                        break;
                    }
                    let target = self.language.borrow_and_update().clone();
                    info!(language = %target, "Display language changed");
                    self.relocalize_cached(target);
                }

                update = updates.recv() => match update {
                    Ok(update) if update.loaded => {
                        let Some(record) = self.enrichment.get(update.signal_id) else {
                            continue;
                        };
                        let target = self.language.borrow().clone();
                        let translations = self.translations.clone();
                        tokio::spawn(async move {
                            if let Err(e) = translations.localize_record(&record, &target).await {
                                debug!(
                                    signal_id = %record.signal_id,
                                    error = %e,
                                    "Localize skipped"
                                );
                            }
                        });
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Enrichment updates lagged, re-localizing all records");
                        let target = self.language.borrow().clone();
                        self.relocalize_cached(target);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        info!("Language sync stopped");
    }

    fn relocalize_cached(&self, target: Language) {
        let records = self.enrichment.cached_records();
        if records.is_empty() {
            return;
        }
        debug!(count = records.len(), language = %target, "Re-localizing cached records");
        let translations = self.translations.clone();
        tokio::spawn(async move {
            translations.relocalize_all(&records, &target).await;
        });
    }
}
