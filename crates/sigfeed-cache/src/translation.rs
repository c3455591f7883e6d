//! Translation cache.
//!
//! Holds, per signal id, the notes of its enrichment record localized into
//! the active display language. Switching to the record's source language
//! removes the override so readers fall through to the source notes. A
//! failed translation caches the source notes as the fallback.
//!
//! Every `localize` call takes a fresh per-id generation; a translation
//! that completes after a newer call for the same id is discarded.

use crate::error::{CacheError, CacheResult};
use dashmap::DashMap;
use futures_util::future::join_all;
use serde::Serialize;
use sigfeed_core::{with_timeout, DynTranslator, EnrichmentRecord, Language, SignalId};
use sigfeed_telemetry::Metrics;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Cached override for one signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalizedNotes {
    pub language: Language,
    pub notes: Vec<String>,
    /// `false` when `notes` are the source notes kept after a failure.
    pub translated: bool,
}

/// What a `localize` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalizeOutcome {
    /// Target is the source language; override removed.
    SourceLanguage,
    Translated,
    /// Translation failed; source notes cached.
    Fallback,
    /// A newer call for the same id finished first.
    Superseded,
}

struct Inner {
    translator: DynTranslator,
    overrides: DashMap<SignalId, LocalizedNotes>,
    generations: DashMap<SignalId, u64>,
    call_timeout: Option<Duration>,
    closed: AtomicBool,
}

/// Per-signal localized notes. Cheap to clone.
#[derive(Clone)]
pub struct TranslationCache {
    inner: Arc<Inner>,
}

impl TranslationCache {
    pub fn new(translator: DynTranslator, call_timeout: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(Inner {
                translator,
                overrides: DashMap::new(),
                generations: DashMap::new(),
                call_timeout,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Localize `notes` (written in `source`) for `target`.
    pub async fn localize(
        &self,
        signal_id: SignalId,
        notes: &[String],
        source: &Language,
        target: &Language,
    ) -> CacheResult<LocalizeOutcome> {
        if self.is_closed() {
            return Err(CacheError::Closed);
        }

        let generation = self.next_generation(signal_id);

        if target == source {
            self.inner.overrides.remove(&signal_id);
            debug!(signal_id = %signal_id, language = %target, "Cleared localized notes");
            return Ok(LocalizeOutcome::SourceLanguage);
        }

        let result = if notes.is_empty() {
            Ok(Vec::new())
        } else {
            with_timeout(
                self.inner.translator.translate(notes.to_vec(), target.clone()),
                self.inner.call_timeout,
            )
            .await
        };

        if self.is_closed() {
            debug!(signal_id = %signal_id, "Dropping translation after close");
            return Err(CacheError::Closed);
        }
        if self.current_generation(signal_id) != generation {
            Metrics::translation("superseded");
            debug!(signal_id = %signal_id, language = %target, "Discarding superseded translation");
            return Ok(LocalizeOutcome::Superseded);
        }

        let (localized, outcome) = match result {
            Ok(translated) if translated.len() == notes.len() => {
                Metrics::translation("ok");
                (
                    LocalizedNotes {
                        language: target.clone(),
                        notes: translated,
                        translated: true,
                    },
                    LocalizeOutcome::Translated,
                )
            }
            Ok(translated) => {
                Metrics::translation("fallback");
                warn!(
                    signal_id = %signal_id,
                    expected = notes.len(),
                    actual = translated.len(),
                    "Translation length mismatch, using source notes"
                );
                (self.fallback(notes, target), LocalizeOutcome::Fallback)
            }
            Err(e) => {
                Metrics::translation("fallback");
                warn!(
                    signal_id = %signal_id,
                    language = %target,
                    error = %e,
                    "Translation failed, using source notes"
                );
                (self.fallback(notes, target), LocalizeOutcome::Fallback)
            }
        };

        self.inner.overrides.insert(signal_id, localized);
        Ok(outcome)
    }

    pub async fn localize_record(
        &self,
        record: &EnrichmentRecord,
        target: &Language,
    ) -> CacheResult<LocalizeOutcome> {
        self.localize(record.signal_id, &record.notes, &record.source_language, target)
            .await
    }

    /// Re-run `localize` for every record, concurrently.
    pub async fn relocalize_all(
        &self,
        records: &[Arc<EnrichmentRecord>],
        target: &Language,
    ) -> Vec<CacheResult<LocalizeOutcome>> {
        join_all(records.iter().map(|r| self.localize_record(r, target))).await
    }

    pub fn get(&self, signal_id: SignalId) -> Option<LocalizedNotes> {
        self.inner.overrides.get(&signal_id).map(|o| o.clone())
    }

    /// Notes to display for `record` in `target`.
    ///
    /// Uses the cached override when it matches `target`, else the source notes.
    pub fn display_notes(&self, record: &EnrichmentRecord, target: &Language) -> Vec<String> {
        match self.inner.overrides.get(&record.signal_id) {
            Some(o) if &o.language == target => o.notes.clone(),
            _ => record.notes.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.overrides.is_empty()
    }

    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn fallback(&self, notes: &[String], target: &Language) -> LocalizedNotes {
        LocalizedNotes {
            language: target.clone(),
            notes: notes.to_vec(),
            translated: false,
        }
    }

    fn next_generation(&self, signal_id: SignalId) -> u64 {
        let mut generation = self.inner.generations.entry(signal_id).or_insert(0);
        *generation += 1;
        *generation
    }

    fn current_generation(&self, signal_id: SignalId) -> u64 {
        self.inner
            .generations
            .get(&signal_id)
            .map(|g| *g)
            .unwrap_or(0)
    }
}
