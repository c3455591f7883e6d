//! Per-signal caches that sit behind the signal list.
//!
//! - `EnrichmentCache`: lazy enrichment loader with one fetch in flight per id
//! - `TranslationCache`: localized notes for the active display language
//! - `LanguageSync`: keeps localized notes in step with language switches

pub mod enrichment;
pub mod error;
pub mod language_sync;
pub mod translation;

pub use enrichment::{EnrichmentCache, EnrichmentState, EnrichmentUpdate};
pub use error::{CacheError, CacheResult};
pub use language_sync::LanguageSync;
pub use translation::{LocalizeOutcome, LocalizedNotes, TranslationCache};
