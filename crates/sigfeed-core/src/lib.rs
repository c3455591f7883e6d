//! Core domain types for the live signal feed.
//!
//! This crate provides the vocabulary shared by every other crate:
//! - `Signal`, `PriceLevels`: trading signals with raw and AI-adjusted levels
//! - `EnrichmentRecord`: server-computed analysis attached to a signal
//! - `NotificationEvent`, `PushMessage`: push channel payloads
//! - `view`: pure per-row derivations (effective levels, risk/reward, expiry)
//! - `ports`: async traits for the REST collaborators

pub mod decimal;
pub mod enrichment;
pub mod error;
pub mod filters;
pub mod language;
pub mod notification;
pub mod ports;
pub mod push;
pub mod signal;
pub mod view;

pub use decimal::Price;
pub use enrichment::{EnrichmentRecord, GuardrailResult, ScoreBreakdown};
pub use error::{ApiError, ApiResult, CoreError, Result};
pub use filters::{AgeFilter, SignalFilters, SignalPage};
pub use language::Language;
pub use notification::{NotificationEvent, NotificationKey, NotificationKind};
pub use ports::{
    with_timeout, BoxFuture, DynEnrichmentSource, DynSignalSource, DynTranslator,
    EnrichmentSource, SignalSource, Translator,
};
pub use push::{PushKind, PushMessage};
pub use signal::{Direction, PriceLevels, Signal, SignalId, SignalStatus, SignalVersion};
pub use view::{
    effective_levels, has_differences, level_changes, risk_reward, time_until_expiry, Expiry,
    LevelChanges, SignalRow, EXPIRY_WINDOW_HOURS,
};
