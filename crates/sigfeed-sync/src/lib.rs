//! Keeps the signal list fresh.
//!
//! - `ChangeStore`: single-slot "last local change" timestamp
//! - `RefreshCoordinator`: merges store bumps, push messages and filter
//!   changes into debounced, sequence-tagged list fetches
//! - `ExpiryClock`: shared periodic `now` for expiry derivation

pub mod change_store;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;

pub use change_store::ChangeStore;
pub use clock::{Clock, ExpiryClock, ManualClock, SystemClock};
pub use config::SyncConfig;
pub use coordinator::{FeedState, FetchOutcome, RefreshCoordinator, RefreshHandle, TriggerSource};
pub use error::{SyncError, SyncResult};
