//! Sync error types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("Refresh coordinator has stopped")]
    CoordinatorStopped,
}

pub type SyncResult<T> = Result<T, SyncError>;
