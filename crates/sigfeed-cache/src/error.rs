//! Cache error types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache is closed")]
    Closed,
}

pub type CacheResult<T> = Result<T, CacheError>;
