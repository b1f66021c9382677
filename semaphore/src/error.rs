//! Lock error types.

use fxswitch_common::ErrorKind;
use thiserror::Error;

/// Errors that can occur while constructing or driving a semaphore.
#[derive(Debug, Error)]
pub enum SemaphoreError {
    /// Lock name was empty.
    #[error("Invalid lock name specified for semaphore")]
    InvalidLockName,

    /// The lock backend answered with something other than a boolean outcome.
    #[error("Lock backend error: {0}")]
    Backend(String),

    /// Database error from the MySQL backend.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SemaphoreError {
    /// Map to the shared error kind, if this error belongs to the closed set.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            SemaphoreError::InvalidLockName => Some(ErrorKind::InvalidLockName),
            _ => None,
        }
    }
}

/// Result type for lock operations.
pub type SemaphoreResult<T> = Result<T, SemaphoreError>;
