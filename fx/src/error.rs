//! FX error types.

use fxswitch_common::{Currency, ErrorKind};
use fxswitch_semaphore::SemaphoreError;
use thiserror::Error;

/// Errors that can occur while fetching, rebasing or refreshing rates.
#[derive(Debug, Error)]
pub enum FxError {
    /// Transport or protocol failure talking to the provider.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider reported an application-level error.
    #[error("Provider returned error {code}: {message}")]
    RemoteError { code: String, message: String },

    /// Provider payload did not have the expected structure.
    #[error("Unexpected payload: {0}")]
    UnexpectedPayload(String),

    /// Rebase target is absent from the rate set, or its rate is not positive.
    #[error("Base currency not found: {0}")]
    BaseCurrencyNotFound(Currency),

    /// Rate is not a positive finite number.
    #[error("Invalid rate {rate} for {currency}")]
    InvalidRate { currency: Currency, rate: f64 },

    /// Invalid provider configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Lock error while guarding a refresh.
    #[error(transparent)]
    Lock(#[from] SemaphoreError),
}

impl FxError {
    /// Map to the shared error kind, if this error belongs to the closed set.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            FxError::Transport(_) => Some(ErrorKind::ExceptionOccurred),
            FxError::RemoteError { .. } => Some(ErrorKind::ErrorReturned),
            FxError::UnexpectedPayload(_) => Some(ErrorKind::UnexpectedErrorFetchingExchangeRates),
            FxError::BaseCurrencyNotFound(_) => Some(ErrorKind::BaseCurrencyNotFound),
            FxError::Lock(e) => e.kind(),
            FxError::InvalidRate { .. } | FxError::Configuration(_) => None,
        }
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;
