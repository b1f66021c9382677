//! The closed set of error kinds surfaced by the exchange-rate core.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a recorded error.
///
/// Lock and rate errors share this set so that a host can report every
/// failure through one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A lock was constructed with an empty name.
    #[serde(rename = "INVALID_LOCK_NAME")]
    InvalidLockName,
    /// Transport or protocol failure talking to a rate provider.
    #[serde(rename = "ERR_EXCEPTION_OCCURRED")]
    ExceptionOccurred,
    /// The rate provider reported an application-level error.
    #[serde(rename = "ERR_ERROR_RETURNED")]
    ErrorReturned,
    /// The provider answered with data of an unexpected shape.
    #[serde(rename = "ERR_UNEXPECTED_ERROR_FETCHING_EXCHANGE_RATES")]
    UnexpectedErrorFetchingExchangeRates,
    /// The rebase target is missing from the fetched rates.
    #[serde(rename = "ERR_BASE_CURRENCY_NOT_FOUND")]
    BaseCurrencyNotFound,
}

impl ErrorKind {
    /// Get the stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidLockName => "INVALID_LOCK_NAME",
            ErrorKind::ExceptionOccurred => "ERR_EXCEPTION_OCCURRED",
            ErrorKind::ErrorReturned => "ERR_ERROR_RETURNED",
            ErrorKind::UnexpectedErrorFetchingExchangeRates => {
                "ERR_UNEXPECTED_ERROR_FETCHING_EXCHANGE_RATES"
            }
            ErrorKind::BaseCurrencyNotFound => "ERR_BASE_CURRENCY_NOT_FOUND",
        }
    }

    /// Check if retrying the same operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::ExceptionOccurred | ErrorKind::UnexpectedErrorFetchingExchangeRates
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_serialized_names() {
        for kind in [
            ErrorKind::InvalidLockName,
            ErrorKind::ExceptionOccurred,
            ErrorKind::ErrorReturned,
            ErrorKind::UnexpectedErrorFetchingExchangeRates,
            ErrorKind::BaseCurrencyNotFound,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.code()));
        }
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorKind::ExceptionOccurred.is_retryable());
        assert!(!ErrorKind::BaseCurrencyNotFound.is_retryable());
        assert!(!ErrorKind::InvalidLockName.is_retryable());
    }
}
