//! Rate provider trait.

use async_trait::async_trait;
use fxswitch_common::{Currency, ErrorLog};

use crate::error::FxResult;
use crate::rates::RateSet;

/// A remote source of exchange rates.
///
/// Providers quote against their own native base, which need not be the
/// base the caller asked for; the cache rebases afterwards. Failures are
/// returned as `Err` and also appended to `errors` with their detail.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// The base currency the provider quotes against.
    fn native_base(&self) -> &Currency;

    /// Fetch all enabled rates, relative to [`RateProvider::native_base`].
    ///
    /// A well-formed but unusable answer yields `Ok` with an empty set.
    async fn fetch_rates(&self, requested_base: &Currency, errors: &ErrorLog)
        -> FxResult<RateSet>;
}

/// Currencies to quote against `native`: the enabled set plus the requested
/// base, without the native base itself and without duplicates.
pub fn request_currencies(
    enabled: &[Currency],
    native: &Currency,
    requested_base: &Currency,
) -> Vec<Currency> {
    let mut currencies: Vec<Currency> = Vec::with_capacity(enabled.len() + 1);
    for currency in enabled.iter().chain(std::iter::once(requested_base)) {
        if currency != native && !currencies.contains(currency) {
            currencies.push(currency.clone());
        }
    }
    currencies
}

/// Fixed-rate provider for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct StaticRateProvider {
    name: String,
    native: Currency,
    rates: parking_lot::Mutex<RateSet>,
    failure: parking_lot::Mutex<Option<String>>,
    fetches: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl StaticRateProvider {
    /// Create a provider that always answers with `rates`.
    pub fn new(name: impl Into<String>, rates: RateSet) -> Self {
        Self {
            name: name.into(),
            native: rates.base().clone(),
            rates: parking_lot::Mutex::new(rates),
            failure: parking_lot::Mutex::new(None),
            fetches: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Replace the served rates. The native base stays as constructed.
    pub fn set_rates(&self, rates: RateSet) {
        *self.rates.lock() = rates;
    }

    /// Make every subsequent fetch fail as a transport error.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock() = Some(message.into());
    }

    /// Number of fetches served so far, failed ones included.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateProvider for StaticRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn native_base(&self) -> &Currency {
        &self.native
    }

    async fn fetch_rates(
        &self,
        _requested_base: &Currency,
        errors: &ErrorLog,
    ) -> FxResult<RateSet> {
        self.fetches
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        let failure = self.failure.lock().clone();
        if let Some(message) = failure {
            errors.add_error(fxswitch_common::ErrorKind::ExceptionOccurred, message.clone());
            return Err(crate::error::FxError::Transport(message));
        }

        Ok(self.rates.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_currencies() {
        let enabled = vec![Currency::usd(), Currency::eur(), Currency::eur()];
        let result = request_currencies(&enabled, &Currency::usd(), &Currency::gbp());
        assert_eq!(result, vec![Currency::eur(), Currency::gbp()]);

        let result = request_currencies(&enabled, &Currency::usd(), &Currency::usd());
        assert_eq!(result, vec![Currency::eur()]);
    }

    #[tokio::test]
    async fn test_static_provider() {
        let rates = RateSet::from_rates(Currency::usd(), [(Currency::eur(), 0.9)]).unwrap();
        let provider = StaticRateProvider::new("static", rates.clone());
        let errors = ErrorLog::new();

        let fetched = provider.fetch_rates(&Currency::eur(), &errors).await.unwrap();
        assert_eq!(fetched, rates);
        assert_eq!(provider.fetch_count(), 1);
        assert!(errors.is_empty());

        provider.fail_with("connection refused");
        assert!(provider.fetch_rates(&Currency::eur(), &errors).await.is_err());
        assert_eq!(provider.fetch_count(), 2);
        assert_eq!(errors.len(), 1);
    }
}
