//! Single-flight rate refresh guarded by a named semaphore.

use std::sync::Arc;

use fxswitch_common::{Currency, ErrorRecord};
use fxswitch_semaphore::{LockService, Semaphore};
use tracing::{info, warn};

use crate::cache::ExchangeRateCache;
use crate::error::FxResult;
use crate::rates::RateSet;

/// Default name of the refresh lock.
pub const DEFAULT_LOCK_NAME: &str = "fxswitch_exchange_rates_refresh";

/// Result of a refresh attempt.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// Fresh rates were fetched and cached.
    Refreshed(RateSet),
    /// Another holder owns the lock; nothing was done.
    Skipped,
    /// The lock was taken but the rates could not be obtained.
    Failed(Vec<ErrorRecord>),
}

impl RefreshOutcome {
    pub fn is_refreshed(&self) -> bool {
        matches!(self, RefreshOutcome::Refreshed(_))
    }
}

/// Refreshes the cache while holding a process-external lock, so that only
/// one host process hits the provider at a time.
pub struct RateRefresher {
    cache: Arc<ExchangeRateCache>,
    locks: Arc<dyn LockService>,
    lock_name: String,
}

impl RateRefresher {
    /// Create a refresher using [`DEFAULT_LOCK_NAME`].
    pub fn new(cache: Arc<ExchangeRateCache>, locks: Arc<dyn LockService>) -> Self {
        Self {
            cache,
            locks,
            lock_name: DEFAULT_LOCK_NAME.to_string(),
        }
    }

    /// Use another lock name.
    pub fn with_lock_name(mut self, name: impl Into<String>) -> Self {
        self.lock_name = name.into();
        self
    }

    pub fn cache(&self) -> &Arc<ExchangeRateCache> {
        &self.cache
    }

    /// Force a fetch for `base_currency` unless another holder is refreshing.
    /// On failure the previously cached rates stay in place.
    ///
    /// Only an invalid lock name is returned as `Err`.
    pub async fn refresh(&self, base_currency: &Currency) -> FxResult<RefreshOutcome> {
        let mut lock = Semaphore::new(self.lock_name.as_str(), self.locks.clone())?;

        if !lock.acquire().await {
            info!(lock_name = %self.lock_name, base = %base_currency, "Refresh skipped, lock busy");
            return Ok(RefreshOutcome::Skipped);
        }

        let recorded_before = self.cache.error_log().len();
        let refreshed = self.cache.force_refresh(base_currency).await;

        if !lock.release().await {
            warn!(lock_name = %self.lock_name, "Refresh lock could not be released");
        }

        Ok(match refreshed {
            Some(rates) => RefreshOutcome::Refreshed(rates),
            None => {
                let errors = self
                    .cache
                    .errors()
                    .into_iter()
                    .skip(recorded_before)
                    .collect();
                RefreshOutcome::Failed(errors)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FxError;
    use crate::provider::StaticRateProvider;
    use fxswitch_common::ErrorKind;
    use fxswitch_semaphore::InMemoryLockService;

    fn setup() -> (Arc<StaticRateProvider>, Arc<InMemoryLockService>, RateRefresher) {
        let rates = RateSet::from_rates(Currency::usd(), [(Currency::eur(), 0.9)]).unwrap();
        let provider = Arc::new(StaticRateProvider::new("static", rates));
        let cache = Arc::new(ExchangeRateCache::new(provider.clone()));
        let locks = Arc::new(InMemoryLockService::new());
        let refresher = RateRefresher::new(cache, locks.clone());
        (provider, locks, refresher)
    }

    #[tokio::test]
    async fn test_refresh_fetches_and_releases() {
        let (provider, locks, refresher) = setup();

        let outcome = refresher.refresh(&Currency::eur()).await.unwrap();

        let RefreshOutcome::Refreshed(rates) = outcome else {
            panic!("expected refreshed rates");
        };
        assert_eq!(rates.base(), &Currency::eur());
        assert_eq!(provider.fetch_count(), 1);
        assert!(locks.is_free(DEFAULT_LOCK_NAME).await.unwrap());
    }

    #[tokio::test]
    async fn test_refresh_always_refetches() {
        let (provider, _locks, refresher) = setup();

        refresher.refresh(&Currency::usd()).await.unwrap();
        refresher.refresh(&Currency::usd()).await.unwrap();

        assert_eq!(provider.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_refresh_skipped_when_locked() {
        let (provider, locks, refresher) = setup();
        let mut holder = Semaphore::new(DEFAULT_LOCK_NAME, locks.clone()).unwrap();
        assert!(holder.acquire().await);

        let outcome = refresher.refresh(&Currency::usd()).await.unwrap();

        assert!(matches!(outcome, RefreshOutcome::Skipped));
        assert_eq!(provider.fetch_count(), 0);
        assert!(holder.release().await);
    }

    #[tokio::test]
    async fn test_failed_refresh_releases_lock() {
        let (provider, locks, refresher) = setup();
        provider.fail_with("connection refused");

        let outcome = refresher.refresh(&Currency::usd()).await.unwrap();

        let RefreshOutcome::Failed(errors) = outcome else {
            panic!("expected a failed refresh");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::ExceptionOccurred);
        assert!(locks.is_free(DEFAULT_LOCK_NAME).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_refresh_reports_only_new_errors() {
        let (provider, _locks, refresher) = setup();
        provider.fail_with("connection refused");
        refresher.refresh(&Currency::usd()).await.unwrap();

        let outcome = refresher.refresh(&Currency::usd()).await.unwrap();
        let RefreshOutcome::Failed(errors) = outcome else {
            panic!("expected a failed refresh");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(refresher.cache().errors().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_rates() {
        let (provider, locks, refresher) = setup();
        assert!(refresher.refresh(&Currency::usd()).await.unwrap().is_refreshed());

        provider.fail_with("connection refused");
        let outcome = refresher.refresh(&Currency::usd()).await.unwrap();
        assert!(matches!(outcome, RefreshOutcome::Failed(_)));

        let cache = refresher.cache();
        assert_eq!(cache.current().await.unwrap().get(&Currency::eur()), Some(0.9));
        assert_eq!(cache.get_rate(&Currency::usd(), &Currency::eur()).await, Some(0.9));
        assert_eq!(provider.fetch_count(), 2);
        assert!(locks.is_free(DEFAULT_LOCK_NAME).await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_lock_name() {
        let (_provider, _locks, refresher) = setup();
        let refresher = refresher.with_lock_name("");

        let err = refresher.refresh(&Currency::usd()).await.unwrap_err();
        assert!(matches!(err, FxError::Lock(_)));
        assert_eq!(err.kind(), Some(ErrorKind::InvalidLockName));
    }
}
