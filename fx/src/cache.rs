//! Single-slot exchange-rate cache.

use std::sync::Arc;

use fxswitch_common::{Currency, ErrorKind, ErrorLog, ErrorRecord};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::error::FxResult;
use crate::provider::RateProvider;
use crate::rates::RateSet;

/// Holds the most recently fetched rate set, rebased to the last requested base.
///
/// Freshness is purely base-currency identity: repeated requests for the
/// same base are served from the slot until [`ExchangeRateCache::invalidate`]
/// is called or another base is requested.
pub struct ExchangeRateCache {
    provider: Arc<dyn RateProvider>,
    slot: Mutex<Option<RateSet>>,
    errors: ErrorLog,
}

impl ExchangeRateCache {
    /// Create an empty cache in front of `provider`.
    pub fn new(provider: Arc<dyn RateProvider>) -> Self {
        Self {
            provider,
            slot: Mutex::new(None),
            errors: ErrorLog::new(),
        }
    }

    /// Rate of `currency` relative to `base_currency`.
    pub async fn get_rate(&self, base_currency: &Currency, currency: &Currency) -> Option<f64> {
        self.refresh_if_needed(base_currency).await?.get(currency)
    }

    /// Ensure the slot holds rates for `base_currency`, fetching and
    /// rebasing when it is empty or holds another base.
    ///
    /// Returns `None` when the rates could not be obtained; details are in
    /// [`ExchangeRateCache::errors`]. A failed fetch leaves the slot as it was.
    #[instrument(skip(self, base_currency), fields(base = %base_currency, provider = self.provider.name()))]
    pub async fn refresh_if_needed(&self, base_currency: &Currency) -> Option<RateSet> {
        let mut slot = self.slot.lock().await;

        if let Some(cached) = slot.as_ref().filter(|set| set.base() == base_currency) {
            debug!("Cache hit");
            return Some(cached.clone());
        }

        debug!("Cache miss");
        self.fetch_into(&mut slot, base_currency).await
    }

    /// Fetch and rebase for `base_currency` whatever the slot holds.
    ///
    /// The slot stays locked for the whole fetch and is replaced only on
    /// success, so readers keep getting the last good set meanwhile and
    /// after a failure.
    #[instrument(skip(self, base_currency), fields(base = %base_currency, provider = self.provider.name()))]
    pub async fn force_refresh(&self, base_currency: &Currency) -> Option<RateSet> {
        let mut slot = self.slot.lock().await;
        self.fetch_into(&mut slot, base_currency).await
    }

    async fn fetch_into(
        &self,
        slot: &mut Option<RateSet>,
        base_currency: &Currency,
    ) -> Option<RateSet> {
        let fetched = self
            .provider
            .fetch_rates(base_currency, &self.errors)
            .await
            .ok()?;

        if fetched.is_empty() {
            debug!("Provider returned no rates");
            return None;
        }

        let rebased = self.rebase(&fetched, base_currency).ok()?;
        info!(count = rebased.len(), native = %fetched.base(), "Exchange rates refreshed");

        *slot = Some(rebased.clone());
        Some(rebased)
    }

    /// Re-express `rates` relative to `target_base`, recording
    /// `ERR_BASE_CURRENCY_NOT_FOUND` on failure.
    pub fn rebase(&self, rates: &RateSet, target_base: &Currency) -> FxResult<RateSet> {
        rates.rebase(target_base).map_err(|e| {
            self.errors.add_error(
                ErrorKind::BaseCurrencyNotFound,
                format!(
                    "Could not rebase rates against base currency \"{target_base}\". \
                     Currency not found in data returned by {}.",
                    self.provider.name()
                ),
            );
            e
        })
    }

    /// Drop the cached set so the next request fetches again.
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }

    /// The cached set, if any.
    pub async fn current(&self) -> Option<RateSet> {
        self.slot.lock().await.clone()
    }

    /// Errors recorded so far, oldest first.
    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.errors.errors()
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.errors
    }

    pub fn clear_errors(&self) {
        self.errors.clear();
    }

    pub fn provider(&self) -> &Arc<dyn RateProvider> {
        &self.provider
    }
}
