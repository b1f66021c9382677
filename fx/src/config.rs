//! Rate provider configuration.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use fxswitch_common::{constants, Currency};

use crate::error::{FxError, FxResult};
use crate::provider::RateProvider;
use crate::providers::{OpenExchangeRatesProvider, YahooFinanceProvider};

/// Which remote source supplies rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    YahooFinance,
    OpenExchangeRates,
}

impl FromStr for ProviderKind {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yahoo" | "yahoo-finance" => Ok(ProviderKind::YahooFinance),
            "openexchangerates" | "open-exchange-rates" | "oxr" => {
                Ok(ProviderKind::OpenExchangeRates)
            }
            other => Err(FxError::Configuration(format!("Unknown rate provider: {other}"))),
        }
    }
}

/// Rate provider configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider implementation.
    pub kind: ProviderKind,
    /// Override for the provider endpoint.
    pub endpoint: Option<String>,
    /// API key, where the provider needs one.
    pub app_id: Option<String>,
    /// Base currency the provider quotes against.
    pub native_base: Currency,
    /// Store currency, requested when no currencies are enabled explicitly.
    pub store_currency: Currency,
    /// Currencies to request.
    pub enabled_currencies: Vec<Currency>,
    /// Timeout for a single provider request.
    pub request_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::YahooFinance,
            endpoint: None,
            app_id: None,
            native_base: Currency::usd(),
            store_currency: Currency::usd(),
            enabled_currencies: Vec::new(),
            request_timeout: constants::RATE_FETCH_TIMEOUT,
        }
    }
}

impl ProviderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> FxResult<Self> {
        let mut config = Self::default();

        if let Ok(kind) = std::env::var("RATES_PROVIDER") {
            config.kind = kind.parse()?;
        }

        if let Ok(endpoint) = std::env::var("RATES_ENDPOINT") {
            config.endpoint = Some(endpoint);
        }

        if let Ok(app_id) = std::env::var("OXR_APP_ID") {
            config.app_id = Some(app_id);
        }

        if let Ok(base) = std::env::var("RATES_NATIVE_BASE") {
            config.native_base = Currency::new(base);
        }

        if let Ok(currency) = std::env::var("STORE_CURRENCY") {
            config.store_currency = Currency::new(currency);
        }

        if let Ok(list) = std::env::var("ENABLED_CURRENCIES") {
            config.enabled_currencies = Currency::parse_list(&list);
        }

        if let Ok(secs) = std::env::var("RATES_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.request_timeout = Duration::from_secs(secs);
            }
        }

        Ok(config)
    }

    /// Enabled currencies, defaulting to the store currency.
    pub fn enabled_currencies(&self) -> Vec<Currency> {
        if self.enabled_currencies.is_empty() {
            vec![self.store_currency.clone()]
        } else {
            self.enabled_currencies.clone()
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout.is_zero() {
            return Err("Request timeout cannot be 0".to_string());
        }

        for currency in std::iter::once(&self.native_base)
            .chain(std::iter::once(&self.store_currency))
            .chain(self.enabled_currencies.iter())
        {
            if !currency.is_well_formed() {
                return Err(format!("Invalid currency code: '{currency}'"));
            }
        }

        if self.kind == ProviderKind::OpenExchangeRates
            && self.app_id.as_deref().map_or(true, str::is_empty)
        {
            return Err("Open Exchange Rates requires OXR_APP_ID".to_string());
        }

        Ok(())
    }

    /// Build the configured provider.
    pub fn build(&self) -> FxResult<Arc<dyn RateProvider>> {
        self.validate().map_err(FxError::Configuration)?;

        Ok(match self.kind {
            ProviderKind::YahooFinance => Arc::new(YahooFinanceProvider::new(self)?),
            ProviderKind::OpenExchangeRates => Arc::new(OpenExchangeRatesProvider::new(self)?),
        })
    }
}
