//! Open Exchange Rates provider.

use std::collections::BTreeMap;

use async_trait::async_trait;
use fxswitch_common::{Currency, ErrorLog};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::{FxError, FxResult};
use crate::provider::{request_currencies, RateProvider};
use crate::providers::http;
use crate::rates::RateSet;

/// Public API root.
pub const DEFAULT_ENDPOINT: &str = "https://openexchangerates.org/api";

#[derive(Debug, Deserialize)]
struct LatestResponse {
    base: Option<String>,
    rates: BTreeMap<String, f64>,
}

/// Fetches `latest.json` from Open Exchange Rates.
pub struct OpenExchangeRatesProvider {
    client: Client,
    endpoint: String,
    app_id: String,
    native_base: Currency,
    enabled: Vec<Currency>,
}

impl OpenExchangeRatesProvider {
    /// Create a provider from configuration. Requires an app ID.
    pub fn new(config: &ProviderConfig) -> FxResult<Self> {
        let app_id = config
            .app_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                FxError::Configuration("Open Exchange Rates requires an app ID".to_string())
            })?;

        Ok(Self {
            client: http::client(config.request_timeout)?,
            endpoint: config
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            app_id,
            native_base: config.native_base.clone(),
            enabled: config.enabled_currencies(),
        })
    }

    fn decode(&self, response: LatestResponse) -> RateSet {
        let base = response
            .base
            .map(Currency::new)
            .unwrap_or_else(|| self.native_base.clone());
        if base != self.native_base {
            warn!(expected = %self.native_base, actual = %base, "Provider answered in another base");
        }

        let mut set = RateSet::new(base);
        for (code, rate) in response.rates {
            let currency = Currency::new(code);
            if let Err(e) = set.insert(currency, rate) {
                warn!(error = %e, "Skipping unusable rate");
            }
        }
        set
    }
}

#[async_trait]
impl RateProvider for OpenExchangeRatesProvider {
    fn name(&self) -> &str {
        "Open Exchange Rates"
    }

    fn native_base(&self) -> &Currency {
        &self.native_base
    }

    async fn fetch_rates(&self, requested_base: &Currency, errors: &ErrorLog) -> FxResult<RateSet> {
        let currencies = request_currencies(&self.enabled, &self.native_base, requested_base);
        if currencies.is_empty() {
            debug!(provider = self.name(), "Nothing to request beyond the native base");
            return Ok(RateSet::new(self.native_base.clone()));
        }

        let symbols = currencies
            .iter()
            .map(Currency::code)
            .collect::<Vec<_>>()
            .join(",");
        let query = [
            ("app_id", self.app_id.clone()),
            ("base", self.native_base.code().to_string()),
            ("symbols", symbols),
        ];
        let url = format!("{}/latest.json", self.endpoint.trim_end_matches('/'));

        let (status, body) =
            http::get_json(&self.client, self.name(), &url, &query, errors).await?;

        if let Some((code, message)) = http::remote_error(&body) {
            return Err(http::error_returned(self.name(), code, message, errors));
        }
        if !status.is_success() {
            return Err(http::unexpected_status(self.name(), status, errors));
        }

        match serde_json::from_value::<LatestResponse>(body) {
            Ok(response) => {
                let set = self.decode(response);
                debug!(provider = self.name(), count = set.len(), "Decoded rates");
                Ok(set)
            }
            Err(e) => {
                http::unexpected_payload(self.name(), e, errors);
                Ok(RateSet::empty(self.native_base.clone()))
            }
        }
    }
}
