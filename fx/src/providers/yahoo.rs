//! Yahoo Finance YQL provider.

use async_trait::async_trait;
use fxswitch_common::{Currency, ErrorLog};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::FxResult;
use crate::provider::{request_currencies, RateProvider};
use crate::providers::http;
use crate::rates::RateSet;

/// Public YQL endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://query.yahooapis.com/v1/public/yql";

const QUERY_ENV: &str = "store://datatables.org/alltableswithkeys";

#[derive(Debug, Deserialize)]
struct YqlResponse {
    query: YqlQuery,
}

#[derive(Debug, Deserialize)]
struct YqlQuery {
    results: Option<YqlResults>,
}

#[derive(Debug, Deserialize)]
struct YqlResults {
    rate: OneOrMany<YqlRate>,
}

/// YQL collapses single-row results into a bare object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Deserialize)]
struct YqlRate {
    /// Pair such as `USDEUR`.
    id: String,
    #[serde(rename = "Rate")]
    rate: String,
}

/// Fetches rates through the `yahoo.finance.xchange` YQL table.
pub struct YahooFinanceProvider {
    client: Client,
    endpoint: String,
    native_base: Currency,
    enabled: Vec<Currency>,
}

impl YahooFinanceProvider {
    /// Create a provider from configuration.
    pub fn new(config: &ProviderConfig) -> FxResult<Self> {
        Ok(Self {
            client: http::client(config.request_timeout)?,
            endpoint: config
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            native_base: config.native_base.clone(),
            enabled: config.enabled_currencies(),
        })
    }

    fn query(&self, currencies: &[Currency]) -> String {
        let pairs = currencies
            .iter()
            .map(|c| format!("\"{}{}\"", self.native_base, c))
            .collect::<Vec<_>>()
            .join(",");
        format!("select * from yahoo.finance.xchange where pair in ({pairs})")
    }

    fn decode(&self, rows: Vec<YqlRate>) -> RateSet {
        let mut set = RateSet::new(self.native_base.clone());
        for row in rows {
            let Some(code) = row.id.strip_prefix(self.native_base.code()) else {
                warn!(pair = %row.id, "Skipping pair not quoted against the native base");
                continue;
            };
            let currency = Currency::new(code);
            let inserted = http::parse_rate(&row.rate)
                .map(|rate| set.insert(currency.clone(), rate));
            if !matches!(inserted, Some(Ok(()))) {
                warn!(currency = %currency, rate = %row.rate, "Skipping unusable rate");
            }
        }
        set
    }
}

#[async_trait]
impl RateProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        "Yahoo Finance"
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

        let query = [
            ("q", self.query(&currencies)),
            ("env", QUERY_ENV.to_string()),
            ("format", "json".to_string()),
        ];
        let (status, body) =
            http::get_json(&self.client, self.name(), &self.endpoint, &query, errors).await?;

        if let Some((code, message)) = http::remote_error(&body) {
            return Err(http::error_returned(self.name(), code, message, errors));
        }
        if !status.is_success() {
            return Err(http::unexpected_status(self.name(), status, errors));
        }

        let rows = match serde_json::from_value::<YqlResponse>(body) {
            Ok(YqlResponse {
                query: YqlQuery { results: Some(results) },
            }) => results.rate.into_vec(),
            Ok(_) => {
                http::unexpected_payload(self.name(), "query returned no results", errors);
                return Ok(RateSet::empty(self.native_base.clone()));
            }
            Err(e) => {
                http::unexpected_payload(self.name(), e, errors);
                return Ok(RateSet::empty(self.native_base.clone()));
            }
        };

        let set = self.decode(rows);
        debug!(provider = self.name(), count = set.len(), "Decoded rates");
        Ok(set)
    }
}
