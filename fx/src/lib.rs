//! fxswitch FX
//!
//! Exchange-rate acquisition and normalization.
//!
//! # Features
//!
//! - Pluggable remote rate providers selected by configuration
//! - Rebasing of a fetched rate set onto any base currency
//! - Single-slot caching keyed on the requested base currency
//! - Single-flight refresh across processes through a named semaphore
//!
//! Failures are returned as values and recorded in an error log; nothing
//! here panics or aborts the host.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fxswitch_common::Currency;
//! use fxswitch_fx::{ExchangeRateCache, ProviderConfig};
//!
//! let provider = ProviderConfig::from_env()?.build()?;
//! let cache = ExchangeRateCache::new(provider);
//!
//! match cache.get_rate(&Currency::eur(), &Currency::usd()).await {
//!     Some(rate) => println!("1 EUR = {rate} USD"),
//!     None => eprintln!("{:?}", cache.errors()),
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod provider;
pub mod providers;
pub mod rates;
pub mod refresh;

pub use cache::ExchangeRateCache;
pub use config::{ProviderConfig, ProviderKind};
pub use error::{FxError, FxResult};
pub use provider::RateProvider;
#[cfg(any(test, feature = "test-utils"))]
pub use provider::StaticRateProvider;
pub use providers::{OpenExchangeRatesProvider, YahooFinanceProvider};
pub use rates::RateSet;
pub use refresh::{RateRefresher, RefreshOutcome, DEFAULT_LOCK_NAME};
