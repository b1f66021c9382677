//! Rate sets and rebasing.

use std::collections::BTreeMap;

use fxswitch_common::{now, Currency, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::{FxError, FxResult};

/// Exchange rates relative to a single base currency.
///
/// A non-empty set always holds its own base at exactly `1.0`. An empty set
/// means the provider had no data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RateSetData")]
pub struct RateSet {
    base: Currency,
    rates: BTreeMap<Currency, f64>,
    fetched_at: Timestamp,
}

/// Unchecked wire form of [`RateSet`].
#[derive(Deserialize)]
struct RateSetData {
    base: Currency,
    rates: BTreeMap<Currency, f64>,
    fetched_at: Timestamp,
}

impl TryFrom<RateSetData> for RateSet {
    type Error = FxError;

    fn try_from(data: RateSetData) -> FxResult<Self> {
        let mut set = if data.rates.is_empty() {
            Self::empty(data.base)
        } else {
            Self::from_rates(data.base, data.rates)?
        };
        set.fetched_at = data.fetched_at;
        Ok(set)
    }
}

impl RateSet {
    /// A set with no data at all.
    pub fn empty(base: Currency) -> Self {
        Self {
            base,
            rates: BTreeMap::new(),
            fetched_at: now(),
        }
    }

    /// A set holding only the base self-rate.
    pub fn new(base: Currency) -> Self {
        let mut set = Self::empty(base);
        set.rates.insert(set.base.clone(), 1.0);
        set
    }

    /// Build a set from `currency -> rate` pairs. The self-rate is added
    /// when missing.
    pub fn from_rates(
        base: Currency,
        rates: impl IntoIterator<Item = (Currency, f64)>,
    ) -> FxResult<Self> {
        let mut set = Self::new(base);
        for (currency, rate) in rates {
            set.insert(currency, rate)?;
        }
        Ok(set)
    }

    /// Insert or replace a rate.
    pub fn insert(&mut self, currency: Currency, rate: f64) -> FxResult<()> {
        let invalid = !rate.is_finite() || rate <= 0.0;
        if invalid || (currency == self.base && rate != 1.0) {
            return Err(FxError::InvalidRate { currency, rate });
        }
        self.rates.entry(self.base.clone()).or_insert(1.0);
        self.rates.insert(currency, rate);
        Ok(())
    }

    /// Rate for `currency`, if present.
    pub fn get(&self, currency: &Currency) -> Option<f64> {
        self.rates.get(currency).copied()
    }

    pub fn base(&self) -> &Currency {
        &self.base
    }

    /// When the underlying data was fetched from the provider.
    pub fn fetched_at(&self) -> Timestamp {
        self.fetched_at
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Currency, f64)> {
        self.rates.iter().map(|(c, r)| (c, *r))
    }

    pub fn contains(&self, currency: &Currency) -> bool {
        self.rates.contains_key(currency)
    }

    /// Re-express every rate relative to `target`.
    ///
    /// Each rate is divided by `self[target]`, so the result holds
    /// `target` at exactly `1.0`. No rounding is applied.
    pub fn rebase(&self, target: &Currency) -> FxResult<RateSet> {
        let pivot = self
            .get(target)
            .filter(|rate| rate.is_finite() && *rate > 0.0)
            .ok_or_else(|| FxError::BaseCurrencyNotFound(target.clone()))?;

        let rates = self
            .rates
            .iter()
            .map(|(currency, rate)| (currency.clone(), rate / pivot))
            .collect();

        Ok(RateSet {
            base: target.clone(),
            rates,
            fetched_at: self.fetched_at,
        })
    }
}
