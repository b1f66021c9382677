//! JSON report printed after each refresh.

use std::collections::BTreeMap;

use fxswitch_common::{now, Currency, ErrorRecord, Timestamp};
use fxswitch_fx::RefreshOutcome;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Refreshed,
    Skipped,
    Failed,
}

/// Outcome of one refresh, as printed to stdout.
#[derive(Debug, Serialize)]
pub struct Report {
    pub node_id: String,
    pub status: Status,
    pub base: Currency,
    pub rates: BTreeMap<String, f64>,
    pub fetched_at: Option<Timestamp>,
    pub errors: Vec<ErrorRecord>,
    pub reported_at: Timestamp,
}

impl Report {
    pub fn new(node_id: &str, base: &Currency, outcome: RefreshOutcome) -> Self {
        let mut report = Self {
            node_id: node_id.to_string(),
            status: Status::Skipped,
            base: base.clone(),
            rates: BTreeMap::new(),
            fetched_at: None,
            errors: Vec::new(),
            reported_at: now(),
        };

        match outcome {
            RefreshOutcome::Refreshed(rates) => {
                report.status = Status::Refreshed;
                report.fetched_at = Some(rates.fetched_at());
                report.rates = rates
                    .iter()
                    .map(|(currency, rate)| (currency.code().to_string(), rate))
                    .collect();
            }
            RefreshOutcome::Skipped => {}
            RefreshOutcome::Failed(errors) => {
                report.status = Status::Failed;
                report.errors = errors;
            }
        }

        report
    }
}
