//! fxswitch Refresher
//!
//! Runs single-flight exchange-rate refreshes against the configured
//! provider and lock backend, printing a JSON report per run.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fxswitch_common::Currency;
use fxswitch_fx::{ExchangeRateCache, ProviderConfig, RateRefresher, DEFAULT_LOCK_NAME};
use fxswitch_semaphore::SemaphoreConfig;

mod report;

use report::Report;

/// fxswitch exchange-rate refresher
#[derive(Parser, Debug)]
#[command(name = "refresher")]
#[command(about = "Refresh exchange rates under a process-external lock")]
struct Args {
    /// Base currency to express rates in (defaults to STORE_CURRENCY)
    #[arg(short, long)]
    base: Option<String>,

    /// Comma separated currencies to request (overrides ENABLED_CURRENCIES)
    #[arg(short, long)]
    currencies: Option<String>,

    /// Name of the refresh lock
    #[arg(long, default_value = DEFAULT_LOCK_NAME)]
    lock_name: String,

    /// Refresh every N seconds (0 = run once)
    #[arg(long, default_value = "0")]
    interval_secs: u64,

    /// Node ID reported in output (random if absent)
    #[arg(long)]
    node_id: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    // Load configuration
    let lock_config = SemaphoreConfig::from_env()?;
    if let Err(e) = lock_config.validate() {
        error!(error = %e, "Invalid lock configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let mut provider_config = ProviderConfig::from_env()?;
    if let Some(list) = &args.currencies {
        provider_config.enabled_currencies = Currency::parse_list(list);
    }
    if let Err(e) = provider_config.validate() {
        error!(error = %e, "Invalid provider configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let base = args
        .base
        .as_deref()
        .map(Currency::new)
        .unwrap_or_else(|| provider_config.store_currency.clone());
    if !base.is_well_formed() {
        return Err(anyhow::anyhow!("Invalid base currency: '{}'", base));
    }

    let node_id = args
        .node_id
        .clone()
        .unwrap_or_else(|| format!("refresher-{}", uuid::Uuid::new_v4()));

    info!(
        node_id = %node_id,
        provider = ?provider_config.kind,
        lock_backend = ?lock_config.backend,
        base = %base,
        "Starting fxswitch refresher"
    );

    let locks = lock_config.connect().await?;
    let provider = provider_config.build()?;
    let cache = Arc::new(ExchangeRateCache::new(provider));
    let refresher = RateRefresher::new(cache, locks).with_lock_name(args.lock_name.clone());

    if args.interval_secs == 0 {
        run_once(&refresher, &node_id, &base).await?;
        return Ok(());
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval_secs));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = run_once(&refresher, &node_id, &base).await {
                    error!(error = %e, "Refresh run failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!(node_id = %node_id, "Refresher shutdown complete");
    Ok(())
}

async fn run_once(refresher: &RateRefresher, node_id: &str, base: &Currency) -> anyhow::Result<()> {
    let outcome = refresher.refresh(base).await?;
    let report = Report::new(node_id, base, outcome);

    info!(status = ?report.status, rates = report.rates.len(), "Refresh finished");
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}
