//! Monitor binary
//!
//! Runs the bounded polling loop against the explorer API. Configuration is
//! plain environment variables with the usual defaults; Ctrl-C stops the
//! loop cleanly between cycles.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sidrascope_monitor::dedup::DedupStrategy;
use sidrascope_monitor::fetcher::{FetchConfig, HttpFetcher};
use sidrascope_monitor::monitor::{Monitor, MonitorConfig};
use sidrascope_monitor::store::{LedgerStore, DEFAULT_DATA_PATH};

/// Parse an env var, falling back to the default when unset or unparsable
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn dedup_strategy_from_env() -> DedupStrategy {
    match env::var("SIDRA_DEDUP").as_deref() {
        Ok("seen-set") => DedupStrategy::SeenSet,
        _ => DedupStrategy::TrailingHash,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let fetch_config = FetchConfig {
        base_url: env_or("SIDRA_BASE_URL", FetchConfig::default().base_url),
        limit: env_or("SIDRA_LIMIT", FetchConfig::default().limit),
        timeout: Duration::from_secs(env_or("SIDRA_TIMEOUT_SECS", 10)),
    };

    let config = MonitorConfig {
        interval: Duration::from_secs(env_or("SIDRA_INTERVAL_SECS", 10)),
        max_runs: env_or("SIDRA_MAX_RUNS", 5),
        value_threshold: env_or("SIDRA_VALUE_THRESHOLD", 1000.0),
        dedup_strategy: dedup_strategy_from_env(),
    };

    let data_path = env::var("SIDRA_DATA_PATH").unwrap_or_else(|_| DEFAULT_DATA_PATH.to_string());
    let store = LedgerStore::new(&data_path);

    let fetcher = match HttpFetcher::new(fetch_config) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!("Failed to build HTTP client: {e}");
            std::process::exit(1);
        }
    };

    info!(
        "Polling {} every {:?} for {} runs (threshold {}, data file {})",
        fetcher.endpoint(),
        config.interval,
        config.max_runs,
        config.value_threshold,
        data_path
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let monitor = Monitor::new(config, fetcher, store);
    let report = monitor.run(shutdown_rx).await;

    info!(
        "Final totals: value {:.4} across {} cycles, {} active addresses, {} alerts",
        report.total_value(),
        report.cycles_completed,
        report.address_counts.len(),
        report.alerts.len()
    );
}
