//! Monitor Loop
//!
//! Orchestrates fetch → dedup → aggregate → alert → persist on a fixed
//! interval for a bounded number of cycles. Transient failures (HTTP status,
//! timeout, decode, persistence) are logged and answered with a doubled
//! sleep; the loop only terminates after `max_runs` cycles or on the
//! cancellation signal.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::sleep_until;
use tracing::{info, warn};

use crate::aggregator::aggregate;
use crate::alerts::{check_alerts, DEFAULT_VALUE_THRESHOLD};
use crate::dedup::{DedupStrategy, Deduplicator};
use crate::fetcher::{FetchError, TransactionSource};
use crate::store::{LedgerStore, PersistenceError};

/// Default seconds between polls
pub const DEFAULT_INTERVAL_SECS: u64 = 10;

/// Default cycle cap
pub const DEFAULT_MAX_RUNS: u32 = 5;

/// Errors surfaced by a single cycle; all are treated as transient
#[derive(Error, Debug)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Configuration for the monitor loop
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Sleep between cycles
    pub interval: Duration,
    /// Number of cycles before the loop terminates
    pub max_runs: u32,
    /// Alert cutoff in display units
    pub value_threshold: f64,
    /// Deduplication strategy for fetched batches
    pub dedup_strategy: DedupStrategy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            max_runs: DEFAULT_MAX_RUNS,
            value_threshold: DEFAULT_VALUE_THRESHOLD,
            dedup_strategy: DedupStrategy::default(),
        }
    }
}

/// Process-local accumulator returned when the loop terminates
///
/// Distinct from the on-disk accumulator, which persists across restarts;
/// this one starts empty at every process start.
#[derive(Debug, Clone, Default)]
pub struct MonitorReport {
    /// One entry per cycle that processed new transactions
    pub value_history: Vec<f64>,
    /// Transactions counted per sender address this run
    pub address_counts: HashMap<String, u64>,
    /// Alert lines emitted this run, in order
    pub alerts: Vec<String>,
    /// Cycles executed, including failed and empty ones
    pub cycles_completed: u32,
}

impl MonitorReport {
    /// Sum of per-cycle totals
    pub fn total_value(&self) -> f64 {
        self.value_history.iter().sum()
    }
}

/// What a single cycle did
enum CycleOutcome {
    Processed,
    NothingNew,
}

/// Bounded polling monitor over a transaction source
pub struct Monitor<S> {
    config: MonitorConfig,
    source: S,
    dedup: Deduplicator,
    store: LedgerStore,
}

impl<S: TransactionSource> Monitor<S> {
    pub fn new(config: MonitorConfig, source: S, store: LedgerStore) -> Self {
        let dedup = Deduplicator::new(config.dedup_strategy);
        Self {
            config,
            source,
            dedup,
            store,
        }
    }

    /// Run up to `max_runs` cycles, observing `shutdown` between cycles and
    /// during sleeps, and return the in-memory accumulator
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> MonitorReport {
        let mut report = MonitorReport::default();

        while report.cycles_completed < self.config.max_runs {
            if *shutdown.borrow() {
                info!("Shutdown requested, stopping monitor");
                break;
            }

            let delay = match self.cycle(&mut report).await {
                Ok(_) => self.config.interval,
                Err(e) => {
                    warn!("Cycle failed: {e}");
                    self.config.interval * 2
                }
            };

            report.cycles_completed += 1;
            if report.cycles_completed >= self.config.max_runs {
                break;
            }

            let deadline = tokio::time::Instant::now() + delay;
            let mut stop_requested = false;
            tokio::select! {
                _ = sleep_until(deadline) => {}
                res = shutdown.wait_for(|stop| *stop) => {
                    stop_requested = res.is_ok();
                }
            }
            if stop_requested {
                info!("Shutdown requested, stopping monitor");
                break;
            }
            // No-op when the sleep already ran out; finishes the wait when
            // the shutdown sender is gone and can never fire
            sleep_until(deadline).await;
        }

        info!(
            "Monitor done after {} cycles: total value {:.4}, {} active addresses",
            report.cycles_completed,
            report.total_value(),
            report.address_counts.len()
        );
        report
    }

    /// One fetch → dedup → aggregate → alert → persist pass
    async fn cycle(&mut self, report: &mut MonitorReport) -> Result<CycleOutcome, CycleError> {
        let batch = self.source.fetch_latest().await?;
        if batch.is_empty() {
            info!("No transactions returned");
            return Ok(CycleOutcome::NothingNew);
        }

        let fresh = self.dedup.filter_new(&batch);
        if fresh.is_empty() {
            info!("No new transactions");
            return Ok(CycleOutcome::NothingNew);
        }

        let alerts = check_alerts(&fresh, self.config.value_threshold);
        let increment = aggregate(&fresh);

        report.value_history.push(increment.total_value);
        for (address, count) in &increment.address_counts {
            *report.address_counts.entry(address.clone()).or_insert(0) += count;
        }

        info!(
            "Run {}: Total Value: {:.4}, Active Addresses: {}",
            report.cycles_completed,
            report.total_value(),
            report.address_counts.len()
        );
        for alert in &alerts {
            warn!("{alert}");
        }
        report.alerts.extend(alerts);

        // Persist only the cycle's delta; the file accumulates across runs
        self.store.merge(&increment.into_state())?;

        Ok(CycleOutcome::Processed)
    }
}
