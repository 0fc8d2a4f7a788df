//! Sidrascope Monitor Library
//!
//! This crate provides components for polling a blockchain explorer's
//! transactions API, aggregating running totals, raising large-transfer
//! alerts, and persisting the accumulator to a local JSON file.

pub mod aggregator;
pub mod alerts;
pub mod dedup;
pub mod fetcher;
pub mod monitor;
pub mod store;

// Re-export commonly used types
pub use aggregator::{aggregate, CycleIncrement};
pub use alerts::{check_alerts, DEFAULT_VALUE_THRESHOLD};
pub use dedup::{DedupStrategy, Deduplicator};
pub use fetcher::{FetchConfig, FetchError, HttpFetcher, LedgerTransaction, TransactionSource};
pub use monitor::{Monitor, MonitorConfig, MonitorReport};
pub use store::{LedgerState, LedgerStore, PersistenceError};
