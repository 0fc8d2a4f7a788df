//! Batch Aggregation
//!
//! Folds a deduplicated batch into a per-cycle increment: summed transferred
//! value in display units and per-sender transaction counts.

use std::collections::HashMap;

use crate::fetcher::LedgerTransaction;
use crate::store::LedgerState;

/// Aggregate delta produced by one cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleIncrement {
    /// Sum of `value / 1e18` across the batch
    pub total_value: f64,
    /// Number of transactions per sender address in the batch
    pub address_counts: HashMap<String, u64>,
}

impl CycleIncrement {
    /// Convert into the persistable state shape (one value-history entry)
    pub fn into_state(self) -> LedgerState {
        LedgerState {
            value_history: vec![self.total_value],
            address_counts: self.address_counts,
        }
    }
}

/// Fold a batch into an increment
pub fn aggregate(batch: &[LedgerTransaction]) -> CycleIncrement {
    let mut increment = CycleIncrement::default();

    for tx in batch {
        increment.total_value += tx.scaled_value();
        *increment
            .address_counts
            .entry(tx.from_address.clone())
            .or_insert(0) += 1;
    }

    increment
}
