//! Threshold Alerts
//!
//! Flags transactions whose display-unit value strictly exceeds a configured
//! threshold. Pure evaluation, no side effects.

use crate::fetcher::LedgerTransaction;

/// Default alert cutoff, in display units
pub const DEFAULT_VALUE_THRESHOLD: f64 = 1000.0;

/// Return one human-readable alert per qualifying transaction, in batch order
pub fn check_alerts(batch: &[LedgerTransaction], value_threshold: f64) -> Vec<String> {
    batch
        .iter()
        .filter(|tx| tx.scaled_value() > value_threshold)
        .map(|tx| {
            format!(
                "ALERT: Large Tx {} - Value: {:.4} from {}",
                tx.hash,
                tx.scaled_value(),
                tx.from_address
            )
        })
        .collect()
}
