//! Persistent Accumulator
//!
//! Merges per-cycle increments into a JSON file that accumulates history
//! across process restarts. Loading fails open: an absent or malformed file
//! resets to the empty default rather than erroring. The merge is a plain
//! read-modify-write with no cross-process locking; concurrent writers can
//! lose updates, which is acceptable for single-process use.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default accumulator file path
pub const DEFAULT_DATA_PATH: &str = "sidra_ledger_data.json";

/// Errors that can occur while persisting the accumulator
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize ledger state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Running totals accumulated across cycles and restarts
///
/// `value_history` only appends and `address_counts` only increase; the same
/// shape doubles as a single cycle's increment when merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    #[serde(default)]
    pub value_history: Vec<f64>,
    #[serde(default)]
    pub address_counts: HashMap<String, u64>,
}

impl LedgerState {
    /// Fold an increment into this state: history concatenation, count-wise
    /// sum with missing keys defaulting to zero
    pub fn absorb(&mut self, increment: &LedgerState) {
        self.value_history
            .extend(increment.value_history.iter().copied());
        for (address, count) in &increment.address_counts {
            *self.address_counts.entry(address.clone()).or_insert(0) += count;
        }
    }

    /// Sum of all value-history entries
    pub fn total_value(&self) -> f64 {
        self.value_history.iter().sum()
    }
}

/// JSON-file-backed accumulator store
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_PATH)
    }
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current state, resetting to empty if the file is absent or
    /// does not parse
    pub fn load(&self) -> LedgerState {
        match fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => LedgerState::default(),
        }
    }

    /// Merge an increment into the stored state and write it back
    ///
    /// Read-modify-write without locking. Returns the merged state.
    pub fn merge(&self, increment: &LedgerState) -> Result<LedgerState, PersistenceError> {
        let mut state = self.load();
        state.absorb(increment);

        let json = serde_json::to_string_pretty(&state)?;
        fs::write(&self.path, json).map_err(|source| PersistenceError::Write {
            path: self.path.display().to_string(),
            source,
        })?;

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> LedgerStore {
        LedgerStore::new(dir.path().join("ledger.json"))
    }

    fn state(history: &[f64], counts: &[(&str, u64)]) -> LedgerState {
        LedgerState {
            value_history: history.to_vec(),
            address_counts: counts
                .iter()
                .map(|(a, c)| (a.to_string(), *c))
                .collect(),
        }
    }

    // ==================== load tests ====================

    #[test]
    fn test_load_missing_file_returns_default() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let state = store.load();
        assert!(state.value_history.is_empty());
        assert!(state.address_counts.is_empty());
    }

    #[test]
    fn test_load_malformed_file_returns_default() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "{ this is not json").unwrap();

        assert_eq!(store.load(), LedgerState::default());
    }

    #[test]
    fn test_load_tolerates_missing_keys() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), r#"{"value_history": [1.5]}"#).unwrap();

        let state = store.load();
        assert_eq!(state.value_history, vec![1.5]);
        assert!(state.address_counts.is_empty());
    }

    // ==================== merge tests ====================

    #[test]
    fn test_merge_into_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let merged = store
            .merge(&state(&[10.5], &[("0x123", 2)]))
            .unwrap();
        assert_eq!(merged.value_history, vec![10.5]);
        assert_eq!(merged.address_counts.get("0x123"), Some(&2));
    }

    #[test]
    fn test_merge_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.merge(&state(&[10.5], &[("0x123", 2)])).unwrap();
        let merged = store
            .merge(&state(&[5.0], &[("0x123", 1), ("0x456", 3)]))
            .unwrap();

        assert_eq!(merged.value_history, vec![10.5, 5.0]);
        assert_eq!(merged.address_counts.get("0x123"), Some(&3));
        assert_eq!(merged.address_counts.get("0x456"), Some(&3));

        // And the reloaded file agrees
        assert_eq!(store.load(), merged);
    }

    #[test]
    fn test_merge_is_associative_across_calls() {
        let i1 = state(&[1.0, 2.0], &[("0xa", 1)]);
        let i2 = state(&[3.0], &[("0xa", 2), ("0xb", 5)]);

        // Two sequential merges
        let dir = TempDir::new().unwrap();
        let sequential = store_in(&dir);
        sequential.merge(&i1).unwrap();
        let merged_seq = sequential.merge(&i2).unwrap();

        // One merge of the pre-combined increment
        let mut combined = i1.clone();
        combined.absorb(&i2);
        let dir2 = TempDir::new().unwrap();
        let single = store_in(&dir2);
        let merged_once = single.merge(&combined).unwrap();

        assert_eq!(merged_seq, merged_once);
    }

    #[test]
    fn test_merge_write_failure_is_error() {
        // Directory path cannot be written as a file
        let dir = TempDir::new().unwrap();
        let store = LedgerStore::new(dir.path());

        let result = store.merge(&state(&[1.0], &[]));
        assert!(matches!(result, Err(PersistenceError::Write { .. })));
    }

    #[test]
    fn test_merge_overwrites_malformed_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "garbage").unwrap();

        let merged = store.merge(&state(&[2.5], &[("0xa", 1)])).unwrap();
        assert_eq!(merged.value_history, vec![2.5]);
        assert_eq!(store.load(), merged);
    }

    // ==================== LedgerState tests ====================

    #[test]
    fn test_total_value_sums_history() {
        let s = state(&[10.5, 5.0, 0.5], &[]);
        assert!((s.total_value() - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_default_store_path() {
        assert_eq!(LedgerStore::default().path(), Path::new(DEFAULT_DATA_PATH));
    }
}
