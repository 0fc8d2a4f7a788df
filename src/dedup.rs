//! Batch Deduplication
//!
//! Filters out transactions already processed in a prior cycle. The historic
//! behavior compares each transaction against only the single most recently
//! seen hash, so duplicates separated by another transaction slip through;
//! that behavior is kept as the default strategy, with a full seen-set
//! alternative available for callers that want exact suppression.

use std::collections::HashSet;

use crate::fetcher::LedgerTransaction;

/// How previously seen transactions are recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupStrategy {
    /// Compare against the single most recently seen hash only.
    ///
    /// A transaction whose hash equals the trailing hash is dropped; anything
    /// else passes and becomes the new trailing hash. Duplicates separated by
    /// an intervening transaction are NOT suppressed, and a legitimate repeat
    /// of the trailing hash is.
    #[default]
    TrailingHash,
    /// Remember every hash ever yielded and suppress all repeats.
    SeenSet,
}

/// Stateful filter over fetched batches
#[derive(Debug, Default)]
pub struct Deduplicator {
    strategy: DedupStrategy,
    last_seen: Option<String>,
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new(strategy: DedupStrategy) -> Self {
        Self {
            strategy,
            last_seen: None,
            seen: HashSet::new(),
        }
    }

    /// The active strategy
    pub fn strategy(&self) -> DedupStrategy {
        self.strategy
    }

    /// Hash of the last transaction yielded, if any
    pub fn last_seen_hash(&self) -> Option<&str> {
        self.last_seen.as_deref()
    }

    /// Return the subsequence of `batch` not yet processed, in fetch order
    ///
    /// Updates the internal cursor as transactions are yielded: in trailing
    /// mode the cursor follows each yielded hash, so after the call it holds
    /// the hash of the last transaction processed.
    pub fn filter_new(&mut self, batch: &[LedgerTransaction]) -> Vec<LedgerTransaction> {
        let mut fresh = Vec::new();

        for tx in batch {
            let is_new = match self.strategy {
                DedupStrategy::TrailingHash => self.last_seen.as_deref() != Some(tx.hash.as_str()),
                DedupStrategy::SeenSet => !self.seen.contains(&tx.hash),
            };

            if !is_new {
                continue;
            }

            self.last_seen = Some(tx.hash.clone());
            if self.strategy == DedupStrategy::SeenSet {
                self.seen.insert(tx.hash.clone());
            }
            fresh.push(tx.clone());
        }

        fresh
    }
}
