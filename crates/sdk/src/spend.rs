//! Session-scoped tracking of outputs consumed by local transactions.
//!
//! Every transaction this process broadcasts marks its inputs as spent
//! before the next selection runs, so unconfirmed spends are never picked
//! twice. Entries are never removed: confirmation status is re-derived from
//! the chain on the next start.

use std::collections::HashSet;
use std::sync::RwLock;

use bitcoin::{OutPoint, Transaction};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Record of outputs spent by locally constructed transactions.
///
/// One store per session (wallet). Callers must not run two mutating
/// operations against the same store concurrently.
pub trait SpendStore: Send + Sync {
    /// Record `outpoint` as consumed.
    fn mark_spent(&self, outpoint: OutPoint);

    /// Returns `false` if `outpoint` has been recorded as consumed.
    fn is_unspent(&self, outpoint: &OutPoint) -> bool;

    /// Number of recorded spends.
    fn spent_count(&self) -> usize;
}

/// Mark every input of a broadcast transaction as spent.
pub fn record_transaction(store: &impl SpendStore, tx: &Transaction) {
    for input in &tx.input {
        store.mark_spent(input.previous_output);
    }
}

// ---------------------------------------------------------------------------
// InMemorySpendStore
// ---------------------------------------------------------------------------

/// In-memory spend store backed by `RwLock<HashSet>`.
pub struct InMemorySpendStore {
    spent: RwLock<HashSet<OutPoint>>,
}

impl InMemorySpendStore {
    /// Creates an empty spend store.
    pub fn new() -> Self {
        Self {
            spent: RwLock::new(HashSet::new()),
        }
    }
}

impl Default for InMemorySpendStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SpendStore for InMemorySpendStore {
    fn mark_spent(&self, outpoint: OutPoint) {
        self.spent.write().unwrap().insert(outpoint);
    }

    fn is_unspent(&self, outpoint: &OutPoint) -> bool {
        !self.spent.read().unwrap().contains(outpoint)
    }

    fn spent_count(&self) -> usize {
        self.spent.read().unwrap().len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
