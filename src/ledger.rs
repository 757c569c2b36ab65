use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use crate::types::{Currency, LedgerEntry};

#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    /// The entry's id is already ledgered. Callers must check
    /// [`Ledger::contains`] first; hitting this indicates a logic error
    /// upstream, not a recoverable condition.
    #[error("duplicate ledger entry {0}")]
    DuplicateEntry(String),
}

/// Deduplicated record of every offer ever successfully notified, plus the
/// running total of value saved per currency.
///
/// Entries are append-only and keep insertion order (= discovery order);
/// nothing transitions out once recorded. The id index makes membership
/// checks O(1) regardless of ledger age.
#[derive(Debug, Default, Clone)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
    ids: HashSet<String>,
    totals: BTreeMap<Currency, f64>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Membership test against all known entries.
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Append an entry and fold its amount into the per-currency totals.
    pub fn record(&mut self, entry: LedgerEntry) -> Result<(), LedgerError> {
        if !self.ids.insert(entry.id.clone()) {
            return Err(LedgerError::DuplicateEntry(entry.id));
        }
        *self.totals.entry(entry.currency).or_insert(0.0) += entry.amount;
        self.entries.push(entry);
        Ok(())
    }

    /// Entries in discovery order.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Cumulative amount saved per currency, maintained incrementally as
    /// entries are recorded.
    pub fn totals(&self) -> &BTreeMap<Currency, f64> {
        &self.totals
    }

    /// Totals folded from scratch over all entries. Must always agree with
    /// [`Ledger::totals`]; exists so that agreement can be asserted.
    pub fn recomputed_totals(&self) -> BTreeMap<Currency, f64> {
        let mut totals = BTreeMap::new();
        for entry in &self.entries {
            *totals.entry(entry.currency).or_insert(0.0) += entry.amount;
        }
        totals
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
