use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use crate::monitoring::domain::violation::{Violation, ViolationCategory};

/// Snapshot of accepted violations: chronological history plus per-category counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub violations: Vec<Violation>,
    pub counts_by_category: BTreeMap<ViolationCategory, usize>,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            violations: Vec::new(),
            counts_by_category: ViolationCategory::ALL.iter().map(|&c| (c, 0)).collect(),
        }
    }

    pub fn count(&self, category: ViolationCategory) -> usize {
        self.counts_by_category.get(&category).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.violations.len()
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

/// Append-only store of accepted violations, owned by the detection loop.
///
/// Only the owner can record or clear. Everyone else reads through a
/// `StatsView`.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    inner: Arc<Mutex<Stats>>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, violation: Violation) {
        let mut stats = lock(&self.inner);
        *stats.counts_by_category.entry(violation.category).or_insert(0) += 1;
        stats.violations.push(violation);
    }

    pub(crate) fn clear(&self) {
        *lock(&self.inner) = Stats::new();
    }

    pub fn snapshot(&self) -> Stats {
        lock(&self.inner).clone()
    }

    /// Read-only handle sharing this aggregator's storage.
    pub fn view(&self) -> StatsView {
        StatsView {
            inner: self.inner.clone(),
        }
    }
}

/// Read-only handle onto a `StatsAggregator`; sees every later record.
#[derive(Debug, Clone)]
pub struct StatsView {
    inner: Arc<Mutex<Stats>>,
}

impl StatsView {
    pub fn snapshot(&self) -> Stats {
        lock(&self.inner).clone()
    }
}

fn lock(inner: &Mutex<Stats>) -> MutexGuard<'_, Stats> {
    // Records are single pushes; a poisoned lock still holds consistent stats.
    inner.lock().unwrap_or_else(|e| e.into_inner())
}
