//! Coverage Snapshots
//!
//! An immutable, point-in-time copy of hit counts. Only probes with at least
//! one hit are stored; an absent probe reads as zero.

use super::ProbeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Point-in-time hit counts keyed by probe id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSnapshot {
    counts: BTreeMap<ProbeId, u64>,
}

impl CoverageSnapshot {
    /// An empty snapshot (the identity for [`merge`](Self::merge))
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Hit count for a probe (0 when absent)
    #[must_use]
    pub fn count(&self, id: ProbeId) -> u64 {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    /// Whether a probe was hit at least once
    #[must_use]
    pub fn is_covered(&self, id: ProbeId) -> bool {
        self.count(id) > 0
    }

    /// Number of probes with at least one hit
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether nothing was hit
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all hit counts
    #[must_use]
    pub fn total_hits(&self) -> u64 {
        self.counts.values().fold(0u64, |acc, c| acc.saturating_add(*c))
    }

    /// Iterate `(probe, count)` in probe id order
    pub fn iter(&self) -> impl Iterator<Item = (ProbeId, u64)> + '_ {
        self.counts.iter().map(|(id, c)| (*id, *c))
    }

    /// Pointwise sum over the union of probe ids
    ///
    /// Associative and commutative; the empty snapshot is its identity.
    #[must_use]
    pub fn merge(a: &Self, b: &Self) -> Self {
        let mut merged = a.clone();
        merged.absorb(b);
        merged
    }

    /// Add every count of `other` into `self`
    pub fn absorb(&mut self, other: &Self) {
        for (id, count) in other.iter() {
            self.add(id, count);
        }
    }

    /// Counts accumulated since `baseline` was taken
    ///
    /// Counters never decrease, so each entry is `self - baseline`; probes
    /// that did not move are dropped.
    #[must_use]
    pub fn delta_since(&self, baseline: &Self) -> Self {
        self.iter()
            .map(|(id, count)| (id, count.saturating_sub(baseline.count(id))))
            .collect()
    }

    /// Rewrite probe ids, summing entries that land on the same target
    ///
    /// Entries for which `map` returns `None` are dropped.
    #[must_use]
    pub fn remap<F>(&self, mut map: F) -> Self
    where
        F: FnMut(ProbeId) -> Option<ProbeId>,
    {
        self.iter()
            .filter_map(|(id, count)| map(id).map(|to| (to, count)))
            .collect()
    }

    fn add(&mut self, id: ProbeId, count: u64) {
        if count == 0 {
            return;
        }
        let slot = self.counts.entry(id).or_insert(0);
        *slot = slot.saturating_add(count);
    }
}

impl FromIterator<(ProbeId, u64)> for CoverageSnapshot {
    fn from_iter<I: IntoIterator<Item = (ProbeId, u64)>>(iter: I) -> Self {
        let mut snapshot = Self::empty();
        for (id, count) in iter {
            snapshot.add(id, count);
        }
        snapshot
    }
}
