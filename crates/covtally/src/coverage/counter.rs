//! Hit Counter
//!
//! The only mutable structure shared between execution threads. One atomic
//! slot per registered probe; increments take a shared gate, snapshots take it
//! exclusively for a single copy pass. An increment is therefore either fully
//! in a snapshot or fully absent from it.
//!
//! Hot loops can borrow a [`LocalHits`] buffer instead, which accumulates in
//! plain integers and flushes in one gated batch.

use super::{CoverageSnapshot, ProbeId, ProbeRegistry};
use crate::result::{CovError, CovResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Default number of buffered hits before a [`LocalHits`] flushes itself
pub const DEFAULT_FLUSH_THRESHOLD: usize = 1000;

/// Concurrency-safe hit counts for a frozen registry
#[derive(Debug)]
pub struct HitCounter {
    registry: Arc<ProbeRegistry>,
    slots: Vec<AtomicU64>,
    /// Shared for increments, exclusive for snapshots
    gate: RwLock<()>,
}

impl HitCounter {
    /// Freeze `registry` and allocate one slot per probe
    #[must_use]
    pub fn new(mut registry: ProbeRegistry) -> Self {
        registry.freeze();
        let slots = (0..registry.len()).map(|_| AtomicU64::new(0)).collect();
        Self {
            registry: Arc::new(registry),
            slots,
            gate: RwLock::new(()),
        }
    }

    /// Record one hit
    ///
    /// # Errors
    ///
    /// `UnknownProbe` if `id` is not in the registry.
    #[inline]
    pub fn increment(&self, id: ProbeId) -> CovResult<()> {
        self.add(id, 1)
    }

    /// Record `n` hits at once
    ///
    /// # Errors
    ///
    /// `UnknownProbe` if `id` is not in the registry.
    pub fn add(&self, id: ProbeId, n: u64) -> CovResult<()> {
        let slot = self.slot(id)?;
        let _shared = self.gate.read().unwrap_or_else(PoisonError::into_inner);
        bump(slot, n);
        Ok(())
    }

    /// Current count for a probe (0 for unknown ids)
    #[must_use]
    pub fn get(&self, id: ProbeId) -> u64 {
        self.slots
            .get(id.index())
            .map_or(0, |slot| slot.load(Ordering::Relaxed))
    }

    /// Consistent copy of every non-zero count
    #[must_use]
    pub fn snapshot(&self) -> CoverageSnapshot {
        let _exclusive = self.gate.write().unwrap_or_else(PoisonError::into_inner);
        self.slots
            .iter()
            .enumerate()
            .map(|(idx, slot)| (ProbeId::new(idx as u32), slot.load(Ordering::Relaxed)))
            .collect()
    }

    /// Borrow a thread-local buffer that flushes into this counter
    #[must_use]
    pub fn local(&self) -> LocalHits<'_> {
        LocalHits::with_flush_threshold(self, DEFAULT_FLUSH_THRESHOLD)
    }

    /// The frozen registry this counter was built from
    #[must_use]
    pub fn registry(&self) -> &Arc<ProbeRegistry> {
        &self.registry
    }

    /// Number of probe slots
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether there are no probes at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, id: ProbeId) -> CovResult<&AtomicU64> {
        self.slots
            .get(id.index())
            .ok_or(CovError::UnknownProbe { id })
    }

    /// Apply a batch of dense counts under one shared gate
    fn add_batch(&self, counts: &[u64]) {
        let _shared = self.gate.read().unwrap_or_else(PoisonError::into_inner);
        for (slot, &n) in self.slots.iter().zip(counts) {
            if n > 0 {
                bump(slot, n);
            }
        }
    }
}

#[inline]
fn bump(slot: &AtomicU64, n: u64) {
    // Closure always returns Some, so this cannot fail.
    let _ = slot.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
        Some(c.saturating_add(n))
    });
}

/// Per-thread hit buffer
///
/// Counts locally without touching shared atomics and flushes into the
/// parent [`HitCounter`] once `flush_threshold` hits are pending, on
/// [`flush`](Self::flush), and on drop.
#[derive(Debug)]
pub struct LocalHits<'a> {
    counter: &'a HitCounter,
    local: Vec<u64>,
    flush_threshold: usize,
    pending: usize,
    flush_count: usize,
}

impl<'a> LocalHits<'a> {
    /// Create a buffer with a custom flush threshold (0 behaves as 1)
    #[must_use]
    pub fn with_flush_threshold(counter: &'a HitCounter, threshold: usize) -> Self {
        Self {
            counter,
            local: vec![0; counter.len()],
            flush_threshold: threshold.max(1),
            pending: 0,
            flush_count: 0,
        }
    }

    /// Buffer one hit
    ///
    /// # Errors
    ///
    /// `UnknownProbe` if `id` is not in the registry; nothing is buffered.
    #[inline]
    pub fn record(&mut self, id: ProbeId) -> CovResult<()> {
        let slot = self
            .local
            .get_mut(id.index())
            .ok_or(CovError::UnknownProbe { id })?;
        *slot = slot.saturating_add(1);
        self.pending += 1;
        if self.pending >= self.flush_threshold {
            self.flush();
        }
        Ok(())
    }

    /// Push buffered hits to the shared counter
    pub fn flush(&mut self) {
        if self.pending == 0 {
            return;
        }
        self.counter.add_batch(&self.local);
        self.local.fill(0);
        self.pending = 0;
        self.flush_count += 1;
    }

    /// Hits buffered since the last flush
    #[must_use]
    pub const fn pending(&self) -> usize {
        self.pending
    }

    /// Number of flushes performed so far
    #[must_use]
    pub const fn flush_count(&self) -> usize {
        self.flush_count
    }

    /// The flush threshold
    #[must_use]
    pub const fn flush_threshold(&self) -> usize {
        self.flush_threshold
    }
}

impl Drop for LocalHits<'_> {
    fn drop(&mut self) {
        self.flush();
    }
}
