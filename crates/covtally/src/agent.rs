//! Coverage Agent
//!
//! The notify boundary. Instrumented code calls [`CoverageAgent::notify_hit`]
//! and nothing that goes wrong in the engine ever reaches it: unknown probes
//! are logged and counted here. In strict mode the first one is latched and
//! fails [`teardown`](CoverageAgent::teardown) instead.
//!
//! There is no global agent. The embedding test harness creates one, shares
//! it (usually behind an `Arc`) with the code under test and tears it down
//! explicitly.

use crate::config::{AgentConfig, ErrorMode};
use crate::coverage::{
    CoverageReport, CoverageSnapshot, ExecutionTracker, HitCounter, Instrumenter, LocalHits,
    ProbeId, ProbeRegistry, ReportBuilder, RunRecord, SessionHandle,
};
use crate::result::{CovError, CovResult};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// Owner of the counter store for one instrumented process
#[derive(Debug)]
pub struct CoverageAgent {
    config: AgentConfig,
    tracker: ExecutionTracker,
    anomalies: AtomicU64,
    strict_failure: OnceLock<ProbeId>,
}

impl CoverageAgent {
    /// Initialize over a populated registry; the registry is frozen here
    #[must_use]
    pub fn new(registry: ProbeRegistry, config: AgentConfig) -> Self {
        let counter = Arc::new(HitCounter::new(registry));
        debug!(
            probes = counter.len(),
            mode = ?config.error_mode,
            "coverage agent initialised"
        );
        Self {
            tracker: ExecutionTracker::new(counter, config.snapshot_mode),
            config,
            anomalies: AtomicU64::new(0),
            strict_failure: OnceLock::new(),
        }
    }

    /// Run an instrumenter into a fresh registry and initialize over it
    ///
    /// # Errors
    ///
    /// Whatever the instrumenter reports; `DuplicateLocation` is fatal here.
    pub fn instrument<I: Instrumenter + ?Sized>(
        instrumenter: &I,
        config: AgentConfig,
    ) -> CovResult<Self> {
        let mut registry = ProbeRegistry::new();
        let _ = instrumenter.instrument(&mut registry)?;
        Ok(Self::new(registry, config))
    }

    /// Record a hit. Never fails and never panics.
    #[inline]
    pub fn notify_hit(&self, id: ProbeId) {
        if let Err(err) = self.tracker.counter().increment(id) {
            self.anomaly(id, &err);
        }
    }

    /// Buffered hit recording for a single thread
    #[must_use]
    pub fn local(&self) -> LocalAgent<'_> {
        LocalAgent {
            agent: self,
            hits: LocalHits::with_flush_threshold(self.tracker.counter(), self.config.flush_threshold),
        }
    }

    /// Open a session
    pub fn begin_session(&self, name: &str) -> SessionHandle {
        self.tracker.begin_session(name)
    }

    /// Close a session
    ///
    /// # Errors
    ///
    /// `SessionNotFound` for unknown or already-ended handles
    pub fn end_session(&self, handle: &SessionHandle) -> CovResult<CoverageSnapshot> {
        self.tracker.end_session(handle)
    }

    /// Close a session that crashed or was cancelled, keeping its hits
    ///
    /// # Errors
    ///
    /// `SessionNotFound` for unknown or already-ended handles
    pub fn abort_session(&self, handle: &SessionHandle) -> CovResult<CoverageSnapshot> {
        self.tracker.abort_session(handle)
    }

    /// Current total counts
    #[must_use]
    pub fn snapshot(&self) -> CoverageSnapshot {
        self.tracker.counter().snapshot()
    }

    /// Best-effort report of everything so far, annotated with anomalies
    #[must_use]
    pub fn report(&self) -> CoverageReport {
        ReportBuilder::new()
            .with_warnings(self.anomalies())
            .build(&self.snapshot(), self.registry())
    }

    /// Anomalies swallowed at the notify boundary
    #[must_use]
    pub fn anomalies(&self) -> u64 {
        self.anomalies.load(Ordering::Relaxed)
    }

    /// The frozen registry
    #[must_use]
    pub fn registry(&self) -> &ProbeRegistry {
        self.tracker.counter().registry()
    }

    /// The session tracker
    #[must_use]
    pub const fn tracker(&self) -> &ExecutionTracker {
        &self.tracker
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Explicit teardown: close open sessions and capture a run record
    ///
    /// # Errors
    ///
    /// In strict mode, `UnknownProbe` for the first unknown hit seen.
    pub fn teardown(self) -> CovResult<RunRecord> {
        let total = self.tracker.finish();
        if let Some(&id) = self.strict_failure.get() {
            return Err(CovError::UnknownProbe { id });
        }
        Ok(RunRecord::capture(self.registry(), total, self.anomalies()))
    }

    /// Teardown and write the record into the configured records directory
    ///
    /// Returns the written path, or `None` when no directory is configured.
    ///
    /// # Errors
    ///
    /// Teardown errors, I/O or serialization errors
    pub fn write_record(self) -> CovResult<Option<PathBuf>> {
        let dir = self.config.records_dir.clone();
        let record = self.teardown()?;
        match dir {
            Some(dir) => {
                let path = record.save_in(&dir)?;
                info!(path = %path.display(), probes_hit = record.snapshot.len(), "wrote run record");
                Ok(Some(path))
            }
            None => Ok(None),
        }
    }

    fn anomaly(&self, id: ProbeId, err: &CovError) {
        let _ = self.anomalies.fetch_add(1, Ordering::Relaxed);
        warn!(probe = %id, error = %err, "ignoring hit on unknown probe");
        if self.config.error_mode == ErrorMode::Strict {
            let _ = self.strict_failure.set(id);
        }
    }
}

/// Per-thread view of a [`CoverageAgent`]
///
/// Buffers hits and flushes them into the shared counter on threshold and
/// on drop. Same error policy as [`CoverageAgent::notify_hit`].
#[derive(Debug)]
pub struct LocalAgent<'a> {
    agent: &'a CoverageAgent,
    hits: LocalHits<'a>,
}

impl LocalAgent<'_> {
    /// Record a hit. Never fails and never panics.
    #[inline]
    pub fn notify_hit(&mut self, id: ProbeId) {
        if let Err(err) = self.hits.record(id) {
            self.agent.anomaly(id, &err);
        }
    }

    /// Push buffered hits to the shared counter now
    pub fn flush(&mut self) {
        self.hits.flush();
    }
}
