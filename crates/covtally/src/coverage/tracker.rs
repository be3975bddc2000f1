//! Execution Tracker
//!
//! Manages coverage sessions over a shared [`HitCounter`]. A session is a
//! bounded test run; ending it yields the hits accumulated since it began
//! (or the full counter state, in [`SnapshotMode::Total`]). Sessions can be
//! nested or overlap; they only read the counter.

use super::{CoverageSnapshot, HitCounter};
use crate::result::{CovError, CovResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};
use uuid::Uuid;

/// What `end_session` captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotMode {
    /// Hits since the session began
    #[default]
    Delta,
    /// Every hit the counter has seen
    Total,
}

/// Unique session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Handle returned by [`ExecutionTracker::begin_session`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    id: SessionId,
    name: String,
}

impl SessionHandle {
    /// Session id
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Session name given at creation
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug)]
struct OpenSession {
    name: String,
    baseline: CoverageSnapshot,
    started_at: DateTime<Utc>,
}

/// Aggregates counter state across sessions
#[derive(Debug)]
pub struct ExecutionTracker {
    counter: Arc<HitCounter>,
    mode: SnapshotMode,
    sessions: Mutex<HashMap<SessionId, OpenSession>>,
}

impl ExecutionTracker {
    /// Track sessions over `counter`
    #[must_use]
    pub fn new(counter: Arc<HitCounter>, mode: SnapshotMode) -> Self {
        Self {
            counter,
            mode,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Open a session
    pub fn begin_session(&self, name: &str) -> SessionHandle {
        let id = SessionId::generate();
        let baseline = match self.mode {
            SnapshotMode::Delta => self.counter.snapshot(),
            SnapshotMode::Total => CoverageSnapshot::empty(),
        };
        let _ = self.lock_sessions().insert(
            id,
            OpenSession {
                name: name.to_string(),
                baseline,
                started_at: Utc::now(),
            },
        );
        debug!(session = %id, name, "coverage session started");
        SessionHandle {
            id,
            name: name.to_string(),
        }
    }

    /// Close a session and return its snapshot
    ///
    /// # Errors
    ///
    /// `SessionNotFound` if the handle is unknown or was already ended.
    pub fn end_session(&self, handle: &SessionHandle) -> CovResult<CoverageSnapshot> {
        let session = self.take_session(handle)?;
        let snapshot = self.capture(&session);
        debug!(
            session = %handle.id,
            name = %session.name,
            probes_hit = snapshot.len(),
            elapsed_ms = (Utc::now() - session.started_at).num_milliseconds(),
            "coverage session ended"
        );
        Ok(snapshot)
    }

    /// Close a session that did not finish cleanly
    ///
    /// Returns whatever was collected up to now, exactly like
    /// [`end_session`](Self::end_session), but logs the abort.
    ///
    /// # Errors
    ///
    /// `SessionNotFound` if the handle is unknown or was already ended.
    pub fn abort_session(&self, handle: &SessionHandle) -> CovResult<CoverageSnapshot> {
        let session = self.take_session(handle)?;
        let snapshot = self.capture(&session);
        warn!(
            session = %handle.id,
            name = %session.name,
            probes_hit = snapshot.len(),
            "coverage session aborted; keeping partial snapshot"
        );
        Ok(snapshot)
    }

    /// Pointwise sum of two snapshots
    #[must_use]
    pub fn merge(a: &CoverageSnapshot, b: &CoverageSnapshot) -> CoverageSnapshot {
        CoverageSnapshot::merge(a, b)
    }

    /// Merge any number of snapshots
    pub fn merge_all<'a, I>(snapshots: I) -> CoverageSnapshot
    where
        I: IntoIterator<Item = &'a CoverageSnapshot>,
    {
        let mut merged = CoverageSnapshot::empty();
        for snapshot in snapshots {
            merged.absorb(snapshot);
        }
        merged
    }

    /// Teardown: drop open sessions and return the total counter state
    #[must_use]
    pub fn finish(&self) -> CoverageSnapshot {
        let mut sessions = self.lock_sessions();
        for (id, session) in sessions.drain() {
            warn!(session = %id, name = %session.name, "session still open at teardown");
        }
        drop(sessions);
        self.counter.snapshot()
    }

    /// Number of sessions currently open
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.lock_sessions().len()
    }

    /// Snapshot mode
    #[must_use]
    pub const fn mode(&self) -> SnapshotMode {
        self.mode
    }

    /// The underlying counter
    #[must_use]
    pub fn counter(&self) -> &Arc<HitCounter> {
        &self.counter
    }

    fn take_session(&self, handle: &SessionHandle) -> CovResult<OpenSession> {
        self.lock_sessions()
            .remove(&handle.id)
            .ok_or(CovError::SessionNotFound { id: handle.id })
    }

    fn capture(&self, session: &OpenSession) -> CoverageSnapshot {
        let now = self.counter.snapshot();
        match self.mode {
            SnapshotMode::Delta => now.delta_since(&session.baseline),
            SnapshotMode::Total => now,
        }
    }

    fn lock_sessions(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, OpenSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
