//! Agent configuration

use crate::coverage::{SnapshotMode, DEFAULT_FLUSH_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming the directory run records are written to
pub const RECORDS_DIR_ENV: &str = "COVTALLY_RECORDS_DIR";

/// Environment variable enabling strict mode (`1`, `true`, `yes`)
pub const STRICT_ENV: &str = "COVTALLY_STRICT";

/// How the agent treats hits on unknown probes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Log, count, carry on
    #[default]
    Lenient,
    /// Log and count, then fail the run at teardown
    Strict,
}

/// Coverage agent configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// What session snapshots capture
    pub snapshot_mode: SnapshotMode,
    /// Unknown-probe policy
    pub error_mode: ErrorMode,
    /// Buffered hits before a local buffer flushes
    pub flush_threshold: usize,
    /// Where teardown writes the run record, if anywhere
    pub records_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Create a builder for agent config
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Defaults overridden by `COVTALLY_RECORDS_DIR` and `COVTALLY_STRICT`
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(dir) = lookup(RECORDS_DIR_ENV).filter(|d| !d.is_empty()) {
            config.records_dir = Some(PathBuf::from(dir));
        }
        if lookup(STRICT_ENV).is_some_and(|v| is_truthy(&v)) {
            config.error_mode = ErrorMode::Strict;
        }
        config
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            snapshot_mode: SnapshotMode::Delta,
            error_mode: ErrorMode::Lenient,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            records_dir: None,
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Builder for agent configuration
#[derive(Debug, Default)]
pub struct AgentConfigBuilder {
    snapshot_mode: SnapshotMode,
    error_mode: ErrorMode,
    flush_threshold: usize,
    records_dir: Option<PathBuf>,
}

impl AgentConfigBuilder {
    /// Set the snapshot mode
    #[must_use]
    pub const fn snapshot_mode(mut self, mode: SnapshotMode) -> Self {
        self.snapshot_mode = mode;
        self
    }

    /// Set the error mode
    #[must_use]
    pub const fn error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Shorthand for `error_mode(ErrorMode::Strict)`
    #[must_use]
    pub const fn strict(self) -> Self {
        self.error_mode(ErrorMode::Strict)
    }

    /// Set the local buffer flush threshold
    #[must_use]
    pub const fn flush_threshold(mut self, threshold: usize) -> Self {
        self.flush_threshold = threshold;
        self
    }

    /// Set the records directory
    #[must_use]
    pub fn records_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.records_dir = Some(dir.into());
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> AgentConfig {
        AgentConfig {
            snapshot_mode: self.snapshot_mode,
            error_mode: self.error_mode,
            flush_threshold: if self.flush_threshold == 0 {
                DEFAULT_FLUSH_THRESHOLD
            } else {
                self.flush_threshold
            },
            records_dir: self.records_dir,
        }
    }
}
