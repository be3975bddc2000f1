//! Result and error types for Covtally.

use crate::coverage::{ProbeId, SessionId, SourceLocation, UnitKind};
use thiserror::Error;

/// Result type for Covtally operations
pub type CovResult<T> = Result<T, CovError>;

/// Errors that can occur in Covtally
#[derive(Debug, Error)]
pub enum CovError {
    /// The same source location was registered with a different unit kind
    #[error("Conflicting probe at {location}: already registered as {existing}, got {requested}")]
    DuplicateLocation {
        /// Location that was registered twice
        location: SourceLocation,
        /// Kind recorded by the first registration
        existing: UnitKind,
        /// Kind requested by the conflicting registration
        requested: UnitKind,
    },

    /// A probe's kind disagrees with its location: line units carry no
    /// branch index and branch units always do
    #[error("Invalid {kind} probe at {location}: line probes take no branch index, branch probes need one")]
    InvalidProbe {
        /// Location as registered
        location: SourceLocation,
        /// Kind as registered
        kind: UnitKind,
    },

    /// A hit referenced a probe id the registry does not know
    #[error("Unknown probe id {id}")]
    UnknownProbe {
        /// The offending id
        id: ProbeId,
    },

    /// A session handle did not refer to an open session
    #[error("Session {id} not found (unknown or already ended)")]
    SessionNotFound {
        /// Session id from the handle
        id: SessionId,
    },

    /// The report sink failed
    #[error("Failed to write report to {target}: {message}")]
    ReportWrite {
        /// Description of the sink (path, "stdout", ...)
        target: String,
        /// Underlying failure
        message: String,
    },

    /// Registration attempted after the registry was frozen
    #[error("Probe registry is frozen; cannot register {what}")]
    RegistryFrozen {
        /// What was being registered
        what: String,
    },

    /// A run record or manifest was structurally invalid
    #[error("Invalid record: {message}")]
    InvalidRecord {
        /// Error message
        message: String,
    },

    /// A foreign coverage report (LCOV, Go coverprofile) could not be parsed
    #[error("Invalid {format} report: {context}")]
    InvalidReport {
        /// Report format being parsed
        format: &'static str,
        /// What was being read when parsing failed
        context: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl CovError {
    /// Create a report write error
    #[must_use]
    pub fn report_write(target: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::ReportWrite {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Create an invalid record error
    #[must_use]
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    /// Create an invalid report error
    #[must_use]
    pub fn invalid_report(format: &'static str, context: impl Into<String>) -> Self {
        Self::InvalidReport {
            format,
            context: context.into(),
        }
    }
}
