//! Type-Safe Probe Identifiers
//!
//! A probe is one executable source unit (a line or a branch) that injected
//! code reports hits for. Ids are dense and assigned by the registry, so they
//! double as indices into the counter store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type-safe probe identifier
///
/// Cannot be confused with raw line numbers or branch indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProbeId(u32);

impl ProbeId {
    /// Create a new probe ID
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the inner value
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Index into dense per-probe storage
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ProbeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of executable unit a probe stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// A source line
    Line,
    /// One arm of a branch point
    Branch,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line => f.write_str("line"),
            Self::Branch => f.write_str("branch"),
        }
    }
}

/// Where a probe lives in the source tree
///
/// Field order matters: the derived ordering is file (lexical), then line,
/// then branch index with `None` first. Reports rely on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Source file path, as the instrumenter reported it
    pub file: String,
    /// 1-based line number
    pub line: u32,
    /// Branch index within the line, for branch probes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<u32>,
}

impl SourceLocation {
    /// Location of a whole line
    #[must_use]
    pub fn line(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
            branch: None,
        }
    }

    /// Location of one branch arm on a line
    #[must_use]
    pub fn branch(file: impl Into<String>, line: u32, branch: u32) -> Self {
        Self {
            file: file.into(),
            line,
            branch: Some(branch),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.branch {
            Some(branch) => write!(f, "{}:{}#{}", self.file, self.line, branch),
            None => write!(f, "{}:{}", self.file, self.line),
        }
    }
}

/// A registered probe. Immutable once the registry hands it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    /// Registry-assigned id
    pub id: ProbeId,
    /// Unit kind
    pub kind: UnitKind,
    /// Source location
    pub location: SourceLocation,
}
