//! Foreign Report Import
//!
//! Coverage produced by other toolchains is turned into [`RunRecord`]s so it
//! merges and reports exactly like records left by instrumented processes.
//! Supported inputs:
//!
//! - LCOV tracefiles (`lcov`, `grcov`, `cargo llvm-cov --lcov`, Jest, ...)
//! - Go coverprofiles (`go test -coverprofile`)
//! - covtally's own JSON run records

mod golang;
mod lcov;

pub use golang::{GoMode, GoProfile, GoRegion};
pub use lcov::{LcovBranch, LcovFile, LcovTracefile};

use super::{CoverageSnapshot, ProbeId, ProbeRegistry, RunRecord, SourceLocation, UnitKind};
use crate::result::{CovError, CovResult};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Report formats accepted as coverage input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// covtally JSON run record
    Record,
    /// LCOV tracefile
    Lcov,
    /// Go coverprofile
    Go,
}

impl InputFormat {
    /// Guess the format from the first meaningful line
    ///
    /// Returns `None` for anything unrecognised, including empty input.
    #[must_use]
    pub fn detect(content: &str) -> Option<Self> {
        let first = content
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.starts_with('#'))?;
        if first.starts_with("mode:") {
            Some(Self::Go)
        } else if first.starts_with('{') {
            Some(Self::Record)
        } else if ["TN:", "SF:", "VER:"].iter().any(|tag| first.starts_with(tag)) {
            Some(Self::Lcov)
        } else {
            None
        }
    }
}

/// Parse report text in any supported format into a run record
///
/// # Errors
///
/// `InvalidReport` if the format is unknown or the text does not parse,
/// `InvalidRecord` for a malformed JSON record
pub fn parse_report(content: &str) -> CovResult<RunRecord> {
    match InputFormat::detect(content) {
        Some(InputFormat::Record) => RunRecord::from_json_str(content),
        Some(InputFormat::Lcov) => content.parse::<LcovTracefile>()?.into_record(),
        Some(InputFormat::Go) => content.parse::<GoProfile>()?.into_record(),
        None => Err(CovError::invalid_report(
            "coverage",
            "expected a covtally record, an LCOV tracefile or a Go coverprofile",
        )),
    }
}

/// Read a report file in any supported format
///
/// # Errors
///
/// I/O errors, or the errors of [`parse_report`] with the path prepended
pub fn load_report(path: &Path) -> CovResult<RunRecord> {
    let content = std::fs::read_to_string(path)?;
    let record = parse_report(&content).map_err(|e| match e {
        CovError::InvalidReport { format, context } => {
            CovError::invalid_report(format, format!("{}: {context}", path.display()))
        }
        CovError::InvalidRecord { message } => {
            CovError::invalid_record(format!("{}: {message}", path.display()))
        }
        other => other,
    })?;
    debug!(path = %path.display(), probes = record.probes.len(), "loaded coverage report");
    Ok(record)
}

/// Builds a record from units discovered one at a time
#[derive(Debug, Default)]
struct RecordAssembler {
    registry: ProbeRegistry,
    hits: BTreeMap<ProbeId, u64>,
}

impl RecordAssembler {
    fn declare(&mut self, file: &str) -> CovResult<()> {
        self.registry.declare_file(file)
    }

    /// Register the unit and fold `count` into what it already has
    fn hit(
        &mut self,
        location: SourceLocation,
        kind: UnitKind,
        count: u64,
        fold: fn(u64, u64) -> u64,
    ) -> CovResult<()> {
        let id = self.registry.register(location, kind)?;
        let slot = self.hits.entry(id).or_insert(0);
        *slot = fold(*slot, count);
        Ok(())
    }

    fn finish(self) -> RunRecord {
        let snapshot: CoverageSnapshot = self.hits.into_iter().collect();
        RunRecord::capture(&self.registry, snapshot, 0)
    }
}
