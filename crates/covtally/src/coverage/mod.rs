//! Line and Branch Coverage Engine
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  COVTALLY COVERAGE PIPELINE                                     │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  Instrumenter → Probe Registry → Hit Counter → Tracker → Report │
//! │                   (frozen)        (atomics)   (sessions)        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - The registry is populated once and frozen when the counter takes it.
//! - The counter is the only shared mutable state.
//! - Snapshots are plain values; merging them is a pointwise sum.
//! - Reports are ordered by source location, never by hit arrival.
//! - LCOV and Go reports import as run records and merge like native ones.

mod counter;
pub mod formatters;
mod import;
mod instrument;
mod probe;
mod record;
mod registry;
mod report;
mod sink;
mod snapshot;
mod tracker;

pub use counter::{HitCounter, LocalHits, DEFAULT_FLUSH_THRESHOLD};
pub use formatters::{JsonFormatter, LcovFormatter, ReportFormat};
pub use import::{
    load_report, parse_report, GoMode, GoProfile, GoRegion, InputFormat, LcovBranch, LcovFile,
    LcovTracefile,
};
pub use instrument::{Instrumenter, ManifestInstrumenter, ManifestProbe, ProbeManifest};
pub use probe::{Probe, ProbeId, SourceLocation, UnitKind};
pub use record::{MergedRun, RunRecord, RECORD_PREFIX};
pub use registry::ProbeRegistry;
pub use report::{
    CoverageReport, CoverageStatus, CoverageSummary, FileCoverage, ReportBuilder, UnitCoverage,
};
pub use sink::{FileSink, MemorySink, ReportSink, StdoutSink, WriterSink};
pub use snapshot::CoverageSnapshot;
pub use tracker::{ExecutionTracker, SessionHandle, SessionId, SnapshotMode};

#[cfg(test)]
mod tests;
