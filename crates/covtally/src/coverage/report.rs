//! Coverage Report Generation
//!
//! Turns a snapshot plus the registry that gives its ids meaning into a
//! read-only report:
//! - per-file executed/total/percentage (files in lexical order)
//! - per-unit hit counts ordered by source location
//! - overall, line-only and branch-only summaries
//!
//! Nothing here depends on the order hits arrived in, so identical inputs
//! always produce identical files and units.

use super::{CoverageSnapshot, ProbeId, ProbeRegistry, UnitKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Coverage status of a single probe
///
/// `Uncovered` moves to `Covered` on the first hit and never goes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageStatus {
    /// Zero hits
    Uncovered,
    /// At least one hit
    Covered,
}

impl CoverageStatus {
    /// Status for a hit count
    #[must_use]
    pub const fn from_hits(hits: u64) -> Self {
        if hits > 0 {
            Self::Covered
        } else {
            Self::Uncovered
        }
    }
}

/// Executed/total pair with its percentage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageSummary {
    /// Units with at least one hit
    pub executed: usize,
    /// All units
    pub total: usize,
    /// `executed / total` as 0-100; 100 when `total` is 0
    pub percent: f64,
}

impl CoverageSummary {
    /// Build a summary, treating an empty set as fully covered
    #[must_use]
    pub fn new(executed: usize, total: usize) -> Self {
        let percent = if total == 0 {
            100.0 // Vacuously true
        } else {
            (executed as f64 / total as f64) * 100.0
        };
        Self {
            executed,
            total,
            percent,
        }
    }

    fn tally(&mut self, covered: bool) {
        self.total += 1;
        if covered {
            self.executed += 1;
        }
    }

    fn finish(self) -> Self {
        Self::new(self.executed, self.total)
    }
}

impl Default for CoverageSummary {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// Per-file coverage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCoverage {
    /// Source file
    pub file: String,
    /// All units in the file
    pub summary: CoverageSummary,
    /// Line units only
    pub lines: CoverageSummary,
    /// Branch units only
    pub branches: CoverageSummary,
}

/// Per-probe coverage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCoverage {
    /// Probe id
    pub probe: ProbeId,
    /// Unit kind
    pub kind: UnitKind,
    /// Source file
    pub file: String,
    /// Line number
    pub line: u32,
    /// Branch index, for branch probes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<u32>,
    /// Number of hits
    pub hits: u64,
    /// Covered or not
    pub status: CoverageStatus,
}

impl UnitCoverage {
    /// Whether the unit was hit
    #[must_use]
    pub fn is_covered(&self) -> bool {
        self.status == CoverageStatus::Covered
    }
}

/// Coverage report containing all coverage data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    /// When the report was built
    pub generated_at: DateTime<Utc>,
    /// Every unit across all files
    pub summary: CoverageSummary,
    /// Line units across all files
    pub lines: CoverageSummary,
    /// Branch units across all files
    pub branches: CoverageSummary,
    /// Files in lexical order
    pub files: Vec<FileCoverage>,
    /// Units ordered by file, line, then branch
    pub units: Vec<UnitCoverage>,
    /// Recoverable anomalies seen while collecting or building
    pub warnings: u64,
}

impl CoverageReport {
    /// Whether overall coverage is at least `percent`
    #[must_use]
    pub fn meets_threshold(&self, percent: f64) -> bool {
        self.summary.percent >= percent
    }

    /// Coverage for one file
    #[must_use]
    pub fn file(&self, name: &str) -> Option<&FileCoverage> {
        self.files.iter().find(|f| f.file == name)
    }

    /// Coverage for one probe
    #[must_use]
    pub fn unit(&self, probe: ProbeId) -> Option<&UnitCoverage> {
        self.units.iter().find(|u| u.probe == probe)
    }

    /// Units that were never hit
    pub fn uncovered(&self) -> impl Iterator<Item = &UnitCoverage> {
        self.units.iter().filter(|u| !u.is_covered())
    }

    /// Units belonging to `file`, in report order
    pub fn units_in<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a UnitCoverage> {
        self.units.iter().filter(move |u| u.file == file)
    }
}

/// Builds [`CoverageReport`]s; never mutates its inputs
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    warnings: u64,
}

impl ReportBuilder {
    /// Create a builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Carry anomalies counted upstream (e.g. unknown probe hits)
    #[must_use]
    pub const fn with_warnings(mut self, warnings: u64) -> Self {
        self.warnings = warnings;
        self
    }

    /// Build the report
    ///
    /// Snapshot entries whose id is not in `registry` are skipped and added
    /// to the warning count.
    #[must_use]
    pub fn build(&self, snapshot: &CoverageSnapshot, registry: &ProbeRegistry) -> CoverageReport {
        let stray = snapshot
            .iter()
            .filter(|(id, _)| !registry.contains(*id))
            .count() as u64;

        let mut units: Vec<UnitCoverage> = registry
            .all()
            .iter()
            .map(|probe| {
                let hits = snapshot.count(probe.id);
                UnitCoverage {
                    probe: probe.id,
                    kind: probe.kind,
                    file: probe.location.file.clone(),
                    line: probe.location.line,
                    branch: probe.location.branch,
                    hits,
                    status: CoverageStatus::from_hits(hits),
                }
            })
            .collect();
        units.sort_by(|a, b| {
            (a.file.as_str(), a.line, a.branch).cmp(&(b.file.as_str(), b.line, b.branch))
        });

        let mut per_file: BTreeMap<&str, [CoverageSummary; 3]> = registry
            .files()
            .into_iter()
            .map(|f| (f, [CoverageSummary::default(); 3]))
            .collect();
        let mut overall = [CoverageSummary::default(); 3];

        for unit in &units {
            let covered = unit.is_covered();
            let kind_idx = match unit.kind {
                UnitKind::Line => 1,
                UnitKind::Branch => 2,
            };
            if let Some(file) = per_file.get_mut(unit.file.as_str()) {
                tally_into(file, kind_idx, covered);
            }
            tally_into(&mut overall, kind_idx, covered);
        }

        let files = per_file
            .into_iter()
            .map(|(file, [all, lines, branches])| FileCoverage {
                file: file.to_string(),
                summary: all.finish(),
                lines: lines.finish(),
                branches: branches.finish(),
            })
            .collect();

        let [summary, lines, branches] = overall;
        CoverageReport {
            generated_at: Utc::now(),
            summary: summary.finish(),
            lines: lines.finish(),
            branches: branches.finish(),
            files,
            units,
            warnings: self.warnings.saturating_add(stray),
        }
    }
}

fn tally_into(summaries: &mut [CoverageSummary; 3], kind_idx: usize, covered: bool) {
    summaries[0].tally(covered);
    summaries[kind_idx].tally(covered);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::coverage::SourceLocation;

    #[test]
    fn test_summary_vacuous() {
        let s = CoverageSummary::new(0, 0);
        assert_eq!(s.percent, 100.0);
    }

    #[test]
    fn test_summary_half() {
        assert_eq!(CoverageSummary::new(1, 2).percent, 50.0);
    }

    #[test]
    fn test_status_from_hits() {
        assert_eq!(CoverageStatus::from_hits(0), CoverageStatus::Uncovered);
        assert_eq!(CoverageStatus::from_hits(1), CoverageStatus::Covered);
    }

    #[test]
    fn test_units_sorted_by_location_not_registration() {
        let mut reg = ProbeRegistry::new();
        let _ = reg.register(SourceLocation::line("b.rs", 1), UnitKind::Line).unwrap();
        let _ = reg
            .register(SourceLocation::branch("a.rs", 3, 1), UnitKind::Branch)
            .unwrap();
        let _ = reg
            .register(SourceLocation::branch("a.rs", 3, 0), UnitKind::Branch)
            .unwrap();
        let _ = reg.register(SourceLocation::line("a.rs", 3), UnitKind::Line).unwrap();
        let _ = reg.register(SourceLocation::line("a.rs", 1), UnitKind::Line).unwrap();

        let report = ReportBuilder::new().build(&CoverageSnapshot::empty(), &reg);
        let order: Vec<_> = report
            .units
            .iter()
            .map(|u| (u.file.as_str(), u.line, u.branch))
            .collect();
        assert_eq!(
            order,
            vec![
                ("a.rs", 1, None),
                ("a.rs", 3, None),
                ("a.rs", 3, Some(0)),
                ("a.rs", 3, Some(1)),
                ("b.rs", 1, None),
            ]
        );
    }

    #[test]
    fn test_line_and_branch_summaries_split() {
        let mut reg = ProbeRegistry::new();
        let line = reg.register(SourceLocation::line("a.rs", 3), UnitKind::Line).unwrap();
        let _ = reg
            .register(SourceLocation::branch("a.rs", 3, 0), UnitKind::Branch)
            .unwrap();
        let taken = reg
            .register(SourceLocation::branch("a.rs", 3, 1), UnitKind::Branch)
            .unwrap();
        let snap: CoverageSnapshot = [(line, 1), (taken, 1)].into_iter().collect();

        let report = ReportBuilder::new().build(&snap, &reg);
        assert_eq!(report.lines, CoverageSummary::new(1, 1));
        assert_eq!(report.branches, CoverageSummary::new(1, 2));
        let file = report.file("a.rs").unwrap();
        assert_eq!(file.summary.executed, 2);
        assert_eq!(file.summary.total, 3);
        assert_eq!(file.branches.total, 2);
    }

    #[test]
    fn test_stray_ids_become_warnings() {
        let mut reg = ProbeRegistry::new();
        let _ = reg.register(SourceLocation::line("a.rs", 1), UnitKind::Line).unwrap();
        let snap: CoverageSnapshot = [(ProbeId::new(0), 1), (ProbeId::new(42), 3)]
            .into_iter()
            .collect();
        let report = ReportBuilder::new().with_warnings(2).build(&snap, &reg);
        assert_eq!(report.warnings, 3);
        assert_eq!(report.units.len(), 1);
        assert_eq!(report.summary.percent, 100.0);
    }

    #[test]
    fn test_empty_registry_is_fully_covered() {
        let report = ReportBuilder::new().build(&CoverageSnapshot::empty(), &ProbeRegistry::new());
        assert!(report.files.is_empty());
        assert_eq!(report.summary.percent, 100.0);
        assert!(report.meets_threshold(100.0));
    }

    #[test]
    fn test_meets_threshold() {
        let mut reg = ProbeRegistry::new();
        let hit = reg.register(SourceLocation::line("a.rs", 1), UnitKind::Line).unwrap();
        let _ = reg.register(SourceLocation::line("a.rs", 2), UnitKind::Line).unwrap();
        let snap: CoverageSnapshot = [(hit, 1)].into_iter().collect();
        let report = ReportBuilder::new().build(&snap, &reg);
        assert!(report.meets_threshold(50.0));
        assert!(!report.meets_threshold(50.1));
        assert_eq!(report.uncovered().count(), 1);
    }
}
