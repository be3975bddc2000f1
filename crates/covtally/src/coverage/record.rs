//! Run Records
//!
//! What an instrumented process leaves behind at teardown: its probes, its
//! final snapshot and how many anomalies it swallowed. Records are
//! self-describing so a separate process can merge and report them.
//!
//! Probe ids are local to a record. Merging re-registers every record's
//! probes into one registry by location and remaps the snapshots onto it.

use super::{CoverageReport, CoverageSnapshot, Probe, ProbeId, ProbeRegistry, ReportBuilder};
use crate::result::{CovError, CovResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use uuid::Uuid;

/// File name prefix for records written into a records directory
pub const RECORD_PREFIX: &str = "covtally-";

/// Coverage left behind by one instrumented process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique record id
    pub id: Uuid,
    /// When the record was captured
    pub created_at: DateTime<Utc>,
    /// Files declared by the instrumenter, probed or not
    #[serde(default)]
    pub files: Vec<String>,
    /// Probes in id order
    pub probes: Vec<Probe>,
    /// Final hit counts
    pub snapshot: CoverageSnapshot,
    /// Recoverable anomalies counted while running
    #[serde(default)]
    pub anomalies: u64,
}

impl RunRecord {
    /// Capture a record from a registry and a snapshot over it
    #[must_use]
    pub fn capture(registry: &ProbeRegistry, snapshot: CoverageSnapshot, anomalies: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            files: registry.declared_files().map(String::from).collect(),
            probes: registry.all().to_vec(),
            snapshot,
            anomalies,
        }
    }

    /// File name used inside a records directory
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{RECORD_PREFIX}{}.json", self.id)
    }

    /// Check that probe ids are dense and in order
    ///
    /// # Errors
    ///
    /// `InvalidRecord` describing the first offending probe
    pub fn validate(&self) -> CovResult<()> {
        for (idx, probe) in self.probes.iter().enumerate() {
            if probe.id.index() != idx {
                return Err(CovError::invalid_record(format!(
                    "record {}: probe at position {idx} has id {}",
                    self.id, probe.id
                )));
            }
        }
        Ok(())
    }

    /// Rebuild this record's registry
    ///
    /// # Errors
    ///
    /// `InvalidRecord` if ids are not dense, `DuplicateLocation` on conflicts
    pub fn registry(&self) -> CovResult<ProbeRegistry> {
        self.validate()?;
        let mut registry = ProbeRegistry::new();
        let _ = self.register_into(&mut registry)?;
        Ok(registry)
    }

    /// Register this record's probes into `registry` and remap its snapshot
    ///
    /// Returns the remapped snapshot and how many snapshot entries referred
    /// to ids the record does not define.
    ///
    /// # Errors
    ///
    /// `DuplicateLocation` if a location conflicts with one already in
    /// `registry`
    pub fn register_into(&self, registry: &mut ProbeRegistry) -> CovResult<(CoverageSnapshot, u64)> {
        for file in &self.files {
            registry.declare_file(file.clone())?;
        }
        let mut ids: HashMap<ProbeId, ProbeId> = HashMap::with_capacity(self.probes.len());
        for probe in &self.probes {
            let to = registry.register(probe.location.clone(), probe.kind)?;
            let _ = ids.insert(probe.id, to);
        }
        let mut stray = 0u64;
        let snapshot = self.snapshot.remap(|id| {
            let to = ids.get(&id).copied();
            if to.is_none() {
                stray += 1;
            }
            to
        });
        Ok((snapshot, stray))
    }

    /// Write the record as JSON, creating parent directories
    ///
    /// The JSON goes to a temporary file next to `path` which is then
    /// renamed over it, so readers never see a partial record.
    ///
    /// # Errors
    ///
    /// I/O or serialization errors
    pub fn save(&self, path: &Path) -> CovResult<()> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;
        let mut tmp = NamedTempFile::new_in(parent)?;
        serde_json::to_writer(&mut tmp, self)?;
        tmp.flush()?;
        let _ = tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Write into `dir` under [`file_name`](Self::file_name)
    ///
    /// # Errors
    ///
    /// I/O or serialization errors
    pub fn save_in(&self, dir: &Path) -> CovResult<PathBuf> {
        let path = dir.join(self.file_name());
        self.save(&path)?;
        Ok(path)
    }

    /// Parse a record from JSON text
    ///
    /// # Errors
    ///
    /// `InvalidRecord` if the text is not a valid record
    pub fn from_json_str(content: &str) -> CovResult<Self> {
        let record: Self =
            serde_json::from_str(content).map_err(|e| CovError::invalid_record(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    /// Read a record
    ///
    /// # Errors
    ///
    /// I/O errors, or `InvalidRecord` if the file is not a valid record
    pub fn load(path: &Path) -> CovResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content).map_err(|e| match e {
            CovError::InvalidRecord { message } => {
                CovError::invalid_record(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// Paths of the records in `dir`, ordered by file name
    ///
    /// Only files named `covtally-*.json` count. A missing directory has
    /// none.
    ///
    /// # Errors
    ///
    /// I/O errors reading the directory
    pub fn paths_in(dir: &Path) -> CovResult<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| {
                p.is_file()
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(RECORD_PREFIX) && n.ends_with(".json"))
            })
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Read every record in `dir`, ordered by file name
    ///
    /// # Errors
    ///
    /// I/O errors or the first invalid record
    pub fn load_dir(dir: &Path) -> CovResult<Vec<Self>> {
        Self::paths_in(dir)?.iter().map(|p| Self::load(p)).collect()
    }

    /// Read every readable record in `dir`, setting the others aside
    ///
    /// A process that crashed mid-run may leave a record behind that does
    /// not parse. Those come back with their error instead of failing the
    /// whole directory.
    ///
    /// # Errors
    ///
    /// I/O errors reading the directory itself
    pub fn load_dir_lenient(dir: &Path) -> CovResult<(Vec<Self>, Vec<(PathBuf, CovError)>)> {
        let mut records = Vec::new();
        let mut skipped = Vec::new();
        for path in Self::paths_in(dir)? {
            match Self::load(&path) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable run record");
                    skipped.push((path, e));
                }
            }
        }
        Ok((records, skipped))
    }
}

/// Several records folded into one registry and one snapshot
#[derive(Debug, Clone, Default)]
pub struct MergedRun {
    /// Union of all probes, keyed by location
    pub registry: ProbeRegistry,
    /// Sum of all remapped snapshots
    pub snapshot: CoverageSnapshot,
    /// Anomalies from the records plus stray snapshot entries
    pub anomalies: u64,
    /// Number of records merged
    pub records: usize,
}

impl MergedRun {
    /// Start from a registry, e.g. one populated from a manifest
    #[must_use]
    pub fn with_registry(registry: ProbeRegistry) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }

    /// Fold one record in
    ///
    /// # Errors
    ///
    /// `DuplicateLocation` if the record disagrees with earlier ones on a
    /// location's unit kind
    pub fn add(&mut self, record: &RunRecord) -> CovResult<()> {
        let (snapshot, stray) = record.register_into(&mut self.registry)?;
        if stray > 0 {
            warn!(record = %record.id, stray, "record references undefined probe ids");
        }
        self.snapshot.absorb(&snapshot);
        self.anomalies = self
            .anomalies
            .saturating_add(record.anomalies)
            .saturating_add(stray);
        self.records += 1;
        debug!(record = %record.id, probes = record.probes.len(), "merged run record");
        Ok(())
    }

    /// Merge a batch of records
    ///
    /// # Errors
    ///
    /// See [`add`](Self::add)
    pub fn from_records<'a, I>(records: I) -> CovResult<Self>
    where
        I: IntoIterator<Item = &'a RunRecord>,
    {
        let mut merged = Self::default();
        for record in records {
            merged.add(record)?;
        }
        Ok(merged)
    }

    /// Collapse back into a single record
    #[must_use]
    pub fn into_record(self) -> RunRecord {
        RunRecord::capture(&self.registry, self.snapshot, self.anomalies)
    }

    /// Build the report for everything merged so far
    #[must_use]
    pub fn report(&self) -> CoverageReport {
        ReportBuilder::new()
            .with_warnings(self.anomalies)
            .build(&self.snapshot, &self.registry)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::coverage::{SourceLocation, UnitKind};

    fn record(locations: &[(&str, u32)], hits: &[(u32, u64)]) -> RunRecord {
        let mut reg = ProbeRegistry::new();
        for (file, line) in locations {
            let _ = reg.register(SourceLocation::line(*file, *line), UnitKind::Line).unwrap();
        }
        let snap = hits.iter().map(|&(id, c)| (ProbeId::new(id), c)).collect();
        RunRecord::capture(&reg, snap, 0)
    }

    #[test]
    fn test_merge_remaps_by_location() {
        // Same probes, registered in different orders by two processes.
        let a = record(&[("a.rs", 5), ("b.rs", 2)], &[(0, 1)]);
        let b = record(&[("b.rs", 2), ("a.rs", 5)], &[(1, 1), (0, 4)]);
        let merged = MergedRun::from_records([&a, &b]).unwrap();
        assert_eq!(merged.registry.len(), 2);
        let a5 = merged.registry.lookup(&SourceLocation::line("a.rs", 5)).unwrap();
        let b2 = merged.registry.lookup(&SourceLocation::line("b.rs", 2)).unwrap();
        assert_eq!(merged.snapshot.count(a5), 2);
        assert_eq!(merged.snapshot.count(b2), 4);
        assert_eq!(merged.records, 2);
    }

    #[test]
    fn test_stray_ids_are_anomalies() {
        let mut rec = record(&[("a.rs", 1)], &[(0, 1)]);
        rec.snapshot = [(ProbeId::new(0), 1), (ProbeId::new(9), 1)].into_iter().collect();
        rec.anomalies = 2;
        let merged = MergedRun::from_records([&rec]).unwrap();
        assert_eq!(merged.anomalies, 3);
        assert_eq!(merged.snapshot.total_hits(), 1);
    }

    #[test]
    fn test_validate_rejects_sparse_ids() {
        let mut rec = record(&[("a.rs", 1), ("a.rs", 2)], &[]);
        rec.probes[1].id = ProbeId::new(7);
        assert!(matches!(rec.validate(), Err(CovError::InvalidRecord { .. })));
    }

    #[test]
    fn test_conflicting_records_fail() {
        let a = record(&[("a.rs", 1)], &[]);
        let mut b = record(&[("a.rs", 1)], &[]);
        b.probes[0].kind = UnitKind::Branch;
        assert!(matches!(
            MergedRun::from_records([&a, &b]),
            Err(CovError::DuplicateLocation { .. })
        ));
    }

    #[test]
    fn test_record_with_mismatched_kind_is_rejected() {
        let mut rec = record(&[("a.rs", 1)], &[(0, 1)]);
        rec.probes[0].location.branch = Some(0);
        assert!(matches!(rec.registry(), Err(CovError::InvalidProbe { .. })));
    }

    #[test]
    fn test_save_and_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        let a = record(&[("a.rs", 1)], &[(0, 3)]);
        let b = record(&[("a.rs", 1)], &[(0, 2)]);
        let _ = a.save_in(dir.path()).unwrap();
        let _ = b.save_in(dir.path()).unwrap();
        std::fs::write(dir.path().join("unrelated.json"), "not a record").unwrap();

        let records = RunRecord::load_dir(dir.path()).unwrap();
        assert_eq!(records.len(), 2);
        let merged = MergedRun::from_records(&records).unwrap();
        assert_eq!(merged.snapshot.total_hits(), 5);
    }

    #[test]
    fn test_save_replaces_without_leaving_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/run.json");
        let a = record(&[("a.rs", 1)], &[(0, 3)]);
        let b = record(&[("b.rs", 1)], &[(0, 1)]);
        a.save(&path).unwrap();
        b.save(&path).unwrap();
        assert_eq!(RunRecord::load(&path).unwrap(), b);
        let entries = std::fs::read_dir(dir.path().join("nested")).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_truncated_record_is_skipped_leniently() {
        let dir = tempfile::tempdir().unwrap();
        let good = record(&[("a.rs", 1)], &[(0, 3)]);
        let _ = good.save_in(dir.path()).unwrap();
        let crashed = dir.path().join("covtally-crashed.json");
        std::fs::write(&crashed, "{\"id\":\"x").unwrap();

        assert!(RunRecord::load_dir(dir.path()).is_err());
        let (records, skipped) = RunRecord::load_dir_lenient(dir.path()).unwrap();
        assert_eq!(records, vec![good]);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].0, crashed);
        assert!(matches!(skipped[0].1, CovError::InvalidRecord { .. }));
    }

    #[test]
    fn test_paths_in_treats_names_literally() {
        let dir = tempfile::tempdir().unwrap();
        let odd = dir.path().join("run[1]");
        let saved = record(&[("a.rs", 1)], &[]).save_in(&odd).unwrap();
        assert_eq!(RunRecord::paths_in(&odd).unwrap(), vec![saved]);
    }

    #[test]
    fn test_load_dir_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RunRecord::load_dir(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_load_invalid_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("covtally-bad.json");
        std::fs::write(&path, "{\"probes\": 3}").unwrap();
        assert!(matches!(RunRecord::load(&path), Err(CovError::InvalidRecord { .. })));
    }

    #[test]
    fn test_declared_files_survive_merge() {
        let mut reg = ProbeRegistry::new();
        reg.declare_file("c.rs").unwrap();
        let rec = RunRecord::capture(&reg, CoverageSnapshot::empty(), 0);
        let report = MergedRun::from_records([&rec]).unwrap().report();
        assert_eq!(report.file("c.rs").unwrap().summary.percent, 100.0);
    }

    #[test]
    fn test_into_record_round_trip() {
        let a = record(&[("a.rs", 1)], &[(0, 3)]);
        let merged = MergedRun::from_records([&a]).unwrap().into_record();
        assert_eq!(merged.snapshot, a.snapshot);
        assert_eq!(merged.probes, a.probes);
    }
}
