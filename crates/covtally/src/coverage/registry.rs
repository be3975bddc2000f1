//! Probe Registry
//!
//! Populated once while instrumenting, then frozen. Ids are handed out in
//! registration order and never reused, so `all()` is stable across runs
//! with the same instrumentation.

use super::{Probe, ProbeId, SourceLocation, UnitKind};
use crate::result::{CovError, CovResult};
use std::collections::{BTreeSet, HashMap};

/// Registry of every probe the instrumenter discovered
#[derive(Debug, Default, Clone)]
pub struct ProbeRegistry {
    /// Probes in insertion order; `probes[i].id == ProbeId(i)`
    probes: Vec<Probe>,
    /// Reverse index for idempotent registration
    by_location: HashMap<SourceLocation, ProbeId>,
    /// Files known to the instrumenter, including ones without probes
    declared_files: BTreeSet<String>,
    /// No registration allowed once set
    frozen: bool,
}

impl ProbeRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a probe at `location`
    ///
    /// Registering the same location with the same kind again returns the
    /// existing id.
    ///
    /// # Errors
    ///
    /// `DuplicateLocation` if the location is already registered with a
    /// different kind, `InvalidProbe` if a branch index is given for a line
    /// unit or missing for a branch unit, `RegistryFrozen` after
    /// [`freeze`](Self::freeze).
    pub fn register(&mut self, location: SourceLocation, kind: UnitKind) -> CovResult<ProbeId> {
        if self.frozen {
            return Err(CovError::RegistryFrozen {
                what: format!("{kind} probe at {location}"),
            });
        }

        if let Some(&id) = self.by_location.get(&location) {
            let existing = self.probes[id.index()].kind;
            if existing == kind {
                return Ok(id);
            }
            return Err(CovError::DuplicateLocation {
                location,
                existing,
                requested: kind,
            });
        }
        if location.branch.is_some() != (kind == UnitKind::Branch) {
            return Err(CovError::InvalidProbe { location, kind });
        }

        let raw = u32::try_from(self.probes.len())
            .map_err(|_| CovError::invalid_record("probe id space exhausted"))?;
        let id = ProbeId::new(raw);
        let _ = self.by_location.insert(location.clone(), id);
        self.probes.push(Probe { id, kind, location });
        Ok(id)
    }

    /// Declare a source file that may have no executable units
    ///
    /// # Errors
    ///
    /// `RegistryFrozen` after [`freeze`](Self::freeze).
    pub fn declare_file(&mut self, file: impl Into<String>) -> CovResult<()> {
        let file = file.into();
        if self.frozen {
            return Err(CovError::RegistryFrozen {
                what: format!("file {file}"),
            });
        }
        let _ = self.declared_files.insert(file);
        Ok(())
    }

    /// Stop accepting registrations
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Whether the registry is frozen
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// All probes in insertion order
    #[must_use]
    pub fn all(&self) -> &[Probe] {
        &self.probes
    }

    /// Look up a probe by id
    #[must_use]
    pub fn get(&self, id: ProbeId) -> Option<&Probe> {
        self.probes.get(id.index())
    }

    /// Look up the id registered for a location
    #[must_use]
    pub fn lookup(&self, location: &SourceLocation) -> Option<ProbeId> {
        self.by_location.get(location).copied()
    }

    /// Whether `id` was handed out by this registry
    #[must_use]
    pub fn contains(&self, id: ProbeId) -> bool {
        id.index() < self.probes.len()
    }

    /// Number of probes
    #[must_use]
    pub fn len(&self) -> usize {
        self.probes.len()
    }

    /// Whether no probes are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Every known file, declared or probed, sorted and deduplicated
    #[must_use]
    pub fn files(&self) -> Vec<&str> {
        let mut files: BTreeSet<&str> = self.declared_files.iter().map(String::as_str).collect();
        files.extend(self.probes.iter().map(|p| p.location.file.as_str()));
        files.into_iter().collect()
    }

    /// Files declared without regard to probes
    #[must_use]
    pub fn declared_files(&self) -> impl Iterator<Item = &str> {
        self.declared_files.iter().map(String::as_str)
    }
}
