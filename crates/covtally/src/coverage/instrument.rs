//! Instrumentation Interface
//!
//! Whatever rewrites the target program (bytecode, source, compiler pass)
//! talks to the engine through [`Instrumenter`]: it registers one probe per
//! executable unit and injects `notify_hit(id)` calls using the ids it got
//! back. How the injection happens is not this crate's concern.
//!
//! [`ManifestInstrumenter`] is the file-based implementation: an external
//! tool writes a manifest of probe locations and we register them.

use super::{ProbeRegistry, SourceLocation, UnitKind};
use crate::result::CovResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Source of probe registrations
pub trait Instrumenter {
    /// Register probes into `registry`, returning how many were new
    ///
    /// # Errors
    ///
    /// `DuplicateLocation` on conflicting metadata; instrumentation must be
    /// aborted in that case.
    fn instrument(&self, registry: &mut ProbeRegistry) -> CovResult<usize>;
}

/// One probe entry in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestProbe {
    /// Source file
    pub file: String,
    /// Line number
    pub line: u32,
    /// Branch index; implies `kind: branch` when `kind` is omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<u32>,
    /// Unit kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<UnitKind>,
}

impl ManifestProbe {
    fn kind(&self) -> UnitKind {
        self.kind.unwrap_or(if self.branch.is_some() {
            UnitKind::Branch
        } else {
            UnitKind::Line
        })
    }

    fn location(&self) -> SourceLocation {
        SourceLocation {
            file: self.file.clone(),
            line: self.line,
            branch: self.branch,
        }
    }
}

/// Probe manifest: files known to the instrumenter and their probes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeManifest {
    /// Files to report even without probes
    #[serde(default)]
    pub files: Vec<String>,
    /// Probes in registration order
    #[serde(default)]
    pub probes: Vec<ManifestProbe>,
}

/// Registers probes listed in a [`ProbeManifest`]
#[derive(Debug, Clone, Default)]
pub struct ManifestInstrumenter {
    manifest: ProbeManifest,
}

impl ManifestInstrumenter {
    /// Wrap an in-memory manifest
    #[must_use]
    pub const fn new(manifest: ProbeManifest) -> Self {
        Self { manifest }
    }

    /// Load a manifest; `.yaml`/`.yml` are parsed as YAML, anything else as JSON
    ///
    /// # Errors
    ///
    /// I/O or parse errors
    pub fn from_path(path: &Path) -> CovResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
        if is_yaml {
            Self::from_yaml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// Parse a JSON manifest
    ///
    /// # Errors
    ///
    /// Returns error on malformed JSON
    pub fn from_json_str(s: &str) -> CovResult<Self> {
        Ok(Self::new(serde_json::from_str(s)?))
    }

    /// Parse a YAML manifest
    ///
    /// # Errors
    ///
    /// Returns error on malformed YAML
    pub fn from_yaml_str(s: &str) -> CovResult<Self> {
        Ok(Self::new(serde_yaml_ng::from_str(s)?))
    }

    /// The loaded manifest
    #[must_use]
    pub const fn manifest(&self) -> &ProbeManifest {
        &self.manifest
    }
}

impl Instrumenter for ManifestInstrumenter {
    fn instrument(&self, registry: &mut ProbeRegistry) -> CovResult<usize> {
        let before = registry.len();
        for file in &self.manifest.files {
            registry.declare_file(file.clone())?;
        }
        for probe in &self.manifest.probes {
            let _ = registry.register(probe.location(), probe.kind())?;
        }
        let added = registry.len() - before;
        debug!(
            probes = added,
            files = self.manifest.files.len(),
            "registered probes from manifest"
        );
        Ok(added)
    }
}
