//! Report Sinks
//!
//! Where a rendered report goes. Every failure surfaces as
//! [`CovError::ReportWrite`] naming the target.

use crate::result::{CovError, CovResult};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Destination for a rendered report
pub trait ReportSink {
    /// Human-readable target description used in errors and logs
    fn target(&self) -> String;

    /// Write the whole document
    ///
    /// # Errors
    ///
    /// `ReportWrite` if the destination rejects the write
    fn write_report(&mut self, content: &str) -> CovResult<()>;
}

/// Writes to a file, creating parent directories
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// Sink writing to `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Target path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for FileSink {
    fn target(&self) -> String {
        self.path.display().to_string()
    }

    fn write_report(&mut self, content: &str) -> CovResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CovError::report_write(self.target(), e))?;
        }
        std::fs::write(&self.path, content).map_err(|e| CovError::report_write(self.target(), e))
    }
}

/// Writes to standard output
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl ReportSink for StdoutSink {
    fn target(&self) -> String {
        "stdout".to_string()
    }

    fn write_report(&mut self, content: &str) -> CovResult<()> {
        let mut out = std::io::stdout().lock();
        out.write_all(content.as_bytes())
            .and_then(|()| out.flush())
            .map_err(|e| CovError::report_write("stdout", e))
    }
}

/// Writes to any [`Write`], e.g. a `TcpStream`
pub struct WriterSink<W: Write> {
    writer: W,
    label: String,
}

impl<W: Write> WriterSink<W> {
    /// Wrap a writer; `label` names it in errors
    pub fn new(writer: W, label: impl Into<String>) -> Self {
        Self {
            writer,
            label: label.into(),
        }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> fmt::Debug for WriterSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterSink").field("label", &self.label).finish()
    }
}

impl<W: Write> ReportSink for WriterSink<W> {
    fn target(&self) -> String {
        self.label.clone()
    }

    fn write_report(&mut self, content: &str) -> CovResult<()> {
        self.writer
            .write_all(content.as_bytes())
            .and_then(|()| self.writer.flush())
            .map_err(|e| CovError::report_write(self.label.clone(), e))
    }
}

/// Keeps the last written document in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    contents: String,
    writes: usize,
}

impl MemorySink {
    /// Empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last written document
    #[must_use]
    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// Number of writes received
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.writes
    }
}

impl ReportSink for MemorySink {
    fn target(&self) -> String {
        "memory".to_string()
    }

    fn write_report(&mut self, content: &str) -> CovResult<()> {
        content.clone_into(&mut self.contents);
        self.writes += 1;
        Ok(())
    }
}
