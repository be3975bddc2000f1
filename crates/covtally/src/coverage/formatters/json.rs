//! JSON Report Formatter
//!
//! The full [`CoverageReport`] as pretty-printed JSON: one record per file
//! with executed/total/percent and one record per probe with file, line,
//! branch and hit count.

use crate::coverage::{CoverageReport, ReportSink};
use crate::result::CovResult;

/// JSON format report generator
#[derive(Debug)]
pub struct JsonFormatter<'a> {
    report: &'a CoverageReport,
}

impl<'a> JsonFormatter<'a> {
    /// Create a new JSON formatter for a report
    #[must_use]
    pub const fn new(report: &'a CoverageReport) -> Self {
        Self { report }
    }

    /// Generate the JSON document
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn generate(&self) -> CovResult<String> {
        let mut json = serde_json::to_string_pretty(self.report)?;
        json.push('\n');
        Ok(json)
    }

    /// Write the document to a sink
    ///
    /// # Errors
    ///
    /// `ReportWrite` if the sink fails
    pub fn write_to(&self, sink: &mut dyn ReportSink) -> CovResult<()> {
        sink.write_report(&self.generate()?)
    }
}
