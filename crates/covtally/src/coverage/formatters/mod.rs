//! Coverage Report Formatters
//!
//! JSON and LCOV renderings of a [`CoverageReport`](crate::coverage::CoverageReport).

mod json;
mod lcov;

pub use json::JsonFormatter;
pub use lcov::LcovFormatter;

use crate::coverage::{CoverageReport, ReportSink};
use crate::result::CovResult;
use serde::{Deserialize, Serialize};

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Pretty JSON of the whole report
    #[default]
    Json,
    /// LCOV tracefile
    Lcov,
}

impl ReportFormat {
    /// Render a report in this format
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn render(self, report: &CoverageReport) -> CovResult<String> {
        match self {
            Self::Json => JsonFormatter::new(report).generate(),
            Self::Lcov => Ok(LcovFormatter::new(report).generate()),
        }
    }

    /// Render and write a report
    ///
    /// # Errors
    ///
    /// Serialization errors, or `ReportWrite` if the sink fails
    pub fn write(self, report: &CoverageReport, sink: &mut dyn ReportSink) -> CovResult<()> {
        sink.write_report(&self.render(report)?)
    }

    /// Conventional file extension
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Lcov => "lcov",
        }
    }
}
