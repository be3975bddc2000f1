//! LCOV Report Formatter
//!
//! Generates LCOV tracefiles for CI integration.
//!
//! ## LCOV Format
//!
//! ```text
//! TN:<test name>
//! SF:<source file>
//! DA:<line>,<execution count>
//! LF:<lines found>
//! LH:<lines hit>
//! BRDA:<line>,<block>,<branch>,<taken>
//! BRF:<branches found>
//! BRH:<branches hit>
//! end_of_record
//! ```

use crate::coverage::{CoverageReport, ReportSink, UnitKind};
use crate::result::CovResult;
use std::fmt::Write;

/// LCOV format report generator
#[derive(Debug)]
pub struct LcovFormatter<'a> {
    report: &'a CoverageReport,
    test_name: Option<String>,
}

impl<'a> LcovFormatter<'a> {
    /// Create a new LCOV formatter for a report
    #[must_use]
    pub const fn new(report: &'a CoverageReport) -> Self {
        Self {
            report,
            test_name: None,
        }
    }

    /// Set the test name for the report
    #[must_use]
    pub fn with_test_name(mut self, name: impl Into<String>) -> Self {
        self.test_name = Some(name.into());
        self
    }

    /// Generate LCOV format report as a string
    ///
    /// Files with no units still get an `SF` record so tools see them.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();

        for file in &self.report.files {
            let _ = writeln!(output, "TN:{}", self.test_name.as_deref().unwrap_or(""));
            let _ = writeln!(output, "SF:{}", file.file);

            for unit in self.report.units_in(&file.file) {
                if unit.kind == UnitKind::Line {
                    let _ = writeln!(output, "DA:{},{}", unit.line, unit.hits);
                }
            }
            let _ = writeln!(output, "LF:{}", file.lines.total);
            let _ = writeln!(output, "LH:{}", file.lines.executed);

            for unit in self.report.units_in(&file.file) {
                if unit.kind == UnitKind::Branch {
                    let _ = writeln!(
                        output,
                        "BRDA:{},0,{},{}",
                        unit.line,
                        unit.branch.unwrap_or(0),
                        unit.hits
                    );
                }
            }
            if file.branches.total > 0 {
                let _ = writeln!(output, "BRF:{}", file.branches.total);
                let _ = writeln!(output, "BRH:{}", file.branches.executed);
            }

            output.push_str("end_of_record\n");
        }

        output
    }

    /// Write the tracefile to a sink
    ///
    /// # Errors
    ///
    /// `ReportWrite` if the sink fails
    pub fn write_to(&self, sink: &mut dyn ReportSink) -> CovResult<()> {
        sink.write_report(&self.generate())
    }
}
