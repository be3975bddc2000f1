//! Terminal output
//!
//! Everything human-readable goes to stderr so a report written to stdout
//! stays machine-readable.

use crate::config::CliConfig;
use console::{style, Style, Term};
use covtally::coverage::{CoverageReport, CoverageSummary};

/// Human-readable status lines and coverage summaries
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
    /// Print per-file tables
    pub verbose: bool,
}

impl Reporter {
    /// Create a reporter on stderr
    #[must_use]
    pub fn new(use_color: bool, quiet: bool, verbose: bool) -> Self {
        Self {
            term: Term::stderr(),
            use_color,
            quiet,
            verbose,
        }
    }

    /// Reporter matching the CLI configuration
    #[must_use]
    pub fn from_config(config: &CliConfig) -> Self {
        Self::new(
            config.color.should_color(),
            config.verbosity.is_quiet(),
            config.verbosity.is_verbose(),
        )
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "OK".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure message, even in quiet mode
    pub fn failure(&self, message: &str) {
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print the coverage summary
    pub fn summary(&self, report: &CoverageReport) {
        if self.quiet {
            return;
        }
        for line in render_summary(report, self.use_color, self.verbose).lines() {
            let _ = self.term.write_line(line);
        }
    }
}

/// Summary text: per-file rows when `per_file`, then the totals
#[must_use]
pub fn render_summary(report: &CoverageReport, use_color: bool, per_file: bool) -> String {
    let mut out = String::new();
    if per_file {
        let width = report
            .files
            .iter()
            .map(|f| f.file.len())
            .max()
            .unwrap_or(0)
            .max(4);
        for file in &report.files {
            out.push_str(&format!(
                "{:<width$}  {}\n",
                file.file,
                format_summary(&file.summary, use_color)
            ));
        }
    }
    out.push_str(&format!(
        "Coverage: {} (lines {}, branches {})\n",
        format_summary(&report.summary, use_color),
        format_percent(report.lines.percent, use_color),
        format_percent(report.branches.percent, use_color),
    ));
    if report.warnings > 0 {
        out.push_str(&format!(
            "{} anomalies recorded; report is best-effort\n",
            report.warnings
        ));
    }
    out
}

/// `executed/total (pct%)`
#[must_use]
pub fn format_summary(summary: &CoverageSummary, use_color: bool) -> String {
    format!(
        "{}/{} ({})",
        summary.executed,
        summary.total,
        format_percent(summary.percent, use_color)
    )
}

/// Percentage with two decimals, colored by band when `use_color`
#[must_use]
pub fn format_percent(percent: f64, use_color: bool) -> String {
    let text = format!("{percent:.2}%");
    if !use_color {
        return text;
    }
    let band = if percent >= 80.0 {
        Style::new().green()
    } else if percent >= 50.0 {
        Style::new().yellow()
    } else {
        Style::new().red()
    };
    band.apply_to(text).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use covtally::coverage::{HitCounter, ProbeRegistry, ReportBuilder, SourceLocation, UnitKind};

    fn report() -> CoverageReport {
        let mut reg = ProbeRegistry::new();
        let hit = reg.register(SourceLocation::line("src/a.rs", 1), UnitKind::Line).unwrap();
        let _ = reg.register(SourceLocation::line("src/a.rs", 2), UnitKind::Line).unwrap();
        let _ = reg.register(SourceLocation::line("src/b.rs", 1), UnitKind::Line).unwrap();
        let counter = HitCounter::new(reg);
        counter.increment(hit).unwrap();
        ReportBuilder::new()
            .with_warnings(2)
            .build(&counter.snapshot(), counter.registry())
    }

    #[test]
    fn test_format_percent_plain() {
        assert_eq!(format_percent(50.0, false), "50.00%");
        assert_eq!(format_percent(100.0, false), "100.00%");
    }

    #[test]
    fn test_render_summary_totals() {
        let text = render_summary(&report(), false, false);
        assert!(text.contains("Coverage: 1/3 (33.33%)"));
        assert!(text.contains("2 anomalies"));
        assert!(!text.contains("src/a.rs"));
    }

    #[test]
    fn test_render_summary_per_file() {
        let text = render_summary(&report(), false, true);
        let a = text.lines().next().unwrap();
        assert!(a.starts_with("src/a.rs"));
        assert!(a.ends_with("1/2 (50.00%)"));
        assert!(text.contains("src/b.rs  0/1 (0.00%)"));
    }

    #[test]
    fn test_reporter_messages_do_not_panic() {
        let reporter = Reporter::new(false, false, true);
        reporter.success("done");
        reporter.warning("careful");
        reporter.failure("broken");
        reporter.summary(&report());
    }

    #[test]
    fn test_quiet_reporter() {
        let reporter = Reporter::new(false, true, false);
        assert!(reporter.quiet);
        reporter.summary(&report());
    }
}
