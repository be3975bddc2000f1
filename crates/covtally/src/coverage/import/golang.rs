//! Go coverprofile import
//!
//! `go test -coverprofile` writes a `mode:` line followed by one line per
//! code block:
//!
//! ```text
//! mode: count
//! github.com/owner/repo/file.go:1.2,3.4 5 6
//! ```
//!
//! i.e. `file:startLine.startColumn,endLine.endColumn statements executed`.
//! Blank lines are skipped and `\r\n` endings are accepted.

use super::RecordAssembler;
use crate::coverage::{RunRecord, SourceLocation, UnitKind};
use crate::result::{CovError, CovResult};
use std::fmt;
use std::str::FromStr;

const FORMAT: &str = "go";

fn invalid(context: impl Into<String>) -> CovError {
    CovError::invalid_report(FORMAT, context)
}

/// How the profile counted executions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoMode {
    /// Whether a block ran at all; counts are 0 or 1
    Set,
    /// Execution counts, not safe under concurrency
    Count,
    /// Execution counts, safe under concurrency
    Atomic,
}

impl GoMode {
    /// Name as written after `mode: `
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Count => "count",
            Self::Atomic => "atomic",
        }
    }
}

impl fmt::Display for GoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoMode {
    type Err = CovError;

    fn from_str(s: &str) -> CovResult<Self> {
        match s {
            "set" => Ok(Self::Set),
            "count" => Ok(Self::Count),
            "atomic" => Ok(Self::Atomic),
            other => Err(invalid(format!("mode line is not valid: `mode: {other}`"))),
        }
    }
}

/// One code block of a coverprofile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoRegion {
    /// File path, usually an import path such as `github.com/o/r/f.go`
    pub file: String,
    /// First line of the block
    pub start_line: u32,
    /// Column the block starts at
    pub start_column: u32,
    /// Last line of the block
    pub end_line: u32,
    /// Column the block ends at
    pub end_column: u32,
    /// Statements in the block
    pub statements: u32,
    /// Times the block ran; not bounded by `statements`
    pub executed: u64,
}

impl GoRegion {
    fn parse(line: &str) -> Result<Self, String> {
        // Paths may contain ':' themselves; the position never does.
        let (file, position) = line.rsplit_once(':').ok_or("reading file path")?;
        if file.is_empty() {
            return Err("reading file path: empty".into());
        }
        let (start, rest) = position.split_once(',').ok_or("reading start position")?;
        let (end, rest) = rest.split_once(' ').ok_or("reading end position")?;
        let (statements, executed) = rest.split_once(' ').ok_or("reading statements")?;
        let (start_line, start_column) = start.split_once('.').ok_or("reading start line")?;
        let (end_line, end_column) = end.split_once('.').ok_or("reading end line")?;

        let region = Self {
            file: file.to_string(),
            start_line: number(start_line, "start line")?,
            start_column: number(start_column, "start column")?,
            end_line: number(end_line, "end line")?,
            end_column: number(end_column, "end column")?,
            statements: number(statements, "statements")?,
            executed: number(executed, "executed")?,
        };
        if region.end_line < region.start_line {
            return Err(format!(
                "end line {} before start line {}",
                region.end_line, region.start_line
            ));
        }
        Ok(region)
    }
}

fn number<T>(text: &str, what: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    text.parse().map_err(|e| format!("parsing {what} `{text}`: {e}"))
}

/// A parsed coverprofile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoProfile {
    /// Counting mode from the first line
    pub mode: GoMode,
    /// Blocks in file order
    pub regions: Vec<GoRegion>,
}

impl FromStr for GoProfile {
    type Err = CovError;

    fn from_str(s: &str) -> CovResult<Self> {
        let mut lines = s.lines();
        let mode_line = lines
            .next()
            .ok_or_else(|| invalid("reading mode line: empty input"))?;
        let mode = mode_line
            .strip_prefix("mode: ")
            .ok_or_else(|| invalid("mode line is not valid"))?
            .parse()?;

        let mut regions = Vec::new();
        for (idx, line) in lines.enumerate() {
            if line.is_empty() {
                continue;
            }
            let region = GoRegion::parse(line)
                .map_err(|ctx| invalid(format!("parsing region on line {}: {ctx}", idx + 2)))?;
            regions.push(region);
        }
        Ok(Self { mode, regions })
    }
}

impl GoProfile {
    /// Convert to a run record with one line probe per source line
    ///
    /// Every line a block spans gets a probe. A line shared by several
    /// blocks takes the highest count among them. Blocks without
    /// statements register no probes but still declare their file.
    ///
    /// # Errors
    ///
    /// Registry errors, which a well-formed profile never triggers
    pub fn into_record(self) -> CovResult<RunRecord> {
        let mut assembler = RecordAssembler::default();
        for region in self.regions {
            assembler.declare(&region.file)?;
            if region.statements == 0 {
                continue;
            }
            for line in region.start_line..=region.end_line {
                assembler.hit(
                    SourceLocation::line(region.file.as_str(), line),
                    UnitKind::Line,
                    region.executed,
                    u64::max,
                )?;
            }
        }
        Ok(assembler.finish())
    }
}
