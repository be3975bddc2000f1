//! LCOV tracefile import
//!
//! Reads the records that carry per-unit data:
//!
//! - `TN:<test name>`
//! - `SF:<source file>` opens a file section, `end_of_record` closes it
//! - `DA:<line>,<count>[,<checksum>]`
//! - `BRDA:<line>,[e]<block>,<branch>,<taken>` where `taken` is `-` when the
//!   enclosing block never ran
//!
//! Function records, summary counters (`LF`, `LH`, `BRF`, `BRH`, ...) and
//! `#` comments are skipped; summaries are recomputed from the units.

use super::RecordAssembler;
use crate::coverage::{RunRecord, SourceLocation, UnitKind};
use crate::result::{CovError, CovResult};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

const FORMAT: &str = "lcov";

fn invalid(line: usize, context: impl std::fmt::Display) -> CovError {
    CovError::invalid_report(FORMAT, format!("line {line}: {context}"))
}

/// One `BRDA` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LcovBranch {
    /// Line the branch is on
    pub line: u32,
    /// Block id, with the exception marker stripped
    pub block: u32,
    /// Whether the block was marked `e` (exception path)
    pub exception: bool,
    /// Branch id within the block; newer lcov writes expressions here
    pub branch: String,
    /// Times taken, `None` for `-`
    pub taken: Option<u64>,
}

/// One `SF` .. `end_of_record` section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LcovFile {
    /// Source file path
    pub path: String,
    /// `(line, count)` pairs from `DA`
    pub lines: Vec<(u32, u64)>,
    /// Entries from `BRDA`
    pub branches: Vec<LcovBranch>,
}

/// A parsed tracefile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LcovTracefile {
    /// First non-empty `TN` value
    pub test_name: Option<String>,
    /// File sections in order
    pub files: Vec<LcovFile>,
}

impl FromStr for LcovTracefile {
    type Err = CovError;

    fn from_str(s: &str) -> CovResult<Self> {
        let mut tracefile = Self::default();
        let mut current: Option<LcovFile> = None;

        for (idx, raw) in s.lines().enumerate() {
            let number = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line == "end_of_record" {
                let file = current
                    .take()
                    .ok_or_else(|| invalid(number, "end_of_record without SF"))?;
                tracefile.files.push(file);
                continue;
            }

            let (tag, value) = line
                .split_once(':')
                .ok_or_else(|| invalid(number, format!("expected `TAG:value`, got `{line}`")))?;
            match tag {
                "TN" => {
                    if tracefile.test_name.is_none() && !value.is_empty() {
                        tracefile.test_name = Some(value.to_string());
                    }
                }
                "SF" => {
                    if let Some(open) = &current {
                        return Err(invalid(
                            number,
                            format!("SF before end_of_record of {}", open.path),
                        ));
                    }
                    if value.is_empty() {
                        return Err(invalid(number, "empty SF"));
                    }
                    current = Some(LcovFile {
                        path: value.to_string(),
                        ..LcovFile::default()
                    });
                }
                "DA" => {
                    let file = current
                        .as_mut()
                        .ok_or_else(|| invalid(number, "DA outside of SF"))?;
                    file.lines.push(parse_da(value).map_err(|e| invalid(number, e))?);
                }
                "BRDA" => {
                    let file = current
                        .as_mut()
                        .ok_or_else(|| invalid(number, "BRDA outside of SF"))?;
                    file.branches.push(parse_brda(value).map_err(|e| invalid(number, e))?);
                }
                "VER" | "FN" | "FNL" | "FNA" | "FNDA" | "FNF" | "FNH" | "LF" | "LH" | "BRF"
                | "BRH" => {}
                other => debug!(tag = other, line = number, "skipping unknown LCOV record"),
            }
        }

        // Some writers drop the final end_of_record.
        if let Some(file) = current {
            tracefile.files.push(file);
        }
        Ok(tracefile)
    }
}

fn parse_da(value: &str) -> Result<(u32, u64), String> {
    let mut fields = value.split(',');
    let line = fields.next().unwrap_or_default();
    let count = fields.next().ok_or_else(|| format!("DA needs a count: `{value}`"))?;
    let line = line
        .parse()
        .map_err(|e| format!("DA line `{line}`: {e}"))?;
    let count = count
        .parse()
        .map_err(|e| format!("DA count `{count}`: {e}"))?;
    Ok((line, count))
}

fn parse_brda(value: &str) -> Result<LcovBranch, String> {
    let fields: Vec<&str> = value.split(',').collect();
    let [line, block, branch, taken] = fields[..] else {
        return Err(format!("BRDA needs 4 fields: `{value}`"));
    };
    let (exception, block) = match block.strip_prefix('e') {
        Some(rest) => (true, rest),
        None => (false, block),
    };
    Ok(LcovBranch {
        line: line
            .parse()
            .map_err(|e| format!("BRDA line `{line}`: {e}"))?,
        block: block
            .parse()
            .map_err(|e| format!("BRDA block `{block}`: {e}"))?,
        exception,
        branch: branch.to_string(),
        taken: match taken {
            "-" => None,
            n => Some(n.parse().map_err(|e| format!("BRDA taken `{n}`: {e}"))?),
        },
    })
}

impl LcovTracefile {
    /// Convert to a run record
    ///
    /// `DA` entries become line probes. `BRDA` entries become branch probes
    /// whose index is the entry's position among the distinct branches of
    /// its line, in file order. Repeated entries for the same unit (as in
    /// concatenated tracefiles) add up.
    ///
    /// # Errors
    ///
    /// Registry errors, which a well-formed tracefile never triggers
    pub fn into_record(self) -> CovResult<RunRecord> {
        let mut assembler = RecordAssembler::default();
        for file in self.files {
            assembler.declare(&file.path)?;
            for (line, count) in file.lines {
                assembler.hit(
                    SourceLocation::line(file.path.as_str(), line),
                    UnitKind::Line,
                    count,
                    u64::saturating_add,
                )?;
            }

            let mut arms: HashMap<(u32, bool, u32, String), u32> = HashMap::new();
            let mut next: HashMap<u32, u32> = HashMap::new();
            for branch in file.branches {
                let key = (branch.line, branch.exception, branch.block, branch.branch);
                let index = *arms.entry(key).or_insert_with(|| {
                    let slot = next.entry(branch.line).or_insert(0);
                    *slot += 1;
                    *slot - 1
                });
                assembler.hit(
                    SourceLocation::branch(file.path.as_str(), branch.line, index),
                    UnitKind::Branch,
                    branch.taken.unwrap_or(0),
                    u64::saturating_add,
                )?;
            }
        }
        Ok(assembler.finish())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::coverage::{LcovFormatter, ReportBuilder};

    const TRACEFILE: &str = "TN:unit\n\
SF:src/game.rs\n\
FN:3,play\n\
FNDA:2,play\n\
FNF:1\n\
FNH:1\n\
DA:3,2\n\
DA:4,0\n\
DA:5,2,abcdef\n\
BRDA:4,0,0,2\n\
BRDA:4,0,1,-\n\
BRF:2\n\
BRH:1\n\
LF:3\n\
LH:2\n\
end_of_record\n\
# trailing comment\n\
SF:src/empty.rs\n\
end_of_record\n";

    #[test]
    fn test_parse_tracefile() {
        let trace: LcovTracefile = TRACEFILE.parse().unwrap();
        assert_eq!(trace.test_name.as_deref(), Some("unit"));
        assert_eq!(trace.files.len(), 2);
        let game = &trace.files[0];
        assert_eq!(game.path, "src/game.rs");
        assert_eq!(game.lines, vec![(3, 2), (4, 0), (5, 2)]);
        assert_eq!(game.branches[0].taken, Some(2));
        assert_eq!(game.branches[1].taken, None);
        assert!(trace.files[1].lines.is_empty());
    }

    #[test]
    fn test_into_record_keeps_lines_and_branches() {
        let record = TRACEFILE.parse::<LcovTracefile>().unwrap().into_record().unwrap();
        assert_eq!(record.files, vec!["src/empty.rs", "src/game.rs"]);
        assert_eq!(record.probes.len(), 5);

        let report = ReportBuilder::new().build(&record.snapshot, &record.registry().unwrap());
        let game = report.file("src/game.rs").unwrap();
        assert_eq!((game.lines.executed, game.lines.total), (2, 3));
        assert_eq!((game.branches.executed, game.branches.total), (1, 2));
        assert_eq!(report.file("src/empty.rs").unwrap().summary.percent, 100.0);
    }

    #[test]
    fn test_formatter_output_matches_tracefile() {
        let record = TRACEFILE.parse::<LcovTracefile>().unwrap().into_record().unwrap();
        let report = ReportBuilder::new().build(&record.snapshot, &record.registry().unwrap());
        let lcov = LcovFormatter::new(&report).generate();
        assert!(lcov.contains("DA:3,2\nDA:4,0\nDA:5,2\n"));
        assert!(lcov.contains("BRDA:4,0,0,2\nBRDA:4,0,1,0\n"));
    }

    #[test]
    fn test_distinct_blocks_get_distinct_indices() {
        let text = "SF:a.c\nBRDA:7,0,0,1\nBRDA:7,1,0,0\nBRDA:7,e2,0,3\nBRDA:7,0,0,4\nend_of_record\n";
        let record = text.parse::<LcovTracefile>().unwrap().into_record().unwrap();
        let registry = record.registry().unwrap();
        let count = |branch| {
            record
                .snapshot
                .count(registry.lookup(&SourceLocation::branch("a.c", 7, branch)).unwrap())
        };
        assert_eq!(registry.len(), 3);
        assert_eq!(count(0), 5);
        assert_eq!(count(1), 0);
        assert_eq!(count(2), 3);
    }

    #[test]
    fn test_repeated_sections_add_up() {
        let text = "SF:a.rs\nDA:1,2\nend_of_record\nSF:a.rs\nDA:1,3\nDA:2,0\nend_of_record\n";
        let record = text.parse::<LcovTracefile>().unwrap().into_record().unwrap();
        assert_eq!(record.probes.len(), 2);
        assert_eq!(record.snapshot.total_hits(), 5);
    }

    #[test]
    fn test_missing_final_end_of_record_is_tolerated() {
        let trace: LcovTracefile = "SF:a.rs\r\nDA:1,1\r\n".parse().unwrap();
        assert_eq!(trace.files[0].lines, vec![(1, 1)]);
    }

    #[test]
    fn test_malformed_tracefiles_are_rejected() {
        let cases = [
            "DA:1,1\n",
            "SF:a.rs\nSF:b.rs\n",
            "end_of_record\n",
            "SF:a.rs\nDA:x,1\n",
            "SF:a.rs\nDA:1\n",
            "SF:a.rs\nBRDA:1,0,0\n",
            "SF:a.rs\nBRDA:1,0,0,many\n",
            "SF:\n",
            "SF:a.rs\nnot a record\n",
        ];
        for case in cases {
            let result = case.parse::<LcovTracefile>();
            assert!(
                matches!(result, Err(CovError::InvalidReport { format: "lcov", .. })),
                "accepted {case:?}"
            );
        }
    }

    #[test]
    fn test_error_names_the_line() {
        let err = "SF:a.rs\nDA:1,1\nDA:oops\n".parse::<LcovTracefile>().unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }
}
