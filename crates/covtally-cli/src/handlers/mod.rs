//! Command handlers
//!
//! One module per subcommand, plus record discovery shared by all of them.

pub mod merge;
pub mod report;
pub mod run;

pub use merge::execute_merge;
pub use report::{execute_report, finish_report, load_manifest_registry};
pub use run::execute_run;

use crate::error::{CliError, CliResult};
use covtally::coverage::{load_report, RunRecord};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Load run records named by files, directories or glob patterns
///
/// Directories contribute every `covtally-*.json` inside them. Files and
/// pattern matches may also be LCOV tracefiles or Go coverprofiles. A
/// pattern that matches nothing is an error; an empty directory is not.
pub fn collect_records(inputs: &[String]) -> CliResult<Vec<RunRecord>> {
    let mut records = Vec::new();
    for input in inputs {
        let path = Path::new(input);
        if path.is_dir() {
            let found = RunRecord::load_dir(path)?;
            debug!(dir = %path.display(), records = found.len(), "loaded records directory");
            records.extend(found);
        } else if path.is_file() {
            records.push(load_report(path)?);
        } else {
            for matched in expand_pattern(input)? {
                records.push(load_report(&matched)?);
            }
        }
    }
    Ok(records)
}

/// Sorted glob matches for `pattern`, which must match at least one file
pub fn expand_pattern(pattern: &str) -> CliResult<Vec<PathBuf>> {
    let paths = glob::glob(pattern)
        .map_err(|e| CliError::invalid_argument(format!("bad pattern `{pattern}`: {e}")))?;
    let mut matched = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| CliError::Io(e.into()))?;
        if path.is_file() {
            matched.push(path);
        }
    }
    if matched.is_empty() {
        return Err(CliError::invalid_argument(format!(
            "no run records match `{pattern}`"
        )));
    }
    matched.sort();
    Ok(matched)
}

/// Delete records left in `dir` by earlier runs, returning how many
pub fn clear_records(dir: &Path) -> CliResult<usize> {
    let paths = RunRecord::paths_in(dir)?;
    for path in &paths {
        std::fs::remove_file(path)?;
    }
    Ok(paths.len())
}
