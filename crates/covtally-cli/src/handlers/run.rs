//! Run command handler
//!
//! Runs the instrumented test command with `COVTALLY_RECORDS_DIR` pointing at
//! a records directory, then reports whatever records the run left there.
//! Records that do not parse (a process killed mid-write) are skipped with a
//! warning. No records at all is an error unless a manifest supplies the
//! probes.

use super::{clear_records, report::finish_report};
use crate::commands::RunArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::Reporter;
use covtally::coverage::RunRecord;
use covtally::{RECORDS_DIR_ENV, STRICT_ENV};
use std::path::Path;
use std::process::{Command, ExitStatus};
use tracing::{debug, info, warn};

/// Execute the run command
pub fn execute_run(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    let reporter = Reporter::from_config(config);
    let records_dir = CliConfig::records_dir(args.records_dir.as_ref());

    if !args.keep_records {
        let removed = clear_records(&records_dir)?;
        if removed > 0 {
            debug!(removed, dir = %records_dir.display(), "cleared stale run records");
        }
    }
    std::fs::create_dir_all(&records_dir)?;

    let status = run_instrumented(&args.command, &records_dir, args.strict)?;
    if !status.success() {
        let message = format!("test command exited with {status}; reporting partial coverage");
        warn!(command = %args.command.join(" "), %status, "test command failed");
        reporter.warning(&message);
    }

    let (records, skipped) = RunRecord::load_dir_lenient(&records_dir)?;
    info!(
        records = records.len(),
        skipped = skipped.len(),
        dir = %records_dir.display(),
        "collected run records"
    );
    for (path, err) in &skipped {
        reporter.warning(&format!("skipped unreadable record {}: {err}", path.display()));
    }
    if records.is_empty() && args.output.manifest.is_none() {
        return Err(CliError::report_generation(format!(
            "no run records written to {}; is the command instrumented?",
            records_dir.display()
        )));
    }

    finish_report(config, &records, &args.output)
}

/// Spawn `command` with the agent's environment and wait for it
///
/// Only a failure to start is an error; the exit status is returned as is.
pub fn run_instrumented(command: &[String], records_dir: &Path, strict: bool) -> CliResult<ExitStatus> {
    let (program, rest) = command
        .split_first()
        .ok_or_else(|| CliError::invalid_argument("no test command given"))?;

    let mut child = Command::new(program);
    let _ = child.args(rest).env(RECORDS_DIR_ENV, records_dir);
    if strict {
        let _ = child.env(STRICT_ENV, "1");
    }

    info!(command = %command.join(" "), "running instrumented command");
    child
        .status()
        .map_err(|e| CliError::command_failed(command.join(" "), e.to_string()))
}
