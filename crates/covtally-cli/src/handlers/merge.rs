//! Merge command handler

use super::collect_records;
use crate::commands::MergeArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::Reporter;
use covtally::coverage::MergedRun;
use tracing::info;

/// Execute the merge command
pub fn execute_merge(config: &CliConfig, args: &MergeArgs) -> CliResult<()> {
    let records = collect_records(&args.records)?;
    if records.is_empty() {
        return Err(CliError::report_generation("no run records found"));
    }

    let merged = MergedRun::from_records(&records)?;
    let count = merged.records;
    let record = merged.into_record();
    record.save(&args.output)?;
    info!(records = count, output = %args.output.display(), "merged run records");

    Reporter::from_config(config).success(&format!(
        "Merged {count} records ({} probes) into {}",
        record.probes.len(),
        args.output.display()
    ));
    Ok(())
}
