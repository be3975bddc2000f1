//! Report command handler

use super::collect_records;
use crate::commands::{OutputArgs, ReportArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::Reporter;
use covtally::coverage::{
    CoverageReport, FileSink, Instrumenter, ManifestInstrumenter, MergedRun, ProbeRegistry,
    ReportFormat, ReportSink, RunRecord, StdoutSink,
};
use std::path::Path;
use tracing::info;

/// Execute the report command
pub fn execute_report(config: &CliConfig, args: &ReportArgs) -> CliResult<()> {
    let records = collect_records(&args.records)?;
    if records.is_empty() && args.output.manifest.is_none() {
        return Err(CliError::report_generation("no run records found"));
    }
    finish_report(config, &records, &args.output)
}

/// Registry populated from `--manifest`, or an empty one
pub fn load_manifest_registry(manifest: Option<&Path>) -> CliResult<ProbeRegistry> {
    let mut registry = ProbeRegistry::new();
    if let Some(path) = manifest {
        let added = ManifestInstrumenter::from_path(path)?.instrument(&mut registry)?;
        info!(manifest = %path.display(), probes = added, "loaded probe manifest");
    }
    Ok(registry)
}

/// Merge, build, write, then check the threshold
///
/// The report is written before the threshold is checked, so a run below
/// threshold still leaves its report behind.
pub fn finish_report(config: &CliConfig, records: &[RunRecord], output: &OutputArgs) -> CliResult<()> {
    let reporter = Reporter::from_config(config);
    let report = build_report(records, output.manifest.as_deref())?;

    let format = ReportFormat::from(output.format);
    let mut sink: Box<dyn ReportSink> = match &output.output {
        Some(path) => Box::new(FileSink::new(path)),
        None => Box::new(StdoutSink),
    };
    format.write(&report, sink.as_mut())?;
    info!(sink = %sink.target(), format = format.extension(), "wrote coverage report");

    reporter.summary(&report);
    if let Some(path) = &output.output {
        reporter.success(&format!("Report written to {}", path.display()));
    }
    check_threshold(&report, output.threshold)
}

/// Merge `records` on top of the manifest's probes and build the report
pub fn build_report(records: &[RunRecord], manifest: Option<&Path>) -> CliResult<CoverageReport> {
    let mut merged = MergedRun::with_registry(load_manifest_registry(manifest)?);
    for record in records {
        merged.add(record)?;
    }
    info!(
        records = merged.records,
        probes = merged.registry.len(),
        anomalies = merged.anomalies,
        "merged run records"
    );
    Ok(merged.report())
}

/// `ThresholdNotMet` when overall coverage is below `threshold`
pub fn check_threshold(report: &CoverageReport, threshold: Option<f64>) -> CliResult<()> {
    match threshold {
        Some(threshold) if !report.meets_threshold(threshold) => Err(CliError::ThresholdNotMet {
            actual: report.summary.percent,
            threshold,
        }),
        _ => Ok(()),
    }
}
