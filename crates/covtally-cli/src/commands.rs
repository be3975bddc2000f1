//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use covtally::coverage::ReportFormat;
use std::path::PathBuf;

/// Environment variable for the report output path
pub const OUTPUT_ENV: &str = "COVTALLY_OUTPUT";

/// Covtally: line and branch coverage for instrumented test runs
#[derive(Parser, Debug)]
#[command(name = "covtally")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an instrumented test command and report its coverage
    Run(RunArgs),

    /// Build a coverage report from run records, LCOV or Go coverprofiles
    Report(ReportArgs),

    /// Merge run records and foreign reports into a single record
    Merge(MergeArgs),
}

/// Report output options shared by `run` and `report`
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Report format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: FormatArg,

    /// Report output path (stdout when omitted)
    #[arg(short, long, env = OUTPUT_ENV)]
    pub output: Option<PathBuf>,

    /// Fail with exit code 2 when overall coverage is below this percentage
    #[arg(long, value_parser = parse_percent)]
    pub threshold: Option<f64>,

    /// Probe manifest (JSON or YAML) listing every known probe and file
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Directory the instrumented process writes run records into
    #[arg(long)]
    pub records_dir: Option<PathBuf>,

    /// Fail the instrumented process on hits to unknown probes
    #[arg(long)]
    pub strict: bool,

    /// Keep records from earlier runs in the records directory
    #[arg(long)]
    pub keep_records: bool,

    /// Report options
    #[command(flatten)]
    pub output: OutputArgs,

    /// Test command and its arguments
    #[arg(last = true, required = true, num_args = 1..)]
    pub command: Vec<String>,
}

/// Arguments for the report command
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Record or report files, record directories, or glob patterns
    #[arg(required = true, num_args = 1..)]
    pub records: Vec<String>,

    /// Report options
    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments for the merge command
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Record or report files, record directories, or glob patterns
    #[arg(required = true, num_args = 1..)]
    pub records: Vec<String>,

    /// Path of the merged record
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Report format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatArg {
    /// Pretty JSON report
    #[default]
    Json,
    /// LCOV tracefile
    Lcov,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => Self::Json,
            FormatArg::Lcov => Self::Lcov,
        }
    }
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

fn parse_percent(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("threshold must be between 0 and 100, got {value}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "covtally",
            "run",
            "--format",
            "lcov",
            "--threshold",
            "80",
            "--strict",
            "--",
            "cargo",
            "test",
            "--quiet",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.command, vec!["cargo", "test", "--quiet"]);
        assert_eq!(args.output.format, FormatArg::Lcov);
        assert_eq!(args.output.threshold, Some(80.0));
        assert!(args.strict);
    }

    #[test]
    fn test_run_requires_command() {
        assert!(Cli::try_parse_from(["covtally", "run"]).is_err());
    }

    #[test]
    fn test_parse_report_with_globals() {
        let cli =
            Cli::try_parse_from(["covtally", "report", "a.json", "dir/", "-vv", "--color", "never"])
                .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.color, ColorArg::Never);
        let Commands::Report(args) = cli.command else {
            panic!("expected report");
        };
        assert_eq!(args.records, vec!["a.json", "dir/"]);
        assert_eq!(args.output.format, FormatArg::Json);
    }

    #[test]
    fn test_parse_merge_requires_output() {
        assert!(Cli::try_parse_from(["covtally", "merge", "a.json"]).is_err());
        let cli = Cli::try_parse_from(["covtally", "merge", "a.json", "-o", "all.json"]).unwrap();
        let Commands::Merge(args) = cli.command else {
            panic!("expected merge");
        };
        assert_eq!(args.output, PathBuf::from("all.json"));
    }

    #[test]
    fn test_threshold_range() {
        assert!(parse_percent("0").is_ok());
        assert!(parse_percent("100").is_ok());
        assert!(parse_percent("100.5").is_err());
        assert!(parse_percent("-1").is_err());
        assert!(parse_percent("abc").is_err());
    }

    #[test]
    fn test_format_conversion() {
        assert_eq!(ReportFormat::from(FormatArg::Lcov), ReportFormat::Lcov);
        assert_eq!(ReportFormat::from(FormatArg::default()), ReportFormat::Json);
    }
}
