//! Covtally CLI: coverage for instrumented test runs
//!
//! ## Usage
//!
//! ```bash
//! covtally run -- cargo test                      # Run and report to stdout
//! covtally run --format lcov -o lcov.info -- ./t  # LCOV file
//! covtally run --threshold 80 -- ./t              # Exit 2 below 80%
//! covtally report target/covtally/records         # Report existing records
//! covtally report lcov.info cover.out             # Report LCOV and Go output
//! covtally merge 'shards/*.json' -o merged.json   # Merge records
//! ```

use clap::Parser;
use covtally_cli::{
    handlers::{execute_merge, execute_report, execute_run},
    Cli, CliConfig, CliResult, ColorChoice, Commands, Reporter, Verbosity,
};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_tracing(config.verbosity);

    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            Reporter::from_config(&config).failure(&e.to_string());
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: &Cli, config: &CliConfig) -> CliResult<()> {
    match &cli.command {
        Commands::Run(args) => execute_run(config, args),
        Commands::Report(args) => execute_report(config, args),
        Commands::Merge(args) => execute_merge(config, args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color: ColorChoice = cli.color.into();
    CliConfig::new().with_verbosity(verbosity).with_color(color)
}

/// `RUST_LOG` wins; otherwise the level follows `-q`/`-v`
fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_build_config_quiet_wins() {
        let cli = parse(&["covtally", "-q", "-vv", "report", "x"]);
        assert_eq!(build_config(&cli).verbosity, Verbosity::Quiet);
    }

    #[test]
    fn test_build_config_color() {
        let cli = parse(&["covtally", "--color", "always", "report", "x"]);
        let config = build_config(&cli);
        assert_eq!(config.color, ColorChoice::Always);
        assert_eq!(config.verbosity, Verbosity::Normal);
    }
}
