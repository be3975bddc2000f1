//! Covtally CLI Library
//!
//! Command-line front end for the covtally coverage engine: run an
//! instrumented test command, merge the run records it leaves behind and
//! write JSON or LCOV reports.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)] // String building is clear and correct
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;

pub use commands::{
    Cli, ColorArg, Commands, FormatArg, MergeArgs, OutputArgs, ReportArgs, RunArgs, OUTPUT_ENV,
};
pub use config::{CliConfig, ColorChoice, Verbosity, DEFAULT_RECORDS_DIR};
pub use error::{CliError, CliResult};
pub use output::{format_percent, format_summary, render_summary, Reporter};
