//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Coverage engine error
    #[error("Coverage error: {0}")]
    Coverage(#[from] covtally::CovError),

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Report generation error
    #[error("Report generation failed: {message}")]
    ReportGeneration {
        /// Error message
        message: String,
    },

    /// The test command could not be started
    #[error("Failed to run `{command}`: {message}")]
    CommandFailed {
        /// Command line as given
        command: String,
        /// Error message
        message: String,
    },

    /// Overall coverage below `--threshold`
    #[error("Coverage {actual:.2}% is below threshold {threshold:.2}%")]
    ThresholdNotMet {
        /// Measured overall percentage
        actual: f64,
        /// Required percentage
        threshold: f64,
    },
}

impl CliError {
    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a report generation error
    #[must_use]
    pub fn report_generation(message: impl Into<String>) -> Self {
        Self::ReportGeneration {
            message: message.into(),
        }
    }

    /// Create a command failure
    #[must_use]
    pub fn command_failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Process exit code: 2 for a missed threshold, 1 for everything else
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::ThresholdNotMet { .. } => 2,
            _ => 1,
        }
    }
}
