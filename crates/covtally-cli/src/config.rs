//! Settings shared by every subcommand
//!
//! Built once in `main` from the global flags and handed to the handlers.

use std::path::{Path, PathBuf};

/// Where `covtally run` points instrumented processes without `--records-dir`
pub const DEFAULT_RECORDS_DIR: &str = "target/covtally/records";

/// How much covtally says on stderr
///
/// Report output on stdout is never affected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// `-q`: errors only, no summary
    Quiet,
    /// Summary line and warnings
    #[default]
    Normal,
    /// `-v`: per-file coverage table
    Verbose,
    /// `-vv` and up: engine debug logs too
    Debug,
}

impl Verbosity {
    /// `-q` wins over any number of `-v`
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Debug,
        }
    }

    /// Whether the summary is suppressed
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Whether per-file detail is printed
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Tracing filter for when `RUST_LOG` is unset
    #[must_use]
    pub const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
        }
    }
}

/// `--color` setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Color even when piped
    Always,
    /// Color when the terminal supports it
    #[default]
    Auto,
    /// Plain text
    Never,
}

impl ColorChoice {
    /// Resolve against the terminal
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => console::Term::stderr().features().colors_supported(),
        }
    }
}

/// Global settings
#[derive(Debug, Clone, Copy, Default)]
pub struct CliConfig {
    /// Stderr chattiness
    pub verbosity: Verbosity,
    /// Whether status lines are colored
    pub color: ColorChoice,
}

impl CliConfig {
    /// Normal verbosity, automatic color
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Replace the color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// `--records-dir` if given, else [`DEFAULT_RECORDS_DIR`]
    #[must_use]
    pub fn records_dir(requested: Option<&PathBuf>) -> PathBuf {
        requested.map_or_else(|| Path::new(DEFAULT_RECORDS_DIR).to_path_buf(), Clone::clone)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_overrides_verbose_flags() {
        assert_eq!(Verbosity::from_flags(true, 3), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, 0), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(false, 1), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, 5), Verbosity::Debug);
    }

    #[test]
    fn test_levels() {
        assert!(Verbosity::Quiet.is_quiet());
        assert!(!Verbosity::Normal.is_verbose());
        assert!(Verbosity::Debug.is_verbose());
        assert_eq!(Verbosity::Normal.log_filter(), "warn");
        assert_eq!(Verbosity::Verbose.log_filter(), "info");
    }

    #[test]
    fn test_fixed_color_choices() {
        assert!(ColorChoice::Always.should_color());
        assert!(!ColorChoice::Never.should_color());
    }

    #[test]
    fn test_records_dir_fallback() {
        assert_eq!(CliConfig::records_dir(None), PathBuf::from(DEFAULT_RECORDS_DIR));
        let custom = PathBuf::from("/tmp/cov");
        assert_eq!(CliConfig::records_dir(Some(&custom)), custom);
    }

    #[test]
    fn test_defaults() {
        let config = CliConfig::new();
        assert_eq!(config.verbosity, Verbosity::Normal);
        assert_eq!(config.color, ColorChoice::Auto);
        let config = config.with_color(ColorChoice::Never);
        assert_eq!(config.color, ColorChoice::Never);
    }
}
