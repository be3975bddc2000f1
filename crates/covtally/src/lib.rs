//! Covtally: line and branch coverage for instrumented test runs
//!
//! An instrumenter registers one probe per executable unit, injected code
//! reports hits through a [`CoverageAgent`], sessions bracket individual test
//! runs, and a [`ReportBuilder`](coverage::ReportBuilder) turns the final
//! snapshot into a deterministic per-file and per-unit report.
//!
//! ```
//! use covtally::coverage::{ProbeRegistry, SourceLocation, UnitKind};
//! use covtally::{AgentConfig, CoverageAgent};
//!
//! let mut registry = ProbeRegistry::new();
//! let once = registry.register(SourceLocation::line("src/lib.rs", 12), UnitKind::Line)?;
//! let _never = registry.register(SourceLocation::line("src/lib.rs", 4), UnitKind::Line)?;
//!
//! let agent = CoverageAgent::new(registry, AgentConfig::default());
//! let session = agent.begin_session("called_once");
//! agent.notify_hit(once);
//! let snapshot = agent.end_session(&session)?;
//! assert_eq!(snapshot.count(once), 1);
//!
//! let report = agent.report();
//! assert_eq!(report.file("src/lib.rs").map(|f| f.summary.percent), Some(50.0));
//! # Ok::<(), covtally::CovError>(())
//! ```

#![warn(missing_docs)]

mod agent;
mod config;
pub mod coverage;
mod result;

pub use agent::{CoverageAgent, LocalAgent};
pub use config::{AgentConfig, AgentConfigBuilder, ErrorMode, RECORDS_DIR_ENV, STRICT_ENV};
pub use result::{CovError, CovResult};
