//! Test harness for native executables.
//!
//! This crate provides:
//! - [`Session`]: test lifecycle (start/end/abort), checks and stream muting
//! - check macros: [`check!`], [`check_eq!`], [`check_lt!`], [`check_null!`], ...
//! - [`run_suite`] / [`Harness`]: the ordered run driver and whole-run summary
//! - [`structured_log`]: optional JSONL event log
//!
//! A fatal check aborts the test and is surfaced as [`Fatal`]; propagate it
//! with `?` and the run driver ends the process with the abort status. Fatal
//! signals are reported through the crash slot and end the process with the
//! signal number.
//!
//! ```no_run
//! use crashcheck_harness::{Session, Severity, TestResult, check_eq, run_main};
//!
//! fn addition(t: &mut Session) -> TestResult {
//!     t.start("addition");
//!     check_eq!(t, 2 + 2, 4, Severity::NonFatal, "2 + 2 should be 4")?;
//!     t.end();
//!     Ok(())
//! }
//!
//! fn main() {
//!     std::process::exit(run_main([addition]));
//! }
//! ```

#![forbid(unsafe_code)]

pub mod capture;
mod checks;
pub mod error;
pub mod runner;
pub mod session;
pub mod structured_log;

pub use checks::{CheckResult, Fatal, Severity, TestResult, Verdict};
pub use crashcheck_abi::Stream;
pub use crashcheck_core::{HarnessConfig, SignalKind, SignalTarget};
pub use error::HarnessError;
pub use runner::{Harness, RunOutcome, TestFn, run_main, run_suite};
pub use session::Session;
