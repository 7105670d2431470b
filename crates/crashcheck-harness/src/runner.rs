//! Run driver.
//!
//! [`run_suite`] runs test functions strictly in order against one
//! [`Session`] and prints the whole-run summary. [`Harness`] wraps a session
//! configured from the environment (colors, event log, crash handlers) and
//! owns the process exit on abort.

use crashcheck_core::{CRASH_SLOT, HarnessConfig, SignalPolicy, SignalTarget};

use crate::checks::{Fatal, TestResult};
use crate::error::HarnessError;
use crate::session::Session;
use crate::structured_log::{LogEmitter, default_run_id};

/// Plain test function.
pub type TestFn = fn(&mut Session) -> TestResult;

/// How a suite ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every test ran; `failed` of them did not pass.
    Completed { failed: u64 },
    /// A test was aborted; no later test ran and no run summary was printed.
    Aborted(Fatal),
}

impl RunOutcome {
    /// Process exit status for this outcome.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Completed { failed } => i32::try_from(failed).unwrap_or(i32::MAX),
            Self::Aborted(fatal) => fatal.exit_code,
        }
    }
}

/// Run `tests` in order.
///
/// Stops at the first test that returns `Err(Fatal)`; otherwise prints the
/// "TESTS FINISHED" banner and the run table.
pub fn run_suite<I, F>(session: &mut Session, tests: I) -> RunOutcome
where
    I: IntoIterator<Item = F>,
    F: FnOnce(&mut Session) -> TestResult,
{
    session.print_run_started();
    for test in tests {
        if let Err(fatal) = test(session) {
            return RunOutcome::Aborted(fatal);
        }
    }
    session.print_run_finished();

    let totals = session.tally();
    RunOutcome::Completed {
        failed: totals.tests - totals.tests_passed,
    }
}

/// A session bound to the process: real stdout/stderr, the global crash
/// slot, and optionally the event log and crash handlers.
pub struct Harness {
    session: Session,
    config: HarnessConfig,
}

impl Harness {
    /// Configure from `CRASHCHECK_*` / `NO_COLOR`.
    pub fn from_env() -> Result<Self, HarnessError> {
        Self::with_config(HarnessConfig::from_env())
    }

    pub fn with_config(config: HarnessConfig) -> Result<Self, HarnessError> {
        let log = match &config.log_path {
            Some(path) => Some(
                LogEmitter::to_file(path, &default_run_id()).map_err(|source| {
                    HarnessError::Log {
                        path: path.clone(),
                        source,
                    }
                })?,
            ),
            None => None,
        };

        let mut session = Session::new(config.color_enabled()).with_crash_slot(&CRASH_SLOT);
        if let Some(log) = log {
            session = session.with_log(log);
        }
        if config.signals == SignalPolicy::CatchAll {
            session.catch_signals(SignalTarget::CatchAll)?;
        }
        Ok(Self { session, config })
    }

    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn session(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Run `tests` and return the exit status (failed test count).
    ///
    /// An aborted test ends the process here with the abort status.
    pub fn run<I, F>(mut self, tests: I) -> i32
    where
        I: IntoIterator<Item = F>,
        F: FnOnce(&mut Session) -> TestResult,
    {
        let outcome = run_suite(&mut self.session, tests);
        let _ = self.session.flush_log();
        match outcome {
            RunOutcome::Completed { .. } => outcome.exit_code(),
            RunOutcome::Aborted(fatal) => std::process::exit(fatal.exit_code),
        }
    }
}

/// Build a [`Harness`] from the environment and run `tests`.
///
/// Setup failures are reported on stderr and yield exit status 2.
pub fn run_main<I, F>(tests: I) -> i32
where
    I: IntoIterator<Item = F>,
    F: FnOnce(&mut Session) -> TestResult,
{
    match Harness::from_env() {
        Ok(harness) => harness.run(tests),
        Err(err) => {
            eprintln!("crashcheck: {err}");
            2
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use crashcheck_core::report::Palette;
    use crashcheck_core::{ColorMode, TallySnapshot};

    use super::*;
    use crate::Severity;
    use crate::capture::SharedBuffer;

    fn session() -> (Session, SharedBuffer) {
        let out = SharedBuffer::new();
        let s = Session::with_writers(out.clone(), SharedBuffer::new(), Palette::PLAIN);
        (s, out)
    }

    fn passing(t: &mut Session) -> TestResult {
        t.start("passing");
        t.check(true, Severity::NonFatal, format_args!("a"))?;
        t.check(true, Severity::NonFatal, format_args!("b"))?;
        t.end();
        Ok(())
    }

    fn failing(t: &mut Session) -> TestResult {
        t.start("failing");
        t.check(false, Severity::NonFatal, format_args!("c"))?;
        t.end();
        Ok(())
    }

    fn empty(t: &mut Session) -> TestResult {
        t.start("empty");
        t.end();
        Ok(())
    }

    #[test]
    fn completed_suite_counts_failures() {
        let (mut s, out) = session();
        let tests: [TestFn; 3] = [passing, failing, empty];
        let outcome = run_suite(&mut s, tests);
        assert_eq!(outcome, RunOutcome::Completed { failed: 1 });
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(
            s.tally(),
            TallySnapshot {
                tests: 3,
                tests_passed: 2,
                checks_total: 3,
                checks_passed: 2,
                current_checks: 0,
                current_checks_passed: 0,
            }
        );
        let text = out.contents();
        assert!(text.starts_with(
            "\t+-------------------------------+\n\t|         STARTING TESTS        |"
        ));
        assert!(text.contains("TESTS FINISHED"));
        assert!(text.contains("\t| Tests ran            |      3 |\n"));
    }

    #[test]
    fn fatal_test_stops_the_suite() {
        let (mut s, out) = session();
        let ran_after = Cell::new(false);
        let tests: Vec<Box<dyn FnOnce(&mut Session) -> TestResult + '_>> = vec![
            Box::new(|t: &mut Session| -> TestResult {
                t.start("fatal");
                t.check(false, Severity::Fatal, format_args!("stop"))?;
                t.end();
                Ok(())
            }),
            Box::new(|t: &mut Session| {
                ran_after.set(true);
                empty(t)
            }),
        ];
        let outcome = run_suite(&mut s, tests);
        assert_eq!(outcome, RunOutcome::Aborted(Fatal { exit_code: -1 }));
        assert_eq!(outcome.exit_code(), -1);
        assert!(!ran_after.get());
        assert!(!out.contents().contains("TESTS FINISHED"));
    }

    #[test]
    fn empty_suite_succeeds() {
        let (mut s, out) = session();
        let outcome = run_suite(&mut s, Vec::<TestFn>::new());
        assert_eq!(outcome.exit_code(), 0);
        assert!(out.contents().contains("\t| Test success ratio   |    n/a |\n"));
    }

    #[test]
    fn huge_failure_count_saturates_exit_code() {
        let outcome = RunOutcome::Completed { failed: u64::MAX };
        assert_eq!(outcome.exit_code(), i32::MAX);
    }

    #[test]
    fn unwritable_log_path_is_reported() {
        let config = HarnessConfig {
            color: ColorMode::Never,
            log_path: Some("/nonexistent-crashcheck-dir/events.jsonl".into()),
            signals: SignalPolicy::None,
            no_color_env: false,
        };
        let err = Harness::with_config(config).err().unwrap();
        assert!(matches!(err, HarnessError::Log { .. }));
        assert!(err.to_string().contains("/nonexistent-crashcheck-dir/events.jsonl"));
    }
}
