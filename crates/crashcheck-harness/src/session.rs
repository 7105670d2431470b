//! Test session: lifecycle, checks and muting.
//!
//! A [`Session`] owns the counters of one run. Test functions receive it as
//! `&mut Session`, bracket their work with [`Session::start`] and
//! [`Session::end`], and record checks in between.
//!
//! Lifecycle: `idle --start--> running --end/abort--> idle`. Calling `start`
//! while a test is still running is allowed; the counters of the unfinished
//! test carry over into the new one and a `test_restarted` event is logged.

use std::fmt::{self, Arguments};
use std::io::{self, Write};
use std::panic::Location;

use crashcheck_abi::{MuteError, OutputMuter, SignalError, Stream};
use crashcheck_core::report::{self, Palette};
use crashcheck_core::{
    CrashSlot, NO_TEST, Nullable, SignalKind, SignalTarget, Tally, TallySnapshot,
};

use crate::checks::{CheckResult, Fatal, Severity, Verdict};
use crate::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome};

#[derive(Clone, Copy)]
enum Channel {
    Out,
    Err,
}

pub struct Session {
    tally: Tally,
    current: Option<String>,
    palette: Palette,
    out: Box<dyn Write>,
    err: Box<dyn Write>,
    muter: OutputMuter,
    slot: Option<&'static CrashSlot>,
    log: Option<LogEmitter>,
}

impl Session {
    /// Session printing to the process's stdout and stderr.
    #[must_use]
    pub fn new(color: bool) -> Self {
        Self::with_writers(io::stdout(), io::stderr(), Palette::new(color))
    }

    /// Session printing to arbitrary writers.
    #[must_use]
    pub fn with_writers(
        out: impl Write + 'static,
        err: impl Write + 'static,
        palette: Palette,
    ) -> Self {
        Self {
            tally: Tally::new(),
            current: None,
            palette,
            out: Box::new(out),
            err: Box::new(err),
            muter: OutputMuter::new(),
            slot: None,
            log: None,
        }
    }

    /// Mirror the running test into `slot` so a signal handler can report it.
    #[must_use]
    pub fn with_crash_slot(mut self, slot: &'static CrashSlot) -> Self {
        slot.arm(self.palette.is_colored());
        self.slot = Some(slot);
        self.publish();
        self
    }

    #[must_use]
    pub fn with_log(mut self, log: LogEmitter) -> Self {
        self.log = Some(log);
        self
    }

    #[must_use]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// All counters.
    #[must_use]
    pub fn tally(&self) -> TallySnapshot {
        self.tally.snapshot()
    }

    /// Name of the running test, or [`NO_TEST`].
    #[must_use]
    pub fn current_test(&self) -> &str {
        self.current.as_deref().unwrap_or(NO_TEST)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Begin a test.
    pub fn start(&mut self, name: impl Into<String>) {
        let name = name.into();
        if let Some(previous) = self.current.as_deref() {
            let entry = LogEntry::new(LogLevel::Warn, "test_restarted")
                .with_test(&name)
                .with_counts(self.tally.current_checks(), self.tally.current_checks_passed())
                .with_details(serde_json::json!({ "previous": previous }));
            self.log(entry);
        }

        self.print(Channel::Out, |w, p| report::write_test_started(w, &name, p));
        self.log(LogEntry::new(LogLevel::Info, "test_start").with_test(&name));
        self.current = Some(name);
        self.publish();
    }

    /// Finish the running test normally.
    pub fn end(&mut self) {
        let name = self.current_test().to_string();
        let (checks, passed) = self.current_counts();
        let outcome = if self.tally.current_test_passed() {
            Outcome::Pass
        } else {
            Outcome::Fail
        };

        self.print(Channel::Out, |w, p| {
            report::write_test_summary(w, checks, passed, p)?;
            report::write_test_ended(w, &name, p)
        });
        self.tally.finalize_test(false);
        self.current = None;
        self.publish();
        self.log(
            LogEntry::new(LogLevel::Info, "test_end")
                .with_test(&name)
                .with_outcome(outcome)
                .with_counts(checks, passed),
        );
    }

    /// Abort the running test.
    ///
    /// The test is reported and finalized as failed. The returned [`Fatal`]
    /// carries the exit status the process must end with; the run driver
    /// performs the exit.
    #[must_use = "return the `Fatal` as `Err` so the run stops"]
    pub fn abort(&mut self) -> Fatal {
        let name = self.current_test().to_string();
        let (checks, passed) = self.current_counts();

        self.print(Channel::Out, |w, p| report::write_test_summary(w, checks, passed, p));
        self.print(Channel::Err, |w, p| report::write_abort_banner(w, &name, p));
        let exit_code = self
            .tally
            .finalize_test(true)
            .unwrap_or(crashcheck_core::ABORT_EXIT_CODE);
        self.current = None;
        self.publish();
        self.log(
            LogEntry::new(LogLevel::Fatal, "test_abort")
                .with_test(&name)
                .with_outcome(Outcome::Abort)
                .with_counts(checks, passed)
                .with_exit_code(exit_code),
        );
        Fatal { exit_code }
    }

    // -----------------------------------------------------------------------
    // Checks
    // -----------------------------------------------------------------------

    /// Record one check.
    ///
    /// A failure prints `<file> [<line>]: <message>` to stderr, with the
    /// caller's location. A fatal failure also aborts the test and returns
    /// `Err(Fatal)`.
    #[track_caller]
    pub fn check(
        &mut self,
        passed: bool,
        severity: Severity,
        message: Arguments<'_>,
    ) -> CheckResult {
        let at = Location::caller();
        self.tally.record_check();
        if passed {
            self.tally.record_success();
            self.publish();
            return Ok(Verdict::Passed);
        }
        self.publish();

        self.print(Channel::Err, |w, p| {
            report::write_check_failure(w, at.file(), at.line(), message, p)
        });
        if self.log.is_some() {
            let entry = LogEntry::new(LogLevel::Error, "check_failed")
                .with_test(self.current_test())
                .with_details(serde_json::json!({
                    "file": at.file(),
                    "line": at.line(),
                    "message": message.to_string(),
                    "fatal": severity == Severity::Fatal,
                }));
            self.log(entry);
        }

        match severity {
            Severity::NonFatal => Ok(Verdict::Failed),
            Severity::Fatal => Err(self.abort()),
        }
    }

    #[track_caller]
    pub fn check_true(
        &mut self,
        cond: bool,
        severity: Severity,
        message: Arguments<'_>,
    ) -> CheckResult {
        self.check(cond, severity, message)
    }

    #[track_caller]
    pub fn check_false(
        &mut self,
        cond: bool,
        severity: Severity,
        message: Arguments<'_>,
    ) -> CheckResult {
        self.check(!cond, severity, message)
    }

    #[track_caller]
    pub fn check_null<N: Nullable + ?Sized>(
        &mut self,
        value: &N,
        severity: Severity,
        message: Arguments<'_>,
    ) -> CheckResult {
        self.check(value.is_null_value(), severity, message)
    }

    #[track_caller]
    pub fn check_not_null<N: Nullable + ?Sized>(
        &mut self,
        value: &N,
        severity: Severity,
        message: Arguments<'_>,
    ) -> CheckResult {
        self.check(!value.is_null_value(), severity, message)
    }

    #[track_caller]
    pub fn check_eq<L, R>(
        &mut self,
        left: &L,
        right: &R,
        severity: Severity,
        message: Arguments<'_>,
    ) -> CheckResult
    where
        L: PartialEq<R> + ?Sized,
        R: ?Sized,
    {
        self.check(left == right, severity, message)
    }

    #[track_caller]
    pub fn check_ne<L, R>(
        &mut self,
        left: &L,
        right: &R,
        severity: Severity,
        message: Arguments<'_>,
    ) -> CheckResult
    where
        L: PartialEq<R> + ?Sized,
        R: ?Sized,
    {
        self.check(left != right, severity, message)
    }

    #[track_caller]
    pub fn check_gt<L, R>(
        &mut self,
        left: &L,
        right: &R,
        severity: Severity,
        message: Arguments<'_>,
    ) -> CheckResult
    where
        L: PartialOrd<R> + ?Sized,
        R: ?Sized,
    {
        self.check(left > right, severity, message)
    }

    #[track_caller]
    pub fn check_lt<L, R>(
        &mut self,
        left: &L,
        right: &R,
        severity: Severity,
        message: Arguments<'_>,
    ) -> CheckResult
    where
        L: PartialOrd<R> + ?Sized,
        R: ?Sized,
    {
        self.check(left < right, severity, message)
    }

    #[track_caller]
    pub fn check_ge<L, R>(
        &mut self,
        left: &L,
        right: &R,
        severity: Severity,
        message: Arguments<'_>,
    ) -> CheckResult
    where
        L: PartialOrd<R> + ?Sized,
        R: ?Sized,
    {
        self.check(left >= right, severity, message)
    }

    #[track_caller]
    pub fn check_le<L, R>(
        &mut self,
        left: &L,
        right: &R,
        severity: Severity,
        message: Arguments<'_>,
    ) -> CheckResult
    where
        L: PartialOrd<R> + ?Sized,
        R: ?Sized,
    {
        self.check(left <= right, severity, message)
    }

    // -----------------------------------------------------------------------
    // Streams and signals
    // -----------------------------------------------------------------------

    /// Silence `stream` until [`Session::unmute`]. No-op when already muted.
    pub fn mute(&mut self, stream: Stream) -> Result<(), MuteError> {
        if self.muter.mute(stream)? {
            self.log(LogEntry::new(LogLevel::Debug, "stream_muted").with_stream(stream));
        }
        Ok(())
    }

    /// Restore `stream`. No-op when not muted.
    pub fn unmute(&mut self, stream: Stream) -> Result<(), MuteError> {
        if self.muter.unmute(stream)? {
            self.log(LogEntry::new(LogLevel::Debug, "stream_unmuted").with_stream(stream));
        }
        Ok(())
    }

    #[must_use]
    pub fn is_muted(&self, stream: Stream) -> bool {
        self.muter.is_muted(stream)
    }

    /// Install the crash handler for `target`, announcing on stderr each kind
    /// that had no handler yet.
    pub fn catch_signals(&mut self, target: impl Into<SignalTarget>) -> Result<(), SignalError> {
        let target = target.into();
        let fresh: Vec<SignalKind> = target
            .kinds()
            .iter()
            .copied()
            .filter(|&kind| !crashcheck_abi::installed(kind))
            .collect();
        crashcheck_abi::install(target)?;
        for kind in fresh {
            self.print(Channel::Err, |w, p| report::write_handler_added(w, kind, p));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Run-level output (used by the run driver)
    // -----------------------------------------------------------------------

    pub(crate) fn print_run_started(&mut self) {
        self.print(Channel::Out, |w, p| report::write_run_started(w, p));
        self.log(LogEntry::new(LogLevel::Info, "run_start"));
    }

    pub(crate) fn print_run_finished(&mut self) {
        let totals = self.tally.snapshot();
        self.print(Channel::Out, |w, p| {
            report::write_run_finished(w, p)?;
            report::write_run_summary(w, &totals, p)
        });
        self.log(
            LogEntry::new(LogLevel::Info, "run_end")
                .with_counts(totals.checks_total, totals.checks_passed)
                .with_details(serde_json::json!({
                    "tests": totals.tests,
                    "tests_passed": totals.tests_passed,
                })),
        );
    }

    /// Flush the event log, if any.
    pub fn flush_log(&mut self) -> io::Result<()> {
        match self.log.as_mut() {
            Some(log) => log.flush(),
            None => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn current_counts(&self) -> (u64, u64) {
        (self.tally.current_checks(), self.tally.current_checks_passed())
    }

    /// Render and write to one channel. Console output is best-effort.
    fn print<F>(&mut self, channel: Channel, render: F)
    where
        F: FnOnce(&mut String, &Palette) -> fmt::Result,
    {
        let mut text = String::new();
        let _ = render(&mut text, &self.palette);
        let w = match channel {
            Channel::Out => &mut self.out,
            Channel::Err => &mut self.err,
        };
        let _ = w.write_all(text.as_bytes());
        let _ = w.flush();
    }

    fn publish(&self) {
        if let Some(slot) = self.slot {
            slot.store_name(self.current_test());
            slot.store_counts(self.tally.current_checks(), self.tally.current_checks_passed());
        }
    }

    fn log(&mut self, entry: LogEntry) {
        if let Some(log) = self.log.as_mut() {
            let _ = log.emit_entry(entry);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(slot) = self.slot {
            slot.disarm();
        }
        let _ = self.flush_log();
    }
}
