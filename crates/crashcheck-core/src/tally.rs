//! Check and test counters.
//!
//! A [`Tally`] tracks the checks of the test that is currently running and
//! folds them into whole-run totals when the test finishes.

/// Label used for the current test when none is running.
pub const NO_TEST: &str = " -- NO TEST -- ";

/// Exit status requested when a test is aborted (observed as 255 on unix).
pub const ABORT_EXIT_CODE: i32 = -1;

/// Whole-run and per-test counters.
///
/// Invariants, upheld by every operation:
/// - `checks_passed <= checks_total`
/// - `tests_passed <= tests`
/// - `current_checks_passed <= current_checks`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    tests: u64,
    tests_passed: u64,
    checks_total: u64,
    checks_passed: u64,
    current_checks: u64,
    current_checks_passed: u64,
}

/// Plain copy of a [`Tally`], used by the reporter and by tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TallySnapshot {
    pub tests: u64,
    pub tests_passed: u64,
    pub checks_total: u64,
    pub checks_passed: u64,
    pub current_checks: u64,
    pub current_checks_passed: u64,
}

impl Tally {
    /// Create a zeroed tally.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tests: 0,
            tests_passed: 0,
            checks_total: 0,
            checks_passed: 0,
            current_checks: 0,
            current_checks_passed: 0,
        }
    }

    /// Count one evaluated check in the current test.
    pub fn record_check(&mut self) {
        self.current_checks = self.current_checks.saturating_add(1);
    }

    /// Count one successful check in the current test.
    ///
    /// The assertion layer pairs this with [`Tally::record_check`]. An
    /// unpaired success is clamped so the passed counter never overtakes the
    /// check counter.
    pub fn record_success(&mut self) {
        if self.current_checks_passed < self.current_checks {
            self.current_checks_passed += 1;
        }
    }

    /// Fold the current test into the run totals and reset it.
    ///
    /// Returns the process exit request when `aborted` is set. An aborted
    /// test is counted as run but never as passed.
    pub fn finalize_test(&mut self, aborted: bool) -> Option<i32> {
        self.tests = self.tests.saturating_add(1);
        if !aborted && self.current_test_passed() {
            self.tests_passed = self.tests_passed.saturating_add(1);
        }
        self.checks_total = self.checks_total.saturating_add(self.current_checks);
        self.checks_passed = self.checks_passed.saturating_add(self.current_checks_passed);
        self.current_checks = 0;
        self.current_checks_passed = 0;

        aborted.then_some(ABORT_EXIT_CODE)
    }

    /// Whether every check of the current test has passed so far (vacuously
    /// true with zero checks).
    #[must_use]
    pub const fn current_test_passed(&self) -> bool {
        self.current_checks == self.current_checks_passed
    }

    /// Number of finished tests that did not pass.
    #[must_use]
    pub const fn tests_failed(&self) -> u64 {
        self.tests - self.tests_passed
    }

    #[must_use]
    pub const fn current_checks(&self) -> u64 {
        self.current_checks
    }

    #[must_use]
    pub const fn current_checks_passed(&self) -> u64 {
        self.current_checks_passed
    }

    /// Copy all counters out.
    #[must_use]
    pub const fn snapshot(&self) -> TallySnapshot {
        TallySnapshot {
            tests: self.tests,
            tests_passed: self.tests_passed,
            checks_total: self.checks_total,
            checks_passed: self.checks_passed,
            current_checks: self.current_checks,
            current_checks_passed: self.current_checks_passed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_checks_counts_as_passed() {
        let mut tally = Tally::new();
        assert_eq!(tally.finalize_test(false), None);
        let snap = tally.snapshot();
        assert_eq!(snap.tests, 1);
        assert_eq!(snap.tests_passed, 1);
        assert_eq!(snap.checks_total, 0);
    }

    #[test]
    fn failed_check_fails_the_test() {
        let mut tally = Tally::new();
        tally.record_check();
        tally.record_success();
        tally.record_check();
        assert!(!tally.current_test_passed());
        tally.finalize_test(false);

        let snap = tally.snapshot();
        assert_eq!(snap.tests, 1);
        assert_eq!(snap.tests_passed, 0);
        assert_eq!(snap.checks_total, 2);
        assert_eq!(snap.checks_passed, 1);
        assert_eq!(tally.tests_failed(), 1);
    }

    #[test]
    fn abort_requests_exit_and_never_passes() {
        let mut tally = Tally::new();
        tally.record_check();
        tally.record_success();
        assert_eq!(tally.finalize_test(true), Some(ABORT_EXIT_CODE));

        let snap = tally.snapshot();
        assert_eq!(snap.tests, 1);
        assert_eq!(snap.tests_passed, 0);
        assert_eq!(snap.checks_total, 1);
        assert_eq!(snap.checks_passed, 1);
        assert_eq!(snap.current_checks, 0);
        assert_eq!(snap.current_checks_passed, 0);
    }

    #[test]
    fn unpaired_success_is_clamped() {
        let mut tally = Tally::new();
        tally.record_success();
        assert_eq!(tally.current_checks_passed(), 0);
        tally.record_check();
        tally.record_success();
        tally.record_success();
        assert_eq!(tally.current_checks_passed(), 1);
    }

    #[test]
    fn three_test_scenario_totals() {
        let mut tally = Tally::new();

        tally.record_check();
        tally.record_success();
        tally.record_check();
        tally.record_success();
        tally.finalize_test(false);

        tally.record_check();
        tally.finalize_test(false);

        tally.finalize_test(false);

        let snap = tally.snapshot();
        assert_eq!(snap.tests, 3);
        assert_eq!(snap.tests_passed, 2);
        assert_eq!(snap.checks_total, 3);
        assert_eq!(snap.checks_passed, 2);
        assert_eq!(tally.tests_failed(), 1);
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Check,
        Success,
        Finalize(bool),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => Just(Op::Check),
            4 => Just(Op::Success),
            1 => any::<bool>().prop_map(Op::Finalize),
        ]
    }

    proptest! {
        #[test]
        fn invariants_hold_for_any_sequence(ops in prop::collection::vec(op(), 0..200)) {
            let mut tally = Tally::new();
            for op in ops {
                match op {
                    Op::Check => tally.record_check(),
                    Op::Success => tally.record_success(),
                    Op::Finalize(aborted) => {
                        let before = tally.snapshot();
                        let exit = tally.finalize_test(aborted);
                        let after = tally.snapshot();
                        prop_assert_eq!(exit.is_some(), aborted);
                        prop_assert_eq!(after.current_checks, 0);
                        prop_assert_eq!(after.current_checks_passed, 0);
                        let passed_now = !aborted
                            && before.current_checks == before.current_checks_passed;
                        prop_assert_eq!(
                            after.tests_passed,
                            before.tests_passed + u64::from(passed_now)
                        );
                    }
                }
                let snap = tally.snapshot();
                prop_assert!(snap.current_checks_passed <= snap.current_checks);
                prop_assert!(snap.checks_passed <= snap.checks_total);
                prop_assert!(snap.tests_passed <= snap.tests);
            }
        }
    }
}
