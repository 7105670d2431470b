//! Check outcomes and the check macros.
//!
//! Every macro expands to a [`Session`](crate::Session) method call and
//! evaluates to a [`CheckResult`]; the caller decides whether to propagate a
//! fatal outcome with `?`.

/// How a failing check affects the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Record, report, keep going.
    NonFatal,
    /// Record, report, abort the test and end the run.
    Fatal,
}

/// Outcome of a check that did not abort the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed,
}

impl Verdict {
    #[must_use]
    pub fn passed(self) -> bool {
        self == Self::Passed
    }
}

/// A fatal check failed (or the test was aborted explicitly). The test has
/// already been finalized; the process must end with `exit_code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("test aborted by a fatal check (exit code {exit_code})")]
#[must_use = "a fatal outcome must be propagated with `?`"]
pub struct Fatal {
    pub exit_code: i32,
}

pub type CheckResult = Result<Verdict, Fatal>;

/// What test functions return.
pub type TestResult = Result<(), Fatal>;

/// Generic boolean check.
///
/// `check!(t, cond, Severity::NonFatal, "format {}", args)`
#[macro_export]
macro_rules! check {
    ($session:expr, $cond:expr, $severity:expr $(,)?) => {
        $session.check($cond, $severity, format_args!("check failed: {}", stringify!($cond)))
    };
    ($session:expr, $cond:expr, $severity:expr, $($fmt:tt)+) => {
        $session.check($cond, $severity, format_args!($($fmt)+))
    };
}

#[macro_export]
macro_rules! check_true {
    ($session:expr, $cond:expr, $severity:expr $(,)?) => {
        $session.check_true(
            $cond,
            $severity,
            format_args!("expected true: {}", stringify!($cond)),
        )
    };
    ($session:expr, $cond:expr, $severity:expr, $($fmt:tt)+) => {
        $session.check_true($cond, $severity, format_args!($($fmt)+))
    };
}

#[macro_export]
macro_rules! check_false {
    ($session:expr, $cond:expr, $severity:expr $(,)?) => {
        $session.check_false(
            $cond,
            $severity,
            format_args!("expected false: {}", stringify!($cond)),
        )
    };
    ($session:expr, $cond:expr, $severity:expr, $($fmt:tt)+) => {
        $session.check_false($cond, $severity, format_args!($($fmt)+))
    };
}

#[macro_export]
macro_rules! check_null {
    ($session:expr, $value:expr, $severity:expr $(,)?) => {
        $session.check_null(
            &$value,
            $severity,
            format_args!("expected null: {}", stringify!($value)),
        )
    };
    ($session:expr, $value:expr, $severity:expr, $($fmt:tt)+) => {
        $session.check_null(&$value, $severity, format_args!($($fmt)+))
    };
}

#[macro_export]
macro_rules! check_not_null {
    ($session:expr, $value:expr, $severity:expr $(,)?) => {
        $session.check_not_null(
            &$value,
            $severity,
            format_args!("expected non-null: {}", stringify!($value)),
        )
    };
    ($session:expr, $value:expr, $severity:expr, $($fmt:tt)+) => {
        $session.check_not_null(&$value, $severity, format_args!($($fmt)+))
    };
}

/// `left == right`
#[macro_export]
macro_rules! check_eq {
    ($session:expr, $left:expr, $right:expr, $severity:expr $(,)?) => {
        $session.check_eq(
            &$left,
            &$right,
            $severity,
            format_args!("check failed: {} == {}", stringify!($left), stringify!($right)),
        )
    };
    ($session:expr, $left:expr, $right:expr, $severity:expr, $($fmt:tt)+) => {
        $session.check_eq(&$left, &$right, $severity, format_args!($($fmt)+))
    };
}

/// `left != right`
#[macro_export]
macro_rules! check_ne {
    ($session:expr, $left:expr, $right:expr, $severity:expr $(,)?) => {
        $session.check_ne(
            &$left,
            &$right,
            $severity,
            format_args!("check failed: {} != {}", stringify!($left), stringify!($right)),
        )
    };
    ($session:expr, $left:expr, $right:expr, $severity:expr, $($fmt:tt)+) => {
        $session.check_ne(&$left, &$right, $severity, format_args!($($fmt)+))
    };
}

/// `left > right`
#[macro_export]
macro_rules! check_gt {
    ($session:expr, $left:expr, $right:expr, $severity:expr $(,)?) => {
        $session.check_gt(
            &$left,
            &$right,
            $severity,
            format_args!("check failed: {} > {}", stringify!($left), stringify!($right)),
        )
    };
    ($session:expr, $left:expr, $right:expr, $severity:expr, $($fmt:tt)+) => {
        $session.check_gt(&$left, &$right, $severity, format_args!($($fmt)+))
    };
}

/// `left < right`
#[macro_export]
macro_rules! check_lt {
    ($session:expr, $left:expr, $right:expr, $severity:expr $(,)?) => {
        $session.check_lt(
            &$left,
            &$right,
            $severity,
            format_args!("check failed: {} < {}", stringify!($left), stringify!($right)),
        )
    };
    ($session:expr, $left:expr, $right:expr, $severity:expr, $($fmt:tt)+) => {
        $session.check_lt(&$left, &$right, $severity, format_args!($($fmt)+))
    };
}

/// `left >= right`
#[macro_export]
macro_rules! check_ge {
    ($session:expr, $left:expr, $right:expr, $severity:expr $(,)?) => {
        $session.check_ge(
            &$left,
            &$right,
            $severity,
            format_args!("check failed: {} >= {}", stringify!($left), stringify!($right)),
        )
    };
    ($session:expr, $left:expr, $right:expr, $severity:expr, $($fmt:tt)+) => {
        $session.check_ge(&$left, &$right, $severity, format_args!($($fmt)+))
    };
}

/// `left <= right`
#[macro_export]
macro_rules! check_le {
    ($session:expr, $left:expr, $right:expr, $severity:expr $(,)?) => {
        $session.check_le(
            &$left,
            &$right,
            $severity,
            format_args!("check failed: {} <= {}", stringify!($left), stringify!($right)),
        )
    };
    ($session:expr, $left:expr, $right:expr, $severity:expr, $($fmt:tt)+) => {
        $session.check_le(&$left, &$right, $severity, format_args!($($fmt)+))
    };
}
