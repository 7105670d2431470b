//! Fatal signals the harness can translate into test failures.
//!
//! The numeric values are the POSIX numbers shared by Linux and the BSDs.
//! `crashcheck-abi` cross-checks them against `libc` in its tests.

use std::fmt;
use std::str::FromStr;

/// Signal numbers.
pub const SIGINT: i32 = 2;
pub const SIGILL: i32 = 4;
pub const SIGABRT: i32 = 6;
pub const SIGFPE: i32 = 8;
pub const SIGSEGV: i32 = 11;
pub const SIGTERM: i32 = 15;

/// Numeric sentinel standing for "all six kinds".
pub const CATCHALL_CODE: i32 = 0xff;

/// Name reported for signal numbers outside the table.
pub const UNKNOWN_SIGNAL_NAME: &str = "SIG_UNKNOWN";

/// A catchable fatal signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Terminated,
    Aborted,
    FloatErr,
    SegmFault,
    Interrupt,
    Instruct,
}

impl SignalKind {
    /// Every kind, in installation order.
    pub const ALL: [SignalKind; 6] = [
        Self::Terminated,
        Self::Aborted,
        Self::FloatErr,
        Self::SegmFault,
        Self::Interrupt,
        Self::Instruct,
    ];

    /// Platform signal number.
    #[must_use]
    pub const fn number(self) -> i32 {
        match self {
            Self::Terminated => SIGTERM,
            Self::Aborted => SIGABRT,
            Self::FloatErr => SIGFPE,
            Self::SegmFault => SIGSEGV,
            Self::Interrupt => SIGINT,
            Self::Instruct => SIGILL,
        }
    }

    /// Symbolic harness name, e.g. `SIG_SEGMFAULT`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Terminated => "SIG_TERMINATED",
            Self::Aborted => "SIG_ABORTED",
            Self::FloatErr => "SIG_FLOATERR",
            Self::SegmFault => "SIG_SEGMFAULT",
            Self::Interrupt => "SIG_INTERRUPT",
            Self::Instruct => "SIG_INSTRUCT",
        }
    }

    /// POSIX name, e.g. `SIGSEGV`.
    #[must_use]
    pub const fn posix_name(self) -> &'static str {
        match self {
            Self::Terminated => "SIGTERM",
            Self::Aborted => "SIGABRT",
            Self::FloatErr => "SIGFPE",
            Self::SegmFault => "SIGSEGV",
            Self::Interrupt => "SIGINT",
            Self::Instruct => "SIGILL",
        }
    }

    /// Position in [`SignalKind::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Terminated => 0,
            Self::Aborted => 1,
            Self::FloatErr => 2,
            Self::SegmFault => 3,
            Self::Interrupt => 4,
            Self::Instruct => 5,
        }
    }

    /// Reverse lookup by platform number.
    #[must_use]
    pub const fn from_number(signum: i32) -> Option<Self> {
        match signum {
            SIGTERM => Some(Self::Terminated),
            SIGABRT => Some(Self::Aborted),
            SIGFPE => Some(Self::FloatErr),
            SIGSEGV => Some(Self::SegmFault),
            SIGINT => Some(Self::Interrupt),
            SIGILL => Some(Self::Instruct),
            _ => None,
        }
    }

    /// Symbolic name for any number; never fails.
    ///
    /// Safe to call from a signal handler.
    #[must_use]
    pub const fn name_for(signum: i32) -> &'static str {
        match Self::from_number(signum) {
            Some(kind) => kind.name(),
            None => UNKNOWN_SIGNAL_NAME,
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name(), self.posix_name())
    }
}

/// Error returned when a signal name does not parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "unknown signal '{input}' (expected one of TERMINATED, ABORTED, FLOATERR, \
     SEGMFAULT, INTERRUPT, INSTRUCT or CATCHALL)"
)]
pub struct ParseSignalError {
    pub input: String,
}

impl FromStr for SignalKind {
    type Err = ParseSignalError;

    /// Accepts harness names (`SEGMFAULT`, `SIG_SEGMFAULT`), POSIX names
    /// (`SIGSEGV`, `SEGV`) and numbers, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if let Ok(n) = upper.parse::<i32>() {
            return Self::from_number(n).ok_or_else(|| ParseSignalError { input: s.to_string() });
        }
        let bare = upper.strip_prefix("SIG_").unwrap_or(&upper);
        Self::ALL
            .into_iter()
            .find(|kind| {
                let harness = kind.name().trim_start_matches("SIG_");
                let posix = kind.posix_name();
                bare == harness || bare == posix || bare == posix.trim_start_matches("SIG")
            })
            .ok_or_else(|| ParseSignalError { input: s.to_string() })
    }
}

/// What to install a handler for: one kind, or all six.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalTarget {
    One(SignalKind),
    CatchAll,
}

impl SignalTarget {
    /// The kinds this target expands to.
    #[must_use]
    pub fn kinds(self) -> &'static [SignalKind] {
        let all: &'static [SignalKind; 6] = &SignalKind::ALL;
        match self {
            Self::One(kind) => std::slice::from_ref(&all[kind.index()]),
            Self::CatchAll => all,
        }
    }

    /// Numeric code: the signal number, or [`CATCHALL_CODE`].
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::One(kind) => kind.number(),
            Self::CatchAll => CATCHALL_CODE,
        }
    }
}

impl From<SignalKind> for SignalTarget {
    fn from(kind: SignalKind) -> Self {
        Self::One(kind)
    }
}

impl FromStr for SignalTarget {
    type Err = ParseSignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if matches!(upper.as_str(), "CATCHALL" | "SIG_CATCHALL" | "ALL" | "255") {
            return Ok(Self::CatchAll);
        }
        s.parse().map(Self::One)
    }
}
