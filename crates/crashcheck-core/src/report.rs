//! Console banners and summary tables.
//!
//! Everything here renders into a generic [`fmt::Write`] so the same code
//! serves the normal lifecycle (rendering into a `String`) and the signal
//! handler (rendering into a fixed stack buffer, without allocating).

use std::fmt::{self, Write};

use crate::signal::SignalKind;
use crate::tally::TallySnapshot;

/// Ratio below which a value is shown in the low tier.
pub const LOW_TIER_BELOW: f64 = 0.75;

/// Placeholder printed for a ratio with a zero denominator.
pub const RATIO_PLACEHOLDER: &str = "n/a";

/// ANSI escape sequences used by the reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub blue: &'static str,
    pub green: &'static str,
    pub red: &'static str,
    pub red_bg: &'static str,
    pub yellow_bg: &'static str,
    pub reset: &'static str,
    pub bold: &'static str,
}

impl Palette {
    pub const ANSI: Self = Self {
        blue: "\x1b[0;36m",
        green: "\x1b[0;32m",
        red: "\x1b[0;31m",
        red_bg: "\x1b[0;41m",
        yellow_bg: "\x1b[0;43m",
        reset: "\x1b[0;0m",
        bold: "\x1b[0;1m",
    };

    pub const PLAIN: Self = Self {
        blue: "",
        green: "",
        red: "",
        red_bg: "",
        yellow_bg: "",
        reset: "",
        bold: "",
    };

    /// Pick a palette. The `no-color` feature wins over the runtime request.
    #[must_use]
    pub const fn new(color: bool) -> Self {
        if color && !cfg!(feature = "no-color") {
            Self::ANSI
        } else {
            Self::PLAIN
        }
    }

    /// Whether this palette emits escapes at all.
    #[must_use]
    pub fn is_colored(&self) -> bool {
        !self.reset.is_empty()
    }

    /// Green when `value` reached `expected`, red otherwise.
    fn match_color(&self, expected: u64, value: u64) -> &'static str {
        if expected == value { self.green } else { self.red }
    }
}

/// Display tier of a success ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Below [`LOW_TIER_BELOW`].
    Low,
    Middle,
    /// Everything passed.
    Best,
    /// Nothing ran, so there is no ratio.
    Undefined,
}

impl Tier {
    #[must_use]
    pub fn for_ratio(ratio: Option<f64>) -> Self {
        match ratio {
            None => Self::Undefined,
            Some(r) if r < LOW_TIER_BELOW => Self::Low,
            Some(r) if r >= 1.0 => Self::Best,
            Some(_) => Self::Middle,
        }
    }

    #[must_use]
    pub fn color(self, palette: &Palette) -> &'static str {
        match self {
            Self::Low => palette.red_bg,
            Self::Middle => palette.yellow_bg,
            Self::Best => palette.green,
            Self::Undefined => "",
        }
    }
}

/// `passed / total`, or `None` when `total` is zero.
#[must_use]
pub fn ratio(passed: u64, total: u64) -> Option<f64> {
    (total != 0).then(|| passed as f64 / total as f64)
}

struct Ratio {
    value: Option<f64>,
    precision: usize,
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(v) => write!(f, "{v:.prec$}", prec = self.precision),
            None => f.pad(RATIO_PLACEHOLDER),
        }
    }
}

/// ` === TEST <name> STARTED ===`
pub fn write_test_started<W: Write + ?Sized>(w: &mut W, name: &str, p: &Palette) -> fmt::Result {
    writeln!(w, "{}{} === TEST {name} STARTED ==={}", p.bold, p.blue, p.reset)
}

/// Per-test summary: checks ran, checks passed, success ratio.
pub fn write_test_summary<W: Write + ?Sized>(
    w: &mut W,
    checks: u64,
    passed: u64,
    p: &Palette,
) -> fmt::Result {
    let color = p.match_color(checks, passed);
    let ratio = Ratio {
        value: ratio(passed, checks),
        precision: 6,
    };
    write!(
        w,
        "{bold}  Checks ran:    {checks}\n\
         \x20 Checks passed: {bold}{color}{passed}{reset}{bold}\n\
         \x20 Success ratio: {bold}{color}{ratio}\n{reset}",
        bold = p.bold,
        reset = p.reset,
    )
}

/// Trailer printed when a test ends normally.
pub fn write_test_ended<W: Write + ?Sized>(w: &mut W, name: &str, p: &Palette) -> fmt::Result {
    write!(
        w,
        "{reset} [ End of Test: All tests ran. ]\n\
         {bold}{blue} === TEST {name} FINISHED ===\n\n{reset}",
        reset = p.reset,
        bold = p.bold,
        blue = p.blue,
    )
}

/// Trailer printed (to stderr) when a test is aborted.
pub fn write_abort_banner<W: Write + ?Sized>(w: &mut W, name: &str, p: &Palette) -> fmt::Result {
    write!(
        w,
        "{red} [ Failure: Fatal error during test. ]\n\n\
         {reset}{bold}{blue} === TEST {name} FINISHED ===\n{reset}",
        red = p.red,
        reset = p.reset,
        bold = p.bold,
        blue = p.blue,
    )
}

/// Banner printed by the signal handler after the abort trailer.
pub fn write_interrupted<W: Write + ?Sized>(w: &mut W, signum: i32, p: &Palette) -> fmt::Result {
    write!(
        w,
        "{red}{bold}\t+-------------------------------+\n\
         \t|       TESTS INTERRUPTED       |\n\
         \t+-------------------------------+\n\
         \t  -> Signal {name} ({signum}) was thrown.\n{reset}",
        red = p.red,
        bold = p.bold,
        name = SignalKind::name_for(signum),
        reset = p.reset,
    )
}

/// Diagnostic for a failed check: `<file> [<line>]: <message>`.
pub fn write_check_failure<W: Write + ?Sized>(
    w: &mut W,
    file: &str,
    line: u32,
    message: fmt::Arguments<'_>,
    p: &Palette,
) -> fmt::Result {
    writeln!(w, "{}{}{file} [{line}]: {message}{}", p.red, p.bold, p.reset)
}

/// Notice printed when a handler is installed.
pub fn write_handler_added<W: Write + ?Sized>(
    w: &mut W,
    kind: SignalKind,
    p: &Palette,
) -> fmt::Result {
    writeln!(
        w,
        "{}{} [ Adding signal handler for {} ({kind}) ]{}",
        p.bold,
        p.blue,
        kind.number(),
        p.reset
    )
}

pub fn write_run_started<W: Write + ?Sized>(w: &mut W, p: &Palette) -> fmt::Result {
    write!(
        w,
        "{bold}\t+-------------------------------+\n\
         \t|         STARTING TESTS        |\n\
         \t+-------------------------------+\n{reset}",
        bold = p.bold,
        reset = p.reset,
    )
}

pub fn write_run_finished<W: Write + ?Sized>(w: &mut W, p: &Palette) -> fmt::Result {
    write!(
        w,
        "{bold}\t+-------------------------------+\n\
         \t|         TESTS FINISHED        |\n\
         \t+----------------------+--------+\n{reset}",
        bold = p.bold,
        reset = p.reset,
    )
}

/// Whole-run table.
pub fn write_run_summary<W: Write + ?Sized>(
    w: &mut W,
    totals: &TallySnapshot,
    p: &Palette,
) -> fmt::Result {
    let test_ratio = ratio(totals.tests_passed, totals.tests);
    let check_ratio = ratio(totals.checks_passed, totals.checks_total);
    let test_ratio_color = Tier::for_ratio(test_ratio).color(p);
    let check_ratio_color = Tier::for_ratio(check_ratio).color(p);
    let tests_color = p.match_color(totals.tests, totals.tests_passed);
    let checks_color = p.match_color(totals.checks_total, totals.checks_passed);
    let test_ratio = Ratio {
        value: test_ratio,
        precision: 4,
    };
    let check_ratio = Ratio {
        value: check_ratio,
        precision: 4,
    };

    write!(
        w,
        "{bold}\t| Tests ran            | {tests:6} |\n\
         \t| Tests succeeded      | {bold}{tests_color}{tests_passed:6}{reset}{bold} |\n\
         \t| Test success ratio   | {test_ratio_color}{test_ratio:>6}{reset}{bold} |\n\
         \t| Checks ran           | {checks:6} |\n\
         \t| Checks succeeded     | {bold}{checks_color}{checks_passed:6}{reset}{bold} |\n\
         \t| Global success ratio | {check_ratio_color}{check_ratio:>6}{reset}{bold} |\n\
         \t+----------------------+--------+\n{reset}",
        bold = p.bold,
        reset = p.reset,
        tests = totals.tests,
        tests_passed = totals.tests_passed,
        checks = totals.checks_total,
        checks_passed = totals.checks_passed,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_follow_thresholds() {
        assert_eq!(Tier::for_ratio(Some(0.5)), Tier::Low);
        assert_eq!(Tier::for_ratio(Some(0.7499)), Tier::Low);
        assert_eq!(Tier::for_ratio(Some(0.75)), Tier::Middle);
        assert_eq!(Tier::for_ratio(Some(0.99)), Tier::Middle);
        assert_eq!(Tier::for_ratio(Some(1.0)), Tier::Best);
        assert_eq!(Tier::for_ratio(None), Tier::Undefined);
    }

    #[cfg(not(feature = "no-color"))]
    #[test]
    fn palette_follows_runtime_request() {
        assert_eq!(Palette::new(true), Palette::ANSI);
        assert_eq!(Palette::new(false), Palette::PLAIN);
        assert!(Palette::new(true).is_colored());
    }

    #[cfg(feature = "no-color")]
    #[test]
    fn no_color_build_ignores_runtime_request() {
        assert_eq!(Palette::new(true), Palette::PLAIN);
        assert!(!Palette::new(true).is_colored());
    }

    #[test]
    fn zero_total_has_no_ratio() {
        assert_eq!(ratio(0, 0), None);
        assert_eq!(ratio(1, 2), Some(0.5));
    }

    #[test]
    fn test_summary_plain() {
        let mut out = String::new();
        write_test_summary(&mut out, 4, 3, &Palette::PLAIN).unwrap();
        assert_eq!(
            out,
            "  Checks ran:    4\n  Checks passed: 3\n  Success ratio: 0.750000\n"
        );
    }

    #[test]
    fn test_summary_with_no_checks_uses_placeholder() {
        let mut out = String::new();
        write_test_summary(&mut out, 0, 0, &Palette::PLAIN).unwrap();
        assert!(out.ends_with("Success ratio: n/a\n"), "{out}");
    }

    #[test]
    fn run_summary_plain_table() {
        let totals = TallySnapshot {
            tests: 3,
            tests_passed: 2,
            checks_total: 3,
            checks_passed: 2,
            ..TallySnapshot::default()
        };
        let mut out = String::new();
        write_run_summary(&mut out, &totals, &Palette::PLAIN).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "\t| Tests ran            |      3 |");
        assert_eq!(lines[1], "\t| Tests succeeded      |      2 |");
        assert_eq!(lines[2], "\t| Test success ratio   | 0.6667 |");
        assert_eq!(lines[5], "\t| Global success ratio | 0.6667 |");
        assert_eq!(lines[6], "\t+----------------------+--------+");
    }

    #[test]
    fn empty_run_summary_does_not_divide() {
        let mut out = String::new();
        write_run_summary(&mut out, &TallySnapshot::default(), &Palette::PLAIN).unwrap();
        assert!(out.contains("| Test success ratio   |    n/a |"), "{out}");
    }

    #[test]
    fn colored_summary_marks_mismatch_red() {
        let totals = TallySnapshot {
            tests: 2,
            tests_passed: 1,
            checks_total: 2,
            checks_passed: 2,
            ..TallySnapshot::default()
        };
        let mut out = String::new();
        write_run_summary(&mut out, &totals, &Palette::ANSI).unwrap();
        assert!(out.contains(&format!("{}{:6}", Palette::ANSI.red, 1)));
        assert!(out.contains(&format!("{}{:6}", Palette::ANSI.green, 2)));
        assert!(out.contains(Palette::ANSI.red_bg));
    }

    #[test]
    fn interrupted_banner_names_signal() {
        let mut out = String::new();
        write_interrupted(&mut out, 11, &Palette::PLAIN).unwrap();
        assert!(out.contains("TESTS INTERRUPTED"));
        assert!(out.contains("-> Signal SIG_SEGMFAULT (11) was thrown."));

        out.clear();
        write_interrupted(&mut out, 9, &Palette::PLAIN).unwrap();
        assert!(out.contains("-> Signal SIG_UNKNOWN (9) was thrown."));
    }

    #[test]
    fn lifecycle_banners_name_the_test() {
        let mut out = String::new();
        write_test_started(&mut out, "parse", &Palette::PLAIN).unwrap();
        write_test_ended(&mut out, "parse", &Palette::PLAIN).unwrap();
        write_abort_banner(&mut out, "parse", &Palette::PLAIN).unwrap();
        assert_eq!(
            out,
            " === TEST parse STARTED ===\n\
             \x20[ End of Test: All tests ran. ]\n === TEST parse FINISHED ===\n\n\
             \x20[ Failure: Fatal error during test. ]\n\n === TEST parse FINISHED ===\n"
        );
    }

    #[test]
    fn check_failure_is_location_qualified() {
        let mut out = String::new();
        write_check_failure(
            &mut out,
            "src/lib.rs",
            42,
            format_args!("expected {} got {}", 1, 2),
            &Palette::PLAIN,
        )
        .unwrap();
        assert_eq!(out, "src/lib.rs [42]: expected 1 got 2\n");
    }

    #[test]
    fn handler_notice_lists_both_names() {
        let mut out = String::new();
        write_handler_added(&mut out, SignalKind::Aborted, &Palette::PLAIN).unwrap();
        assert_eq!(out, " [ Adding signal handler for 6 (SIG_ABORTED/SIGABRT) ]\n");
    }
}
