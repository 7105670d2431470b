//! Fatal-signal translation.
//!
//! [`install`] points each requested signal at [`on_fatal_signal`]. The
//! handler performs the abort path for whatever test the crash slot names:
//! per-test summary on stdout, failure banner and "TESTS INTERRUPTED" banner
//! on stderr, then `_exit(signum)`. All six fatal kinds stay blocked while
//! it runs, so reports never interleave.
//!
//! The handler only touches async-signal-safe facilities: atomic loads from
//! [`CRASH_SLOT`], formatting into a stack buffer, `write(2)` and `_exit(2)`.
//! It never allocates, locks, or goes through the buffered std streams.

use std::ffi::c_int;
use std::fmt;
use std::io;

use crashcheck_core::report::{self, Palette};
use crashcheck_core::{CRASH_SLOT, CrashSnapshot, SignalKind, SignalTarget};
use parking_lot::Mutex;

use crate::stack_buf::StackBuf;

/// Stack budget for each of the two handler reports.
const REPORT_CAPACITY: usize = 1024;

static INSTALLED: Mutex<[bool; SignalKind::ALL.len()]> =
    parking_lot::const_mutex([false; SignalKind::ALL.len()]);

#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("failed to install handler for {kind}: {source}")]
    Install {
        kind: SignalKind,
        #[source]
        source: io::Error,
    },
    #[error("failed to raise {kind}: {source}")]
    Raise {
        kind: SignalKind,
        #[source]
        source: io::Error,
    },
}

/// Install the crash handler for `target`.
///
/// Handlers stay installed for the rest of the process; installing a kind
/// twice re-registers the same handler. Returns the kinds that were
/// installed, in order.
pub fn install(target: impl Into<SignalTarget>) -> Result<&'static [SignalKind], SignalError> {
    let kinds = target.into().kinds();
    let mut installed = INSTALLED.lock();
    for &kind in kinds {
        install_one(kind)?;
        installed[kind.index()] = true;
    }
    Ok(kinds)
}

/// Whether a handler has been installed for `kind` in this process.
#[must_use]
pub fn installed(kind: SignalKind) -> bool {
    INSTALLED.lock()[kind.index()]
}

/// Send `kind` to the current process.
///
/// With a handler installed this does not return: the handler exits.
pub fn raise(kind: SignalKind) -> Result<(), SignalError> {
    // SAFETY: raise(3) has no memory-safety preconditions.
    let rc = unsafe { libc::raise(kind.number()) };
    if rc != 0 {
        return Err(SignalError::Raise {
            kind,
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}

fn install_one(kind: SignalKind) -> Result<(), SignalError> {
    // SAFETY: an all-zero sigaction is a valid "no flags" value; the mask is
    // initialised below before use.
    let mut act = unsafe { std::mem::zeroed::<libc::sigaction>() };
    act.sa_sigaction = on_fatal_signal as extern "C" fn(c_int) as libc::sighandler_t;
    // Run on the alternate stack when std set one up, so stack overflows are
    // reported too. Reset to the default action if the handler itself faults.
    act.sa_flags = libc::SA_ONSTACK | libc::SA_RESETHAND;
    // The handler runs with every fatal kind blocked.
    // SAFETY: `act.sa_mask` is a valid, writable sigset_t.
    unsafe { libc::sigemptyset(&mut act.sa_mask) };
    for blocked in SignalKind::ALL {
        // SAFETY: as above; the signal numbers come from the fixed table.
        unsafe { libc::sigaddset(&mut act.sa_mask, blocked.number()) };
    }

    // SAFETY: `act` is fully initialised; passing null for the old action is allowed.
    let rc = unsafe { libc::sigaction(kind.number(), &act, std::ptr::null_mut()) };
    if rc != 0 {
        return Err(SignalError::Install {
            kind,
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}

extern "C" fn on_fatal_signal(signum: c_int) {
    let snap = CRASH_SLOT.snapshot();
    let mut out = StackBuf::<REPORT_CAPACITY>::new();
    let mut err = StackBuf::<REPORT_CAPACITY>::new();
    render_crash_report(&snap, signum, &mut out, &mut err);
    write_all(libc::STDOUT_FILENO, out.as_bytes());
    write_all(libc::STDERR_FILENO, err.as_bytes());

    // SAFETY: _exit(2) is async-signal-safe and does not return.
    unsafe { libc::_exit(signum) }
}

/// Render the crash report for `signum` into the two stream buffers.
///
/// With an armed slot the running test is finalized as aborted: per-test
/// summary on `out`, failure banner on `err`. Without a live session there
/// is no test to attribute, so only the "TESTS INTERRUPTED" banner is written.
fn render_crash_report<W: fmt::Write>(
    snap: &CrashSnapshot,
    signum: c_int,
    out: &mut W,
    err: &mut W,
) {
    let palette = Palette::new(snap.color);
    if snap.armed {
        let _ = report::write_test_summary(out, snap.checks, snap.passed, &palette);
        let _ = report::write_abort_banner(err, snap.name(), &palette);
    }
    let _ = report::write_interrupted(err, signum, &palette);
}

/// `write(2)` until done; gives up silently on a hard error.
fn write_all(fd: c_int, mut bytes: &[u8]) {
    while !bytes.is_empty() {
        // SAFETY: `bytes` is a live slice; write(2) reads at most `len` bytes.
        let n = unsafe { libc::write(fd, bytes.as_ptr().cast(), bytes.len()) };
        if n < 0 {
            if io::Error::last_os_error().raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return;
        }
        if n == 0 {
            return;
        }
        bytes = &bytes[n as usize..];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crashcheck_core::CrashSlot;

    #[test]
    fn table_matches_platform_numbers() {
        assert_eq!(SignalKind::Terminated.number(), libc::SIGTERM);
        assert_eq!(SignalKind::Aborted.number(), libc::SIGABRT);
        assert_eq!(SignalKind::FloatErr.number(), libc::SIGFPE);
        assert_eq!(SignalKind::SegmFault.number(), libc::SIGSEGV);
        assert_eq!(SignalKind::Interrupt.number(), libc::SIGINT);
        assert_eq!(SignalKind::Instruct.number(), libc::SIGILL);
    }

    #[test]
    fn handler_blocks_every_fatal_kind() {
        install(SignalKind::Terminated).unwrap();

        // SAFETY: zeroed sigaction is a valid out-parameter; a null new action
        // only queries the current one.
        let mut current = unsafe { std::mem::zeroed::<libc::sigaction>() };
        let rc = unsafe { libc::sigaction(libc::SIGTERM, std::ptr::null(), &mut current) };
        assert_eq!(rc, 0);

        let unblocked: Vec<SignalKind> = SignalKind::ALL
            .into_iter()
            // SAFETY: `current.sa_mask` was filled in by sigaction above.
            .filter(|kind| unsafe { libc::sigismember(&current.sa_mask, kind.number()) } != 1)
            .collect();
        assert!(unblocked.is_empty(), "not blocked in handler: {unblocked:?}");
    }

    fn slot_with_test(name: &str, checks: u64, passed: u64) -> CrashSlot {
        let slot = CrashSlot::new();
        slot.arm(false);
        slot.store_name(name);
        slot.store_counts(checks, passed);
        slot
    }

    #[test]
    fn armed_report_attributes_the_running_test() {
        let slot = slot_with_test("parse header", 3, 2);
        let (mut out, mut err) = (String::new(), String::new());
        render_crash_report(&slot.snapshot(), libc::SIGSEGV, &mut out, &mut err);

        assert_eq!(
            out,
            "  Checks ran:    3\n  Checks passed: 2\n  Success ratio: 0.666667\n"
        );
        assert!(err.starts_with(" [ Failure: Fatal error during test. ]\n"), "{err}");
        assert!(err.contains(" === TEST parse header FINISHED ===\n"));
        assert!(err.ends_with("\t  -> Signal SIG_SEGMFAULT (11) was thrown.\n"), "{err}");
    }

    #[test]
    fn disarmed_report_only_announces_the_interruption() {
        let slot = slot_with_test("stale", 1, 1);
        slot.disarm();
        let (mut out, mut err) = (String::new(), String::new());
        render_crash_report(&slot.snapshot(), libc::SIGABRT, &mut out, &mut err);

        assert!(out.is_empty(), "{out}");
        assert!(!err.contains("stale"));
        assert!(err.starts_with("\t+-------------------------------+\n"), "{err}");
        assert!(err.ends_with("  -> Signal SIG_ABORTED (6) was thrown.\n"));
    }

    #[test]
    fn install_marks_kind_installed() {
        install(SignalKind::Terminated).unwrap();
        assert!(installed(SignalKind::Terminated));
        assert_eq!(
            install(SignalKind::Terminated).unwrap(),
            &[SignalKind::Terminated]
        );
    }
}
