//! Lock-free crash slot.
//!
//! The running session mirrors the current test's counters and name into a
//! [`CrashSlot`] after every mutation. A fatal-signal handler can interrupt
//! the session at any instruction, so it never touches the session itself;
//! it reads the slot instead. Every field is a single atomic, so a torn
//! update still reads as a valid (if slightly stale) value, and reading never
//! allocates or locks.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, AtomicUsize, Ordering};

use crate::tally::NO_TEST;

/// Longest test name (in bytes) the slot keeps. Longer names are truncated.
pub const NAME_CAPACITY: usize = 128;

/// The slot read by the process-wide signal handler.
pub static CRASH_SLOT: CrashSlot = CrashSlot::new();

pub struct CrashSlot {
    armed: AtomicBool,
    color: AtomicBool,
    checks: AtomicU64,
    passed: AtomicU64,
    name_len: AtomicUsize,
    name: [AtomicU8; NAME_CAPACITY],
}

/// Stack copy of a [`CrashSlot`].
#[derive(Clone, Copy)]
pub struct CrashSnapshot {
    pub armed: bool,
    pub color: bool,
    pub checks: u64,
    pub passed: u64,
    name_len: usize,
    name: [u8; NAME_CAPACITY],
}

impl CrashSlot {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
            color: AtomicBool::new(false),
            checks: AtomicU64::new(0),
            passed: AtomicU64::new(0),
            name_len: AtomicUsize::new(0),
            name: [const { AtomicU8::new(0) }; NAME_CAPACITY],
        }
    }

    /// Mark the slot as owned by a live session.
    pub fn arm(&self, color: bool) {
        self.color.store(color, Ordering::Relaxed);
        self.store_name(NO_TEST);
        self.store_counts(0, 0);
        self.armed.store(true, Ordering::Release);
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Publish the current test's counters.
    pub fn store_counts(&self, checks: u64, passed: u64) {
        self.passed.store(passed, Ordering::Relaxed);
        self.checks.store(checks, Ordering::Release);
    }

    /// Publish the current test's name, truncated to [`NAME_CAPACITY`].
    pub fn store_name(&self, name: &str) {
        let bytes = name.as_bytes();
        let len = bytes.len().min(NAME_CAPACITY);
        self.name_len.store(0, Ordering::Release);
        for (cell, byte) in self.name.iter().zip(&bytes[..len]) {
            cell.store(*byte, Ordering::Relaxed);
        }
        self.name_len.store(len, Ordering::Release);
    }

    /// Copy the slot out. Async-signal-safe.
    #[must_use]
    pub fn snapshot(&self) -> CrashSnapshot {
        let mut name = [0_u8; NAME_CAPACITY];
        let name_len = self.name_len.load(Ordering::Acquire).min(NAME_CAPACITY);
        for (dst, cell) in name.iter_mut().zip(&self.name[..name_len]) {
            *dst = cell.load(Ordering::Relaxed);
        }
        let checks = self.checks.load(Ordering::Acquire);
        let passed = self.passed.load(Ordering::Relaxed).min(checks);
        CrashSnapshot {
            armed: self.armed.load(Ordering::Acquire),
            color: self.color.load(Ordering::Relaxed),
            checks,
            passed,
            name_len,
            name,
        }
    }
}

impl Default for CrashSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl CrashSnapshot {
    /// The published name, cut back to the last complete UTF-8 character
    /// when truncation split one. Falls back to [`NO_TEST`] when empty.
    #[must_use]
    pub fn name(&self) -> &str {
        let bytes = &self.name[..self.name_len];
        let text = match std::str::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => std::str::from_utf8(&bytes[..err.valid_up_to()]).unwrap_or_default(),
        };
        if text.is_empty() { NO_TEST } else { text }
    }
}

impl std::fmt::Debug for CrashSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrashSnapshot")
            .field("armed", &self.armed)
            .field("color", &self.color)
            .field("checks", &self.checks)
            .field("passed", &self.passed)
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_slot_is_disarmed_and_unnamed() {
        let slot = CrashSlot::new();
        let snap = slot.snapshot();
        assert!(!snap.armed);
        assert_eq!(snap.name(), NO_TEST);
        assert_eq!(snap.checks, 0);
    }

    #[test]
    fn publishes_counts_and_name() {
        let slot = CrashSlot::new();
        slot.arm(true);
        slot.store_name("parser handles empty input");
        slot.store_counts(5, 3);

        let snap = slot.snapshot();
        assert!(snap.armed);
        assert!(snap.color);
        assert_eq!(snap.name(), "parser handles empty input");
        assert_eq!((snap.checks, snap.passed), (5, 3));

        slot.disarm();
        assert!(!slot.is_armed());
    }

    #[test]
    fn shorter_name_replaces_longer_one() {
        let slot = CrashSlot::new();
        slot.store_name("a rather long test name");
        slot.store_name("short");
        assert_eq!(slot.snapshot().name(), "short");
    }

    #[test]
    fn long_names_truncate_on_char_boundary() {
        let slot = CrashSlot::new();
        let name = "é".repeat(NAME_CAPACITY);
        slot.store_name(&name);
        let snap = slot.snapshot();
        assert_eq!(snap.name().len(), NAME_CAPACITY);
        assert!(snap.name().chars().all(|c| c == 'é'));

        let odd = format!("x{}", "é".repeat(NAME_CAPACITY));
        slot.store_name(&odd);
        assert_eq!(slot.snapshot().name().len(), NAME_CAPACITY - 1);
    }
}
