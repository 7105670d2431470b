//! # crashcheck-core
//!
//! Allocation-light building blocks for the crashcheck test harness.
//!
//! This crate holds everything that does not need to touch the operating
//! system directly:
//! - [`tally`]: per-test and whole-run check/test counters
//! - [`signal`]: the fixed table of catchable fatal signals
//! - [`report`]: summary tables and banners, rendered into any `fmt::Write`
//! - [`slot`]: the lock-free crash slot read from signal handlers
//! - [`config`]: environment-driven harness configuration
//!
//! No `unsafe` code is permitted at the crate level; the libc boundary lives
//! in `crashcheck-abi`.

#![deny(unsafe_code)]

pub mod config;
pub mod nullable;
pub mod report;
pub mod signal;
pub mod slot;
pub mod tally;

pub use config::{ColorMode, HarnessConfig, SignalPolicy};
pub use nullable::Nullable;
pub use report::{Palette, Tier};
pub use signal::{ParseSignalError, SignalKind, SignalTarget};
pub use slot::{CRASH_SLOT, CrashSlot, CrashSnapshot};
pub use tally::{ABORT_EXIT_CODE, NO_TEST, Tally, TallySnapshot};
