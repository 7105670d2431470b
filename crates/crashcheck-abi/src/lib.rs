//! # crashcheck-abi
//!
//! The libc boundary of crashcheck.
//!
//! - [`signals`]: installs process-level handlers that turn fatal signals into
//!   attributed test failures, then exit with the signal number.
//! - [`mute`]: redirects stdout/stderr to the null device and restores them.
//!
//! ```text
//! session -> CRASH_SLOT (atomics) <- signal handler -> write(2) -> _exit(signum)
//! ```

pub mod mute;
pub mod signals;
mod stack_buf;

pub use mute::{MuteError, OutputMuter, Stream};
pub use signals::{SignalError, install, installed, raise};
