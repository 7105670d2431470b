//! Scoped muting of the process's standard streams.
//!
//! Muting keeps a duplicate of the stream's descriptor and points the
//! descriptor at the null device; unmuting moves the duplicate back with
//! `dup2(2)`. Both operations are idempotent per stream.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

/// Discard destination.
pub const NULL_DEVICE: &str = "/dev/null";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    /// Underlying descriptor number.
    #[must_use]
    pub const fn fd(self) -> RawFd {
        match self {
            Self::Stdout => libc::STDOUT_FILENO,
            Self::Stderr => libc::STDERR_FILENO,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }

    fn flush(self) -> io::Result<()> {
        match self {
            Self::Stdout => io::stdout().flush(),
            Self::Stderr => io::stderr().flush(),
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MuteError {
    #[error("failed to flush {stream}: {source}")]
    Flush {
        stream: Stream,
        #[source]
        source: io::Error,
    },
    #[error("failed to duplicate the {stream} descriptor: {source}")]
    Duplicate {
        stream: Stream,
        #[source]
        source: io::Error,
    },
    #[error("failed to open /dev/null: {0}")]
    OpenNull(#[source] io::Error),
    #[error("failed to redirect {stream}: {source}")]
    Redirect {
        stream: Stream,
        #[source]
        source: io::Error,
    },
}

/// Saved descriptors for muted streams. Presence means "muted".
///
/// Dropping the muter restores every stream it still holds.
#[derive(Debug, Default)]
pub struct OutputMuter {
    stdout: Option<OwnedFd>,
    stderr: Option<OwnedFd>,
}

impl OutputMuter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_muted(&self, stream: Stream) -> bool {
        self.saved(stream).is_some()
    }

    /// Send `stream` to the null device.
    ///
    /// Returns `false` (and does nothing) when the stream is already muted.
    pub fn mute(&mut self, stream: Stream) -> Result<bool, MuteError> {
        if self.is_muted(stream) {
            return Ok(false);
        }
        stream
            .flush()
            .map_err(|source| MuteError::Flush { stream, source })?;

        // SAFETY: dup(2) on a descriptor number has no memory-safety preconditions.
        let raw = unsafe { libc::dup(stream.fd()) };
        if raw < 0 {
            return Err(MuteError::Duplicate {
                stream,
                source: io::Error::last_os_error(),
            });
        }
        // SAFETY: `raw` was just returned by dup(2) and is owned by nobody else.
        let saved = unsafe { OwnedFd::from_raw_fd(raw) };

        let null = OpenOptions::new()
            .write(true)
            .open(NULL_DEVICE)
            .map_err(MuteError::OpenNull)?;
        redirect(null.as_raw_fd(), stream)?;

        *self.saved_mut(stream) = Some(saved);
        Ok(true)
    }

    /// Point `stream` back at its original destination.
    ///
    /// Returns `false` (and does nothing) when the stream is not muted.
    pub fn unmute(&mut self, stream: Stream) -> Result<bool, MuteError> {
        let Some(saved) = self.saved_mut(stream).take() else {
            return Ok(false);
        };
        // Whatever is still buffered was written while muted.
        let _ = stream.flush();

        if let Err(err) = redirect(saved.as_raw_fd(), stream) {
            *self.saved_mut(stream) = Some(saved);
            return Err(err);
        }
        Ok(true)
    }

    /// Unmute both streams.
    pub fn unmute_all(&mut self) -> Result<(), MuteError> {
        self.unmute(Stream::Stdout)?;
        self.unmute(Stream::Stderr)?;
        Ok(())
    }

    fn saved(&self, stream: Stream) -> Option<&OwnedFd> {
        match stream {
            Stream::Stdout => self.stdout.as_ref(),
            Stream::Stderr => self.stderr.as_ref(),
        }
    }

    fn saved_mut(&mut self, stream: Stream) -> &mut Option<OwnedFd> {
        match stream {
            Stream::Stdout => &mut self.stdout,
            Stream::Stderr => &mut self.stderr,
        }
    }
}

impl Drop for OutputMuter {
    fn drop(&mut self) {
        let _ = self.unmute_all();
    }
}

/// `dup2(from, stream.fd())`, retrying on EINTR.
fn redirect(from: RawFd, stream: Stream) -> Result<(), MuteError> {
    loop {
        // SAFETY: dup2(2) on descriptor numbers has no memory-safety preconditions;
        // `from` is kept open by the caller for the duration of the call.
        let rc = unsafe { libc::dup2(from, stream.fd()) };
        if rc >= 0 {
            return Ok(());
        }
        let source = io::Error::last_os_error();
        if source.raw_os_error() != Some(libc::EINTR) {
            return Err(MuteError::Redirect { stream, source });
        }
    }
}
