//! Errors raised while setting up a harness run.

use std::path::PathBuf;

use crashcheck_abi::{MuteError, SignalError};

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error(transparent)]
    Signal(#[from] SignalError),
    #[error(transparent)]
    Mute(#[from] MuteError),
    #[error("failed to open log file {}: {source}", path.display())]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
