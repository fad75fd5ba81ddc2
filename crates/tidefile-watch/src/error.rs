//! Watch service errors.

use thiserror::Error;
use tidefile_core::{FsError, Path};

#[derive(Debug, Error)]
pub enum WatchError {
    /// The path could not be resolved or statted.
    #[error(transparent)]
    Fs(#[from] FsError),

    /// Only directories can be watched.
    #[error("Not a directory: {path}")]
    NotADirectory { path: Path },

    /// The OS watch backend refused the request.
    #[error("Watch backend error at {path}: {message}")]
    Backend { path: Path, message: String },

    /// The reactor thread is no longer running.
    #[error("Watch service has shut down")]
    Shutdown,
}

impl WatchError {
    pub(crate) fn backend(path: &Path, err: notify::Error) -> Self {
        Self::Backend {
            path: path.clone(),
            message: err.to_string(),
        }
    }
}
