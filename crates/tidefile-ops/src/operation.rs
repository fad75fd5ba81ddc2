//! File operation types.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::Display;
use tidefile_core::{FsError, Path};

/// What a task does to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum TaskKind {
    Copy,
    Move,
    Delete,
}

/// An entry that could not be processed, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// The source entry the failure belongs to.
    pub path: Path,
    pub cause: FsError,
}

impl Failure {
    pub fn new(path: Path, cause: FsError) -> Self {
        Self { path, cause }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.cause)
    }
}
