//! Engine error types.

use thiserror::Error;
use tidefile_core::TargetError;

use crate::state::TaskId;

/// A state change that the task lifecycle does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Illegal task transition from {from} to {to}")]
pub struct IllegalTransition {
    pub from: &'static str,
    pub to: &'static str,
}

/// Errors returned by the [`Engine`](crate::Engine) API itself. Failures of
/// individual entries are reported through task state instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The task id was never issued or has been forgotten.
    #[error("Unknown task: {task}")]
    UnknownTask { task: TaskId },

    /// The target was rejected before any work started.
    #[error(transparent)]
    Target(#[from] TargetError),
}
