//! Task identity and lifecycle.
//!
//! ```text
//! Pending ──► Running ──► Success
//!    │           │   └──► Failed
//!    │           └──────► Cancelled
//!    └──► Success | Failed | Cancelled
//! ```
//!
//! Transitions consume the state and return the next one; asking a terminal
//! state to move on yields [`IllegalTransition`].

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tidefile_core::{Progress, Target};

use crate::error::IllegalTransition;
use crate::operation::{Failure, TaskKind};

/// Process-unique task handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId {
    pub id: u64,
    pub kind: TaskKind,
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// A point in time as both wall clock and monotonic tick.
///
/// The wall clock is for display; durations are computed from the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time {
    pub wall: DateTime<Utc>,
    pub tick: Instant,
}

impl Time {
    pub fn now() -> Self {
        Self {
            wall: Utc::now(),
            tick: Instant::now(),
        }
    }
}

/// Lifecycle of a task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    Pending {
        task: TaskId,
        target: Target,
        time: Time,
    },
    Running {
        task: TaskId,
        target: Target,
        /// When the task started running; progress updates keep it.
        time: Time,
        items: Progress,
        bytes: Progress,
    },
    Success {
        task: TaskId,
        target: Target,
        time: Time,
    },
    Failed {
        task: TaskId,
        target: Target,
        time: Time,
        failures: Vec<Failure>,
    },
    Cancelled {
        task: TaskId,
        target: Target,
        time: Time,
        items: Progress,
        bytes: Progress,
        failures: Vec<Failure>,
    },
}

impl TaskState {
    pub fn pending(task: TaskId, target: Target, time: Time) -> Self {
        Self::Pending { task, target, time }
    }

    /// Start running, or update the progress of a running task.
    ///
    /// `time` only takes effect on the transition out of `Pending`.
    pub fn running(
        self,
        time: Time,
        items: Progress,
        bytes: Progress,
    ) -> Result<Self, IllegalTransition> {
        match self {
            Self::Pending { task, target, .. } => Ok(Self::Running {
                task,
                target,
                time,
                items,
                bytes,
            }),
            Self::Running {
                task, target, time, ..
            } => Ok(Self::Running {
                task,
                target,
                time,
                items,
                bytes,
            }),
            other => Err(other.illegal("running")),
        }
    }

    pub fn success(self, time: Time) -> Result<Self, IllegalTransition> {
        match self {
            Self::Pending { task, target, .. } | Self::Running { task, target, .. } => {
                Ok(Self::Success { task, target, time })
            }
            other => Err(other.illegal("success")),
        }
    }

    pub fn failed(self, time: Time, failures: Vec<Failure>) -> Result<Self, IllegalTransition> {
        match self {
            Self::Pending { task, target, .. } | Self::Running { task, target, .. } => {
                Ok(Self::Failed {
                    task,
                    target,
                    time,
                    failures,
                })
            }
            other => Err(other.illegal("failed")),
        }
    }

    /// Stop early. The progress reached so far is kept.
    pub fn cancelled(self, time: Time, failures: Vec<Failure>) -> Result<Self, IllegalTransition> {
        match self {
            Self::Pending { task, target, .. } => Ok(Self::Cancelled {
                task,
                target,
                time,
                items: Progress::NONE,
                bytes: Progress::NONE,
                failures,
            }),
            Self::Running {
                task,
                target,
                items,
                bytes,
                ..
            } => Ok(Self::Cancelled {
                task,
                target,
                time,
                items,
                bytes,
                failures,
            }),
            other => Err(other.illegal("cancelled")),
        }
    }

    fn illegal(&self, to: &'static str) -> IllegalTransition {
        IllegalTransition {
            from: self.name(),
            to,
        }
    }

    /// Lower-case name of the variant.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending { .. } => "pending",
            Self::Running { .. } => "running",
            Self::Success { .. } => "success",
            Self::Failed { .. } => "failed",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    pub fn task(&self) -> TaskId {
        match self {
            Self::Pending { task, .. }
            | Self::Running { task, .. }
            | Self::Success { task, .. }
            | Self::Failed { task, .. }
            | Self::Cancelled { task, .. } => *task,
        }
    }

    pub fn target(&self) -> &Target {
        match self {
            Self::Pending { target, .. }
            | Self::Running { target, .. }
            | Self::Success { target, .. }
            | Self::Failed { target, .. }
            | Self::Cancelled { target, .. } => target,
        }
    }

    pub fn time(&self) -> Time {
        match self {
            Self::Pending { time, .. }
            | Self::Running { time, .. }
            | Self::Success { time, .. }
            | Self::Failed { time, .. }
            | Self::Cancelled { time, .. } => *time,
        }
    }

    /// Success, failure or cancellation.
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            Self::Success { .. } | Self::Failed { .. } | Self::Cancelled { .. }
        )
    }

    /// Item and byte progress, for states that carry them.
    pub fn progress(&self) -> Option<(Progress, Progress)> {
        match self {
            Self::Running { items, bytes, .. } | Self::Cancelled { items, bytes, .. } => {
                Some((*items, *bytes))
            }
            _ => None,
        }
    }

    pub fn failures(&self) -> &[Failure] {
        match self {
            Self::Failed { failures, .. } | Self::Cancelled { failures, .. } => failures,
            _ => &[],
        }
    }

    /// Time spent running as of `now`. `None` unless running.
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        match self {
            Self::Running { time, .. } => Some(now.saturating_duration_since(time.tick)),
            _ => None,
        }
    }

    /// Average throughput since the task started running.
    pub fn bytes_per_second(&self, now: Instant) -> Option<f64> {
        let elapsed = self.elapsed(now)?.as_secs_f64();
        let (_, bytes) = self.progress()?;
        (elapsed > 0.0).then(|| bytes.processed() as f64 / elapsed)
    }

    /// Estimated time left at the average rate so far. `None` until some
    /// bytes have been processed.
    pub fn estimated_time_remaining(&self, now: Instant) -> Option<Duration> {
        let rate = self.bytes_per_second(now)?;
        let (_, bytes) = self.progress()?;
        if rate <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(bytes.left() as f64 / rate))
    }
}
