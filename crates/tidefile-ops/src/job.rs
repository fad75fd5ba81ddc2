//! The blocking side of a task: planning, execution and outcome.

use tidefile_core::{EngineConfig, FsError, Path, Target};
use tidefile_scan::Walker;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::operation::{Failure, TaskKind};
use crate::progress::{Reporter, Tally};
use crate::{copy, delete, move_op};

/// Marker returned when a cancellation request was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cancelled;

pub(crate) struct Job {
    pub target: Target,
    pub config: EngineConfig,
    pub cancel: CancellationToken,
    pub reporter: Reporter,
    pub failures: Vec<Failure>,
}

impl Job {
    pub fn new(
        target: Target,
        config: EngineConfig,
        cancel: CancellationToken,
        reporter: Reporter,
    ) -> Self {
        Self {
            target,
            config,
            cancel,
            reporter,
            failures: Vec::new(),
        }
    }

    /// Bail out between two entries if cancellation was requested.
    pub fn checkpoint(&self) -> Result<(), Cancelled> {
        if self.cancel.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn fail(&mut self, path: Path, cause: FsError) {
        warn!(path = %path, error = %cause, "Entry failed");
        self.failures.push(Failure::new(path, cause));
    }

    /// Count entries and bytes under each source. Unreadable entries are
    /// skipped here and reported when the work reaches them.
    fn plan(&self) -> Result<Vec<Tally>, Cancelled> {
        let mut tallies = vec![Tally::default(); self.target.sources.len()];
        for visit in Walker::new(self.target.sources.iter().cloned()) {
            self.checkpoint()?;
            if let Ok(entry) = visit {
                tallies[entry.root].add(Tally {
                    items: 1,
                    bytes: entry.stat.size,
                });
            }
        }
        Ok(tallies)
    }

    /// Plan, execute and publish the terminal state.
    pub fn run(mut self, kind: TaskKind) {
        let outcome = self.plan().and_then(|tallies| {
            let mut total = Tally::default();
            tallies.iter().for_each(|t| total.add(*t));
            self.reporter.start(total);
            match kind {
                TaskKind::Copy => copy::run(&mut self),
                TaskKind::Move => move_op::run(&mut self, &tallies),
                TaskKind::Delete => delete::run(&mut self),
            }
        });
        let cancelled = outcome.is_err();
        if cancelled {
            debug!(kind = %kind, "Cancellation observed");
        }
        self.reporter.finish(cancelled, self.failures);
    }
}

/// A job over `root` with an unthrottled reporter, for exercising the
/// blocking operations directly.
#[cfg(test)]
pub(crate) fn test_job(
    root: &Path,
) -> (Job, tokio::sync::watch::Receiver<crate::state::TaskState>) {
    use crate::state::{TaskId, TaskState, Time};

    let target = Target::for_delete([root.clone()]);
    let task = TaskId {
        id: 1,
        kind: TaskKind::Delete,
    };
    let (tx, rx) = tokio::sync::watch::channel(TaskState::pending(task, target.clone(), Time::now()));
    let reporter = Reporter::new(tx, std::time::Duration::ZERO);
    let job = Job::new(target, EngineConfig::default(), CancellationToken::new(), reporter);
    (job, rx)
}
