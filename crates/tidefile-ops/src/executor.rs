//! Task engine: submission, observation and cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tidefile_core::{EngineConfig, Target};
use tokio::sync::{Semaphore, watch};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::EngineError;
use crate::job::Job;
use crate::operation::TaskKind;
use crate::progress::Reporter;
use crate::state::{TaskId, TaskState, Time};

struct TaskEntry {
    state: watch::Receiver<TaskState>,
    cancel: CancellationToken,
}

struct Inner {
    config: EngineConfig,
    tasks: DashMap<TaskId, TaskEntry>,
    next_id: AtomicU64,
    permits: Arc<Semaphore>,
}

/// Runs copy, move and delete tasks on a bounded pool of blocking workers.
///
/// Cloning an `Engine` yields another handle to the same task table.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let workers = config.worker_count();
        debug!(workers, "Starting engine");
        Self {
            inner: Arc::new(Inner {
                config,
                tasks: DashMap::new(),
                next_id: AtomicU64::new(1),
                permits: Arc::new(Semaphore::new(workers)),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Queue a task and return its id without waiting for it to start.
    ///
    /// For copy and move the destination is checked up front; see
    /// [`Target::resolve`]. A target without sources finishes immediately.
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, kind: TaskKind, target: Target) -> Result<TaskId, EngineError> {
        if kind != TaskKind::Delete && !target.sources.is_empty() {
            target.resolve()?;
        }

        let task = TaskId {
            id: self.inner.next_id.fetch_add(1, Ordering::Relaxed),
            kind,
        };
        let (tx, rx) = watch::channel(TaskState::pending(task, target.clone(), Time::now()));
        let cancel = CancellationToken::new();
        self.inner.tasks.insert(
            task,
            TaskEntry {
                state: rx,
                cancel: cancel.clone(),
            },
        );
        info!(task = %task, sources = target.sources.len(), destination = %target.destination, "Task submitted");

        let permits = self.inner.permits.clone();
        let config = self.inner.config.clone();
        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            let reporter = Reporter::new(tx, config.progress_interval);
            let job = Job::new(target, config, cancel, reporter);
            if let Err(err) = tokio::task::spawn_blocking(move || job.run(kind)).await {
                error!(task = %task, error = %err, "Task worker panicked");
            }
        });

        Ok(task)
    }

    /// Request cooperative cancellation. Returns `false` for unknown tasks.
    pub fn cancel(&self, task: TaskId) -> bool {
        match self.inner.tasks.get(&task) {
            Some(entry) => {
                debug!(task = %task, "Cancellation requested");
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Stream of state snapshots, starting with the current one.
    pub fn observe(&self, task: TaskId) -> Result<WatchStream<TaskState>, EngineError> {
        let entry = self
            .inner
            .tasks
            .get(&task)
            .ok_or(EngineError::UnknownTask { task })?;
        Ok(WatchStream::new(entry.state.clone()))
    }

    /// The latest state, if the task is known.
    pub fn state(&self, task: TaskId) -> Option<TaskState> {
        self.inner
            .tasks
            .get(&task)
            .map(|entry| entry.state.borrow().clone())
    }

    /// Wait for the task to reach a terminal state.
    pub async fn wait(&self, task: TaskId) -> Result<TaskState, EngineError> {
        let mut rx = self
            .inner
            .tasks
            .get(&task)
            .map(|entry| entry.state.clone())
            .ok_or(EngineError::UnknownTask { task })?;
        let finished = rx
            .wait_for(TaskState::is_finished)
            .await
            .map(|state| state.clone());
        // If the worker is gone, report whatever it last published.
        Ok(finished.unwrap_or_else(|_| rx.borrow().clone()))
    }

    /// Drop a finished task from the table. Running tasks are kept.
    pub fn forget(&self, task: TaskId) -> bool {
        self.inner
            .tasks
            .remove_if(&task, |_, entry| entry.state.borrow().is_finished())
            .is_some()
    }

    /// Ids of all known tasks.
    pub fn tasks(&self) -> Vec<TaskId> {
        self.inner.tasks.iter().map(|entry| *entry.key()).collect()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
