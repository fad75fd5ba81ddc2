//! Progress publication for running tasks.

use std::time::{Duration, Instant};

use tidefile_core::{Progress, Throttle};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::IllegalTransition;
use crate::operation::Failure;
use crate::state::{TaskState, Time};

/// Item and byte totals for one unit of work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub items: u64,
    pub bytes: u64,
}

impl Tally {
    pub fn add(&mut self, other: Tally) {
        self.items = self.items.saturating_add(other.items);
        self.bytes = self.bytes.saturating_add(other.bytes);
    }
}

/// Owns the write side of a task's state channel.
///
/// Counters only grow. Running snapshots are published at most once per
/// interval; transitions are always published.
pub(crate) struct Reporter {
    tx: watch::Sender<TaskState>,
    state: TaskState,
    throttle: Throttle,
    total: Tally,
    done: Tally,
}

impl Reporter {
    pub fn new(tx: watch::Sender<TaskState>, interval: Duration) -> Self {
        let state = tx.borrow().clone();
        Self {
            tx,
            state,
            throttle: Throttle::new(interval),
            total: Tally::default(),
            done: Tally::default(),
        }
    }

    fn transition(
        &mut self,
        next: impl FnOnce(TaskState) -> Result<TaskState, IllegalTransition>,
    ) {
        match next(self.state.clone()) {
            Ok(state) => {
                self.state = state.clone();
                self.tx.send_replace(state);
            }
            Err(err) => warn!(task = %self.state.task(), error = %err, "Dropped state change"),
        }
    }

    fn snapshot(&self) -> (Progress, Progress) {
        (
            Progress::normalize(self.total.items, self.done.items),
            Progress::normalize(self.total.bytes, self.done.bytes),
        )
    }

    /// Enter `Running` with the planned totals.
    pub fn start(&mut self, total: Tally) {
        self.total = total;
        let (items, bytes) = self.snapshot();
        info!(
            task = %self.state.task(),
            items = total.items,
            bytes = total.bytes,
            "Task running"
        );
        self.throttle.ready(Instant::now());
        self.transition(|state| state.running(Time::now(), items, bytes));
    }

    /// Record finished work and publish if the interval has passed.
    pub fn advance(&mut self, items: u64, bytes: u64) {
        self.done.add(Tally { items, bytes });
        if self.throttle.ready(Instant::now()) {
            self.publish();
        }
    }

    /// Publish the current counters regardless of the throttle.
    pub fn publish(&mut self) {
        let (items, bytes) = self.snapshot();
        self.transition(|state| state.running(Time::now(), items, bytes));
    }

    /// Move to the terminal state that matches how the work ended.
    pub fn finish(mut self, cancelled: bool, failures: Vec<Failure>) {
        let task = self.state.task();
        if cancelled {
            if matches!(self.state, TaskState::Running { .. }) {
                self.publish();
            }
            info!(task = %task, failures = failures.len(), "Task cancelled");
            self.transition(|state| state.cancelled(Time::now(), failures));
        } else if failures.is_empty() {
            info!(task = %task, "Task succeeded");
            self.transition(|state| state.success(Time::now()));
        } else {
            info!(task = %task, failures = failures.len(), "Task failed");
            self.transition(|state| state.failed(Time::now(), failures));
        }
    }
}
