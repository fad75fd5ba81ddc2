//! File operations engine for tidefile.
//!
//! Tasks are submitted to an [`Engine`], which runs them on a bounded pool
//! of blocking workers and publishes every state change through a
//! `tokio::sync::watch` channel. Callers observe a task as a stream of
//! [`TaskState`] snapshots, cancel it cooperatively, or wait for its
//! terminal state.
//!
//! # Example
//!
//! ```rust,no_run
//! use tidefile_core::{Path, Target};
//! use tidefile_ops::{Engine, TaskKind, TaskState};
//!
//! # async fn demo() -> Result<(), tidefile_ops::EngineError> {
//! let engine = Engine::default();
//! let target = Target::new([Path::from("/src/report.pdf")], "/backup");
//! let task = engine.submit(TaskKind::Copy, target)?;
//!
//! match engine.wait(task).await? {
//!     TaskState::Success { .. } => println!("done"),
//!     state => println!("{} failures", state.failures().len()),
//! }
//! # Ok(())
//! # }
//! ```

mod conflict;
mod copy;
mod delete;
mod error;
mod executor;
mod job;
mod move_op;
mod operation;
mod progress;
mod state;

pub use conflict::{fresh_destination, fresh_name, increment};
pub use error::{EngineError, IllegalTransition};
pub use executor::Engine;
pub use operation::{Failure, TaskKind};
pub use progress::Tally;
pub use state::{TaskId, TaskState, Time};
