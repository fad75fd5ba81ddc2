//! Core types for tidefile.
//!
//! This crate provides the path model, file identity, directory listing and
//! the thin syscall layer the rest of the workspace builds on, plus shared
//! progress, target and configuration types.

mod config;
mod dirent;
mod error;
pub mod fs;
mod path;
mod progress;
mod stat;
mod target;
mod throttle;

pub use config::{EngineConfig, EngineConfigBuilder, EngineConfigBuilderError};
pub use dirent::{Dir, DirEntry, list, list_children};
pub use error::{FsError, PathError, ProgressError, TargetError};
pub use path::{Name, Path};
pub use progress::Progress;
pub use stat::{FileKind, FileStat, InodeInfo, LinkOption, Timespec, lstat, stat};
pub use target::Target;
pub use throttle::Throttle;
