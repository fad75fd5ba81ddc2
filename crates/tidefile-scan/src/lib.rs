//! Breadth-first traversal for tidefile.
//!
//! This crate walks source trees in breadth-first order using an explicit
//! work queue and computes, for a paste into a destination directory, where
//! every entry would land and whether it collides with an existing entry of
//! a different type.
//!
//! # Example
//!
//! ```rust,no_run
//! use tidefile_core::{EngineConfig, Path, Target};
//! use tidefile_scan::preflight;
//! use tokio_util::sync::CancellationToken;
//!
//! let target = Target::new([Path::from("/src/photos")], "/backup");
//! let map = preflight(&target, &EngineConfig::default(), &CancellationToken::new(), |p| {
//!     println!("Visited {} entries", p.entries_scanned);
//! })
//! .unwrap()
//! .expect("not cancelled");
//!
//! for entry in map.conflicts() {
//!     println!("{} collides with {}", entry.source, entry.destination);
//! }
//! ```

mod preflight;
mod progress;
mod walker;

pub use preflight::{ConflictKind, ConflictMap, PlannedEntry, preflight, source_base};
pub use progress::ScanProgress;
pub use walker::{WalkEntry, Walker};
