//! Traversal progress reporting.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tidefile_core::Path;

/// Progress information during a traversal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Number of entries visited so far.
    pub entries_scanned: u64,
    /// Number of directories among them.
    pub dirs_scanned: u64,
    /// Number of entries that could not be statted or listed.
    pub errors_count: u64,
    /// Last path visited.
    pub current_path: Path,
    /// Time elapsed since the traversal started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate visit rate in entries per second.
    pub fn entries_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.entries_scanned as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}
