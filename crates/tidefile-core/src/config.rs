//! Engine configuration.

use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Tuning for traversal and file operations.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Minimum time between two progress reports.
    #[builder(default = "Duration::from_secs(1)")]
    #[serde(default = "default_progress_interval")]
    pub progress_interval: Duration,

    /// Maximum number of operations running at once (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub max_workers: usize,

    /// Buffer size for file content copies.
    #[builder(default = "8 * 1024")]
    #[serde(default = "default_copy_buffer_size")]
    pub copy_buffer_size: usize,

    /// Carry access and modification times over to copies.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub preserve_timestamps: bool,
}

fn default_progress_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_copy_buffer_size() -> usize {
    8 * 1024
}

fn default_true() -> bool {
    true
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.copy_buffer_size == Some(0) {
            return Err("Copy buffer size must be positive".to_string());
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Create a new engine config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// The effective worker count.
    pub fn worker_count(&self) -> usize {
        if self.max_workers > 0 {
            self.max_workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            progress_interval: default_progress_interval(),
            max_workers: 0,
            copy_buffer_size: default_copy_buffer_size(),
            preserve_timestamps: true,
        }
    }
}
