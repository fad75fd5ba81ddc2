//! Watch service configuration.

use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Configuration for a [`WatchService`](crate::WatchService).
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct WatchConfig {
    /// Coalescing window: events for one directory within this period
    /// produce a single notification at its end.
    #[builder(default = "Duration::from_millis(75)")]
    #[serde(default = "default_debounce")]
    pub debounce: Duration,

    /// Poll the filesystem at this interval instead of using the native
    /// backend. Useful for network filesystems without change notification.
    #[builder(default)]
    #[serde(default)]
    pub poll_interval: Option<Duration>,
}

fn default_debounce() -> Duration {
    Duration::from_millis(75)
}

impl WatchConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(Some(interval)) = self.poll_interval
            && interval.is_zero()
        {
            return Err("Poll interval must be positive".to_string());
        }
        Ok(())
    }
}

impl WatchConfig {
    /// Create a new watch config builder.
    pub fn builder() -> WatchConfigBuilder {
        WatchConfigBuilder::default()
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce: default_debounce(),
            poll_interval: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WatchConfig::builder().build().unwrap();
        assert_eq!(config.debounce, Duration::from_millis(75));
        assert!(config.poll_interval.is_none());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let result = WatchConfig::builder()
            .poll_interval(Some(Duration::ZERO))
            .build();
        assert!(result.is_err());
    }
}
