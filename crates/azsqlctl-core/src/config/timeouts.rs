//! Timeout and polling configuration stored in profiles
//!
//! Long-running management operations are awaited with a bounded wait, and
//! every SQL connection attempt is bounded by a connect timeout.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeouts applied to management operations and SQL connections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Maximum time to wait for a long-running operation, in seconds
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,

    /// Time between polls of a long-running operation, in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Maximum time to open a SQL connection and answer a ping, in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            operation_timeout_secs: default_operation_timeout(),
            poll_interval_secs: default_poll_interval(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl TimeoutConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }
}

// Database creation from a sample routinely takes several minutes
fn default_operation_timeout() -> u64 {
    1800
}

fn default_poll_interval() -> u64 {
    10
}

fn default_connect_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TimeoutConfig::default();
        assert_eq!(config.operation_timeout(), Duration::from_secs(1800));
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.connect_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TimeoutConfig = toml::from_str("poll_interval_secs = 2").unwrap();
        assert_eq!(config.poll_interval_secs, 2);
        assert_eq!(config.operation_timeout_secs, 1800);
        assert_eq!(config.connect_timeout_secs, 30);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = TimeoutConfig {
            poll_interval_secs: 0,
            connect_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.connect_timeout(), Duration::from_secs(1));
    }
}
