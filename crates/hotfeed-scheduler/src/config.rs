//! Scheduler service configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::SchedulerError;

/// Configuration for the scheduler service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Timezone used when a job does not name one (IANA, e.g. "Asia/Shanghai")
    #[serde(default = "default_timezone")]
    pub default_timezone: String,

    /// Grace period given to running jobs on shutdown
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_timezone: default_timezone(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl SchedulerConfig {
    /// Config whose default timezone is `timezone`.
    pub fn with_timezone(timezone: impl Into<String>) -> Self {
        Self {
            default_timezone: timezone.into(),
            ..Default::default()
        }
    }

    /// Parse the default timezone.
    pub fn parse_timezone(&self) -> Result<chrono_tz::Tz, SchedulerError> {
        self.default_timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| SchedulerError::InvalidTimezone(self.default_timezone.clone()))
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.default_timezone, "UTC");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
        assert_eq!(config.parse_timezone().unwrap().name(), "UTC");
    }

    #[test]
    fn test_with_timezone() {
        let config = SchedulerConfig::with_timezone("Asia/Shanghai");
        assert_eq!(config.parse_timezone().unwrap().name(), "Asia/Shanghai");
    }

    #[test]
    fn test_invalid_timezone() {
        let config = SchedulerConfig::with_timezone("Mars/Olympus");
        match config.parse_timezone() {
            Err(SchedulerError::InvalidTimezone(tz)) => assert_eq!(tz, "Mars/Olympus"),
            other => panic!("expected InvalidTimezone, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: SchedulerConfig = serde_json::from_str(r#"{"shutdown_timeout_secs": 5}"#).unwrap();
        assert_eq!(config.default_timezone, "UTC");
        assert_eq!(config.shutdown_timeout_secs, 5);
    }
}
