//! Configuration loading for hotfeed.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `~/.config/hotfeed/config.toml`
//! (platform equivalent via `directories`).

use config::{Config, Environment, File};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::FeedTypesError;

/// Feed read-path configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSettings {
    /// Largest page the feed reader will return; larger requests are capped.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

fn default_max_page_size() -> usize {
    30
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            max_page_size: default_max_page_size(),
        }
    }
}

/// Hotness recomputation schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotnessSettings {
    /// Cron expression, 6-field (default: every minute at second 0)
    #[serde(default = "default_hotness_cron")]
    pub cron: String,

    /// IANA timezone for the cron expression
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Max random delay before a run, in seconds
    #[serde(default)]
    pub jitter_secs: u64,
}

fn default_hotness_cron() -> String {
    "0 * * * * *".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for HotnessSettings {
    fn default() -> Self {
        Self {
            cron: default_hotness_cron(),
            timezone: default_timezone(),
            jitter_secs: 0,
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to RocksDB storage directory
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Feed read path
    #[serde(default)]
    pub feed: FeedSettings,

    /// Hotness recomputation job
    #[serde(default)]
    pub hotness: HotnessSettings,
}

fn default_db_path() -> String {
    ProjectDirs::from("", "", "hotfeed")
        .map(|p| p.data_local_dir().join("db"))
        .unwrap_or_else(|| PathBuf::from("./data"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_level: default_log_level(),
            feed: FeedSettings::default(),
            hotness: HotnessSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/hotfeed/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (HOTFEED_*, nested keys joined with `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, FeedTypesError> {
        let config_dir = ProjectDirs::from("", "", "hotfeed")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("db_path", default_db_path())
            .map_err(|e| FeedTypesError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| FeedTypesError::Config(e.to_string()))?
            .set_default("feed.max_page_size", default_max_page_size() as i64)
            .map_err(|e| FeedTypesError::Config(e.to_string()))?
            .set_default("hotness.cron", default_hotness_cron())
            .map_err(|e| FeedTypesError::Config(e.to_string()))?
            .set_default("hotness.timezone", default_timezone())
            .map_err(|e| FeedTypesError::Config(e.to_string()))?
            .set_default("hotness.jitter_secs", 0i64)
            .map_err(|e| FeedTypesError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // HOTFEED_DB_PATH, HOTFEED_FEED__MAX_PAGE_SIZE, HOTFEED_HOTNESS__CRON, ...
        builder = builder.add_source(
            Environment::with_prefix("HOTFEED")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| FeedTypesError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| FeedTypesError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), FeedTypesError> {
        if self.feed.max_page_size == 0 {
            return Err(FeedTypesError::Config(
                "feed.max_page_size must be > 0".to_string(),
            ));
        }
        if self.hotness.cron.trim().is_empty() {
            return Err(FeedTypesError::Config(
                "hotness.cron must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Expand ~ in db_path to the user's home directory
    pub fn expanded_db_path(&self) -> PathBuf {
        if let Some(rest) = self.db_path.strip_prefix("~/") {
            if let Some(dirs) = BaseDirs::new() {
                return dirs.home_dir().join(rest);
            }
        }
        PathBuf::from(&self.db_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.feed.max_page_size, 30);
        assert_eq!(settings.hotness.cron, "0 * * * * *");
        assert_eq!(settings.hotness.timezone, "UTC");
        assert_eq!(settings.hotness.jitter_secs, 0);
    }

    #[test]
    fn test_load_with_defaults() {
        let settings = Settings::load(None).unwrap();
        assert!(settings.feed.max_page_size > 0);
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());

        settings.feed.max_page_size = 0;
        assert!(matches!(
            settings.validate(),
            Err(FeedTypesError::Config(_))
        ));
    }

    #[test]
    fn test_expanded_db_path_plain() {
        let settings = Settings {
            db_path: "/var/lib/hotfeed/db".to_string(),
            ..Default::default()
        };
        assert_eq!(
            settings.expanded_db_path(),
            PathBuf::from("/var/lib/hotfeed/db")
        );
    }

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"db_path": "/tmp/x", "feed": {}}"#).unwrap();
        assert_eq!(settings.db_path, "/tmp/x");
        assert_eq!(settings.feed.max_page_size, 30);
        assert_eq!(settings.hotness.cron, "0 * * * * *");
    }
}
