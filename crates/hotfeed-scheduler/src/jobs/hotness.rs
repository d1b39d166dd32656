//! Periodic hotness recomputation job.
//!
//! Runs [`HotnessRecomputer::run`] on the blocking pool on every tick.
//! Registered with `OverlapPolicy::Skip` so at most one run is active; a
//! tick that fires during a run is recorded as skipped.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use hotfeed_ranking::HotnessRecomputer;
use hotfeed_types::HotnessSettings;

use crate::{JitterConfig, JobOutput, OverlapPolicy, SchedulerError, SchedulerService};

/// Registry name of the hotness job.
pub const HOTNESS_JOB_NAME: &str = "hotness_recompute";

/// Schedule of the hotness job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotnessJobConfig {
    /// Cron expression (default: "0 * * * * *" = every minute)
    pub cron: String,

    /// Timezone (default: "UTC")
    pub timezone: String,

    /// Max jitter in seconds (default: 0)
    pub jitter_secs: u64,
}

impl Default for HotnessJobConfig {
    fn default() -> Self {
        Self::from(&HotnessSettings::default())
    }
}

impl From<&HotnessSettings> for HotnessJobConfig {
    fn from(settings: &HotnessSettings) -> Self {
        Self {
            cron: settings.cron.clone(),
            timezone: settings.timezone.clone(),
            jitter_secs: settings.jitter_secs,
        }
    }
}

/// Register the hotness job with the scheduler.
pub async fn create_hotness_job(
    scheduler: &SchedulerService,
    recomputer: Arc<HotnessRecomputer>,
    config: HotnessJobConfig,
) -> Result<uuid::Uuid, SchedulerError> {
    let uuid = scheduler
        .register_job(
            HOTNESS_JOB_NAME,
            &config.cron,
            Some(&config.timezone),
            OverlapPolicy::Skip,
            JitterConfig::new(config.jitter_secs),
            move || {
                let recomputer = recomputer.clone();
                async move {
                    let report = tokio::task::spawn_blocking(move || recomputer.run())
                        .await
                        .map_err(|e| format!("hotness task panicked: {}", e))?
                        .map_err(|e| e.to_string())?;
                    Ok(JobOutput::new().with_all(report.to_metadata()))
                }
            },
        )
        .await?;

    info!(cron = %config.cron, timezone = %config.timezone, "Registered hotness job");
    Ok(uuid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{JobResult, SchedulerConfig};
    use hotfeed_storage::Storage;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_matches_settings() {
        let config = HotnessJobConfig::default();
        assert_eq!(config.cron, "0 * * * * *");
        assert_eq!(config.timezone, "UTC");
        assert_eq!(config.jitter_secs, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_invalid_cron_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Arc::new(Storage::open(temp_dir.path()).unwrap());
        let scheduler = SchedulerService::new(SchedulerConfig::default()).await.unwrap();

        let config = HotnessJobConfig {
            cron: "sometimes".to_string(),
            ..Default::default()
        };
        let result = create_hotness_job(
            &scheduler,
            Arc::new(HotnessRecomputer::for_storage(storage)),
            config,
        )
        .await;
        assert!(matches!(result, Err(SchedulerError::InvalidCron(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_job_rescores_notes() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Arc::new(Storage::open(temp_dir.path()).unwrap());
        storage.create_note(1, 100).unwrap();
        storage.create_note(2, 200).unwrap();
        storage.like(2).unwrap();

        let mut scheduler = SchedulerService::new(SchedulerConfig {
            shutdown_timeout_secs: 2,
            ..Default::default()
        })
        .await
        .unwrap();

        let config = HotnessJobConfig {
            cron: "* * * * * *".to_string(),
            ..Default::default()
        };
        create_hotness_job(
            &scheduler,
            Arc::new(HotnessRecomputer::for_storage(storage.clone())),
            config,
        )
        .await
        .unwrap();

        scheduler.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        scheduler.shutdown().await.unwrap();

        let status = scheduler.registry().get_status(HOTNESS_JOB_NAME).unwrap();
        assert_eq!(status.last_result, Some(JobResult::Success));
        assert_eq!(status.last_run_metadata["scanned"], "2");
        assert_eq!(status.last_run_metadata["persisted"], "2");

        // likes 30 + recency 10
        let score = storage.get_note(2).unwrap().unwrap().score;
        assert!((score - 40.0).abs() < 1e-9);
    }
}
