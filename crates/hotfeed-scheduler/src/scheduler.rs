//! Scheduler service wrapper around tokio-cron-scheduler.
//!
//! Adds overlap control, jitter, pause/resume and status tracking on top of
//! plain cron jobs, plus graceful shutdown.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono_tz::Tz;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::jitter::JitterConfig;
use crate::overlap::{OverlapGuard, OverlapPolicy};
use crate::registry::{JobOutput, JobRegistry, JobResult};
use crate::{SchedulerConfig, SchedulerError};

/// Validate a 6-field cron expression (sec min hour day month weekday).
///
/// ```
/// use hotfeed_scheduler::validate_cron_expression;
///
/// assert!(validate_cron_expression("0 * * * * *").is_ok());
/// assert!(validate_cron_expression("every minute").is_err());
/// ```
pub fn validate_cron_expression(expr: &str) -> Result<(), SchedulerError> {
    Job::new_async(expr, |_uuid, _lock| Box::pin(async {}))
        .map(|_| ())
        .map_err(|e| SchedulerError::InvalidCron(format!("'{}': {}", expr, e)))
}

/// Owns the cron scheduler, the job registry and the shutdown token.
pub struct SchedulerService {
    scheduler: JobScheduler,
    config: SchedulerConfig,
    registry: Arc<JobRegistry>,
    shutdown_token: CancellationToken,
    is_running: AtomicBool,
}

impl SchedulerService {
    /// Create the service. Jobs do not fire until [`start`](Self::start).
    pub async fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        config.parse_timezone()?;
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler,
            config,
            registry: Arc::new(JobRegistry::new()),
            shutdown_token: CancellationToken::new(),
            is_running: AtomicBool::new(false),
        })
    }

    pub async fn start(&self) -> Result<(), SchedulerError> {
        if self.is_running.swap(true, Ordering::SeqCst) {
            return Err(SchedulerError::AlreadyRunning);
        }
        self.scheduler.start().await?;
        info!(jobs = self.registry.job_count(), "Scheduler started");
        Ok(())
    }

    /// Stop firing new ticks and wait for running jobs.
    ///
    /// Cancels the shutdown token, waits up to the configured timeout for
    /// in-flight jobs to finish, then stops the cron scheduler.
    pub async fn shutdown(&mut self) -> Result<(), SchedulerError> {
        if !self.is_running.load(Ordering::SeqCst) {
            return Err(SchedulerError::NotRunning);
        }

        info!("Initiating scheduler shutdown");
        self.shutdown_token.cancel();

        let deadline = Instant::now() + self.config.shutdown_timeout();
        while self.registry.get_all_status().iter().any(|s| s.is_running) {
            if Instant::now() >= deadline {
                warn!("Shutdown timeout reached with jobs still running");
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        if let Err(e) = self.scheduler.shutdown().await {
            warn!("Error during scheduler shutdown: {}", e);
        }

        self.is_running.store(false, Ordering::SeqCst);
        info!("Scheduler shutdown complete");
        Ok(())
    }

    /// Token cancelled when shutdown begins.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Shared registry of job status.
    pub fn registry(&self) -> Arc<JobRegistry> {
        self.registry.clone()
    }

    pub fn pause_job(&self, job_name: &str) -> Result<(), SchedulerError> {
        if !self.registry.is_registered(job_name) {
            return Err(SchedulerError::JobNotFound(job_name.to_string()));
        }
        self.registry.set_paused(job_name, true);
        info!(job = %job_name, "Job paused");
        Ok(())
    }

    pub fn resume_job(&self, job_name: &str) -> Result<(), SchedulerError> {
        if !self.registry.is_registered(job_name) {
            return Err(SchedulerError::JobNotFound(job_name.to_string()));
        }
        self.registry.set_paused(job_name, false);
        info!(job = %job_name, "Job resumed");
        Ok(())
    }

    /// Parse an IANA timezone name.
    pub fn parse_timezone(tz_str: &str) -> Result<Tz, SchedulerError> {
        tz_str
            .parse()
            .map_err(|_| SchedulerError::InvalidTimezone(tz_str.to_string()))
    }

    /// Register a tracked cron job.
    ///
    /// Every tick:
    /// 1. is skipped if the job is paused or the service is shutting down
    /// 2. is skipped and recorded as `Skipped` if the overlap policy refuses it
    /// 3. sleeps for the configured jitter
    /// 4. runs `job_fn` and records `Success` (with metadata) or `Failed`
    ///
    /// `timezone` of `None` uses the config default.
    pub async fn register_job<F, Fut>(
        &self,
        name: &str,
        cron_expr: &str,
        timezone: Option<&str>,
        overlap: OverlapPolicy,
        jitter: JitterConfig,
        job_fn: F,
    ) -> Result<uuid::Uuid, SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JobOutput, String>> + Send + 'static,
    {
        let tz = match timezone {
            Some(tz_str) => Self::parse_timezone(tz_str)?,
            None => self.config.parse_timezone()?,
        };
        validate_cron_expression(cron_expr)?;

        let job_name = name.to_string();
        let registry = self.registry.clone();
        let token = self.shutdown_token.clone();
        let guard = Arc::new(OverlapGuard::new(overlap));
        let job_fn = Arc::new(job_fn);

        let job = Job::new_async_tz(cron_expr, tz, move |_uuid, _lock| {
            let name = job_name.clone();
            let registry = registry.clone();
            let token = token.clone();
            let guard = guard.clone();
            let job_fn = job_fn.clone();
            let jitter = jitter.clone();

            Box::pin(async move {
                if token.is_cancelled() {
                    return;
                }
                if registry.is_paused(&name) {
                    debug!(job = %name, "Job paused, skipping tick");
                    return;
                }
                let Some(_run) = guard.try_acquire() else {
                    info!(job = %name, "Previous run still active, skipping tick");
                    registry.record_complete(&name, JobResult::Skipped("overlap".into()), 0);
                    return;
                };

                if !jitter.delay(&token).await {
                    debug!(job = %name, "Shutdown during jitter delay, skipping tick");
                    return;
                }

                registry.record_start(&name);
                info!(job = %name, "Job started");
                let start = Instant::now();

                let result = job_fn().await;
                let duration_ms = start.elapsed().as_millis() as u64;

                match result {
                    Ok(output) => {
                        info!(job = %name, duration_ms, "Job completed");
                        registry.record_complete_with_metadata(
                            &name,
                            JobResult::Success,
                            duration_ms,
                            output.metadata,
                        );
                    }
                    Err(e) => {
                        warn!(job = %name, duration_ms, error = %e, "Job failed");
                        registry.record_complete(&name, JobResult::Failed(e), duration_ms);
                    }
                }
            })
        })
        .map_err(|e| SchedulerError::InvalidCron(e.to_string()))?;

        let uuid = self.scheduler.add(job).await?;
        // Ticks before this point find no entry and record nothing
        self.registry.register(name, cron_expr);
        info!(job = %name, uuid = %uuid, cron = %cron_expr, timezone = %tz.name(), "Job registered");
        Ok(uuid)
    }
}
