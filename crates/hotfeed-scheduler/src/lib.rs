//! Background job scheduler for the hotfeed daemon.
//!
//! Wraps `tokio-cron-scheduler` with:
//!
//! - Timezone-aware cron schedules (chrono-tz)
//! - Single-flight execution via [`OverlapPolicy::Skip`]
//! - Optional start jitter
//! - A [`JobRegistry`] recording last run, duration, result and metadata
//! - Pause/resume and graceful shutdown via `CancellationToken`
//!
//! # Example
//!
//! ```ignore
//! use hotfeed_scheduler::{JitterConfig, JobOutput, OverlapPolicy, SchedulerConfig, SchedulerService};
//!
//! let scheduler = SchedulerService::new(SchedulerConfig::default()).await?;
//! scheduler
//!     .register_job(
//!         "hotness_recompute",
//!         "0 * * * * *",
//!         None,
//!         OverlapPolicy::Skip,
//!         JitterConfig::none(),
//!         || async { Ok(JobOutput::new()) },
//!     )
//!     .await?;
//! scheduler.start().await?;
//! ```

mod config;
mod error;
mod jitter;
mod overlap;
mod registry;
mod scheduler;

#[cfg(feature = "jobs")]
pub mod jobs;

pub use config::SchedulerConfig;
pub use error::SchedulerError;
pub use jitter::JitterConfig;
pub use overlap::{OverlapGuard, OverlapPolicy, RunGuard};
pub use registry::{JobOutput, JobRegistry, JobResult, JobStatus};
pub use scheduler::{validate_cron_expression, SchedulerService};

#[cfg(feature = "jobs")]
pub use jobs::hotness::{create_hotness_job, HotnessJobConfig, HOTNESS_JOB_NAME};
