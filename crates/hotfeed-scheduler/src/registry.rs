//! Job registry: execution status of every registered job.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one tick of a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobResult {
    Success,
    /// The job returned an error
    Failed(String),
    /// The tick did not run (overlap, paused)
    Skipped(String),
}

/// Metadata a job reports back after a successful run.
#[derive(Debug, Clone, Default)]
pub struct JobOutput {
    pub metadata: HashMap<String, String>,
}

impl JobOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Merge a whole map of metadata.
    pub fn with_all(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata.extend(metadata);
        self
    }
}

/// Status of a registered job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_name: String,
    pub cron_expr: String,
    /// When the last tick completed
    pub last_run: Option<DateTime<Utc>>,
    pub last_duration_ms: Option<u64>,
    pub last_result: Option<JobResult>,
    /// Completed ticks, including skipped ones
    pub run_count: u64,
    pub error_count: u64,
    pub skip_count: u64,
    pub is_running: bool,
    pub is_paused: bool,
    /// Metadata reported by the last successful run
    #[serde(default)]
    pub last_run_metadata: HashMap<String, String>,
}

impl JobStatus {
    pub fn new(job_name: String, cron_expr: String) -> Self {
        Self {
            job_name,
            cron_expr,
            last_run: None,
            last_duration_ms: None,
            last_result: None,
            run_count: 0,
            error_count: 0,
            skip_count: 0,
            is_running: false,
            is_paused: false,
            last_run_metadata: HashMap::new(),
        }
    }
}

/// Thread-safe map of job name to [`JobStatus`].
///
/// Updates for unknown job names are ignored.
///
/// ```
/// use hotfeed_scheduler::{JobRegistry, JobResult};
///
/// let registry = JobRegistry::new();
/// registry.register("hotness_recompute", "0 * * * * *");
/// registry.record_start("hotness_recompute");
/// assert!(registry.is_running("hotness_recompute"));
///
/// registry.record_complete("hotness_recompute", JobResult::Success, 120);
/// assert!(!registry.is_running("hotness_recompute"));
/// ```
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, JobStatus>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Entries are only assigned field by field; poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, JobStatus>> {
        self.jobs.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, JobStatus>> {
        self.jobs.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a job, replacing any previous entry of the same name.
    pub fn register(&self, job_name: &str, cron_expr: &str) {
        self.write().insert(
            job_name.to_string(),
            JobStatus::new(job_name.to_string(), cron_expr.to_string()),
        );
    }

    pub fn record_start(&self, job_name: &str) {
        if let Some(status) = self.write().get_mut(job_name) {
            status.is_running = true;
        }
    }

    pub fn record_complete(&self, job_name: &str, result: JobResult, duration_ms: u64) {
        self.record_complete_with_metadata(job_name, result, duration_ms, HashMap::new());
    }

    /// Record a finished tick.
    ///
    /// Metadata replaces the previous run's metadata only on success.
    pub fn record_complete_with_metadata(
        &self,
        job_name: &str,
        result: JobResult,
        duration_ms: u64,
        metadata: HashMap<String, String>,
    ) {
        let mut jobs = self.write();
        let Some(status) = jobs.get_mut(job_name) else {
            return;
        };

        status.last_run = Some(Utc::now());
        status.last_duration_ms = Some(duration_ms);
        status.run_count += 1;
        match &result {
            JobResult::Success => {
                status.is_running = false;
                status.last_run_metadata = metadata;
            }
            JobResult::Failed(_) => {
                status.is_running = false;
                status.error_count += 1;
            }
            // A skipped tick says nothing about the run that is still active
            JobResult::Skipped(_) => status.skip_count += 1,
        }
        status.last_result = Some(result);
    }

    pub fn set_paused(&self, job_name: &str, paused: bool) {
        if let Some(status) = self.write().get_mut(job_name) {
            status.is_paused = paused;
        }
    }

    pub fn get_status(&self, job_name: &str) -> Option<JobStatus> {
        self.read().get(job_name).cloned()
    }

    /// Status of every job, sorted by name.
    pub fn get_all_status(&self) -> Vec<JobStatus> {
        let mut all: Vec<JobStatus> = self.read().values().cloned().collect();
        all.sort_by(|a, b| a.job_name.cmp(&b.job_name));
        all
    }

    pub fn is_running(&self, job_name: &str) -> bool {
        self.read().get(job_name).is_some_and(|s| s.is_running)
    }

    pub fn is_registered(&self, job_name: &str) -> bool {
        self.read().contains_key(job_name)
    }

    pub fn is_paused(&self, job_name: &str) -> bool {
        self.read().get(job_name).is_some_and(|s| s.is_paused)
    }

    pub fn job_count(&self) -> usize {
        self.read().len()
    }
}
