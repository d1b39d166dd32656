//! Overlap handling for scheduled jobs.
//!
//! A cron tick can fire while the previous run of the same job is still
//! working. The policy decides whether the new tick runs anyway or is
//! dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// What to do with a tick that fires while the job is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Drop the tick; it is recorded as skipped in the registry.
    #[default]
    Skip,
    /// Start another instance alongside the running one.
    Concurrent,
}

/// Per-job running flag.
pub struct OverlapGuard {
    is_running: Arc<AtomicBool>,
    policy: OverlapPolicy,
}

impl OverlapGuard {
    pub fn new(policy: OverlapPolicy) -> Self {
        Self {
            is_running: Arc::new(AtomicBool::new(false)),
            policy,
        }
    }

    /// Claim the job for one run.
    ///
    /// Under `Skip`, returns `None` while another run holds the guard.
    /// Under `Concurrent`, always succeeds and does not touch the flag.
    pub fn try_acquire(&self) -> Option<RunGuard> {
        match self.policy {
            OverlapPolicy::Skip => self
                .is_running
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .ok()
                .map(|_| RunGuard {
                    flag: Some(self.is_running.clone()),
                }),
            OverlapPolicy::Concurrent => Some(RunGuard { flag: None }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }
}

/// Releases the running flag when the run ends, even if it panics.
pub struct RunGuard {
    flag: Option<Arc<AtomicBool>>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if let Some(flag) = &self.flag {
            flag.store(false, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_skip_is_single_flight() {
        let guard = OverlapGuard::new(OverlapPolicy::Skip);

        let first = guard.try_acquire();
        assert!(first.is_some());
        assert!(guard.is_running());
        assert!(guard.try_acquire().is_none());

        drop(first);
        assert!(!guard.is_running());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_concurrent_never_blocks() {
        let guard = OverlapGuard::new(OverlapPolicy::Concurrent);
        let runs: Vec<_> = (0..3).map(|_| guard.try_acquire()).collect();
        assert!(runs.iter().all(Option::is_some));
        assert!(!guard.is_running());
        assert_eq!(guard.policy(), OverlapPolicy::Concurrent);
    }

    #[test]
    fn test_skip_admits_one_of_many_racers() {
        let guard = Arc::new(OverlapGuard::new(OverlapPolicy::Skip));
        let admitted = Arc::new(AtomicU32::new(0));
        let start = Arc::new(Barrier::new(8));
        let hold = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = guard.clone();
                let admitted = admitted.clone();
                let start = start.clone();
                let hold = hold.clone();
                thread::spawn(move || {
                    start.wait();
                    let run = guard.try_acquire();
                    if run.is_some() {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                    // Everyone has tried before the winner releases
                    hold.wait();
                    drop(run);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 1);
        assert!(!guard.is_running());
    }

    #[test]
    fn test_policy_serde_names() {
        assert_eq!(serde_json::to_string(&OverlapPolicy::Skip).unwrap(), "\"skip\"");
        let policy: OverlapPolicy = serde_json::from_str("\"concurrent\"").unwrap();
        assert_eq!(policy, OverlapPolicy::Concurrent);
    }
}
