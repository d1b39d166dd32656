//! Whole-population hotness recomputation.
//!
//! A run moves through `Snapshotting -> Ranging -> Scoring -> Persisting`
//! and returns to `Idle`. Scores are written one note at a time; there is
//! no run-wide transaction, so a failed persist leaves that note's previous
//! score in place until the next run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hotfeed_storage::Storage;
use hotfeed_types::NoteId;
use tracing::{debug, error, info, warn};

use crate::error::RankingError;
use crate::range::ScoreInputRange;
use crate::score::calculate_score;
use crate::source::{NoteSource, PersistOutcome, ScoreSink};

/// Phase of the recomputation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunPhase {
    Idle = 0,
    Snapshotting = 1,
    Ranging = 2,
    Scoring = 3,
    Persisting = 4,
}

impl RunPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RunPhase::Snapshotting,
            2 => RunPhase::Ranging,
            3 => RunPhase::Scoring,
            4 => RunPhase::Persisting,
            _ => RunPhase::Idle,
        }
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunPhase::Idle => write!(f, "idle"),
            RunPhase::Snapshotting => write!(f, "snapshotting"),
            RunPhase::Ranging => write!(f, "ranging"),
            RunPhase::Scoring => write!(f, "scoring"),
            RunPhase::Persisting => write!(f, "persisting"),
        }
    }
}

/// Counters describing one completed run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecomputeReport {
    /// Notes read from the snapshot
    pub scanned: usize,
    /// Scores written
    pub persisted: usize,
    /// Scores that failed to write
    pub failed: usize,
    /// Notes deleted between snapshot and persist
    pub skipped_missing: usize,
    /// Wall time of the run
    pub duration: Duration,
}

impl RecomputeReport {
    /// Flatten into string metadata for the job registry.
    pub fn to_metadata(&self) -> HashMap<String, String> {
        HashMap::from([
            ("scanned".to_string(), self.scanned.to_string()),
            ("persisted".to_string(), self.persisted.to_string()),
            ("failed".to_string(), self.failed.to_string()),
            ("skipped_missing".to_string(), self.skipped_missing.to_string()),
            ("duration_ms".to_string(), self.duration.as_millis().to_string()),
        ])
    }
}

/// Recomputes and persists the hotness score of every note.
///
/// Only one run may be active per recomputer; a concurrent call to
/// [`run`](Self::run) fails with [`RankingError::AlreadyRunning`].
pub struct HotnessRecomputer {
    source: Arc<dyn NoteSource>,
    sink: Arc<dyn ScoreSink>,
    phase: AtomicU8,
    running: AtomicBool,
}

/// Returns the recomputer to `Idle` when a run ends, including on early return.
struct RunGuard<'a> {
    recomputer: &'a HotnessRecomputer,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.recomputer.set_phase(RunPhase::Idle);
        self.recomputer.running.store(false, Ordering::Release);
    }
}

impl HotnessRecomputer {
    pub fn new(source: Arc<dyn NoteSource>, sink: Arc<dyn ScoreSink>) -> Self {
        Self {
            source,
            sink,
            phase: AtomicU8::new(RunPhase::Idle as u8),
            running: AtomicBool::new(false),
        }
    }

    /// Recomputer reading from and writing to the same storage.
    pub fn for_storage(storage: Arc<Storage>) -> Self {
        Self::new(storage.clone(), storage)
    }

    /// Current phase.
    pub fn phase(&self) -> RunPhase {
        RunPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn set_phase(&self, phase: RunPhase) {
        debug!(%phase, "Recompute phase");
        self.phase.store(phase as u8, Ordering::Release);
    }

    /// Execute one full run.
    ///
    /// A snapshot failure aborts the run. Per-note persist failures are
    /// logged and counted; the run continues with the next note.
    pub fn run(&self) -> Result<RecomputeReport, RankingError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RankingError::AlreadyRunning);
        }
        let _guard = RunGuard { recomputer: self };
        let start = Instant::now();

        self.set_phase(RunPhase::Snapshotting);
        let notes = self.source.snapshot_notes().map_err(|e| {
            error!(error = %e, "Hotness snapshot failed");
            RankingError::Snapshot(e)
        })?;

        let mut report = RecomputeReport {
            scanned: notes.len(),
            ..Default::default()
        };

        self.set_phase(RunPhase::Ranging);
        let Some(ranges) = ScoreInputRange::from_snapshot(&notes) else {
            report.duration = start.elapsed();
            info!("No notes to score");
            return Ok(report);
        };

        self.set_phase(RunPhase::Scoring);
        let scores: Vec<(NoteId, f64)> = notes
            .iter()
            .map(|note| (note.note_id, calculate_score(note, &ranges)))
            .collect();

        self.set_phase(RunPhase::Persisting);
        for (note_id, score) in scores {
            match self.sink.persist_score(note_id, score) {
                Ok(PersistOutcome::Written) => report.persisted += 1,
                Ok(PersistOutcome::NoteMissing) => report.skipped_missing += 1,
                Err(e) => {
                    warn!(note_id, error = %e, "Failed to persist score");
                    report.failed += 1;
                }
            }
        }

        report.duration = start.elapsed();
        info!(
            scanned = report.scanned,
            persisted = report.persisted,
            failed = report.failed,
            skipped_missing = report.skipped_missing,
            duration_ms = report.duration.as_millis() as u64,
            "Hotness recomputation complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotfeed_storage::StorageError;
    use hotfeed_types::NoteCounters;
    use std::sync::Barrier;
    use tempfile::TempDir;

    fn create_test_storage() -> (Arc<Storage>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::open(temp_dir.path()).unwrap();
        (Arc::new(storage), temp_dir)
    }

    fn seed(storage: &Storage) {
        storage.create_note(1, 100).unwrap();
        storage.create_note(2, 50).unwrap();
        storage.create_note(3, 100).unwrap();
        for id in [1, 3] {
            for _ in 0..10 {
                storage.like(id).unwrap();
            }
            for _ in 0..5 {
                storage.collect(id).unwrap();
            }
        }
    }

    struct FailingSource;

    impl NoteSource for FailingSource {
        fn snapshot_notes(&self) -> Result<Vec<NoteCounters>, StorageError> {
            Err(StorageError::ColumnFamilyNotFound("notes".to_string()))
        }
    }

    /// Fails every persist for one note id, delegates the rest.
    struct FlakySink {
        inner: Arc<Storage>,
        fail_id: NoteId,
    }

    impl ScoreSink for FlakySink {
        fn persist_score(&self, note_id: NoteId, score: f64) -> Result<PersistOutcome, StorageError> {
            if note_id == self.fail_id {
                return Err(StorageError::LockPoisoned);
            }
            self.inner.persist_score(note_id, score)
        }
    }

    /// Deletes a note right after taking the snapshot.
    struct DeletingSource {
        inner: Arc<Storage>,
        delete_id: NoteId,
    }

    impl NoteSource for DeletingSource {
        fn snapshot_notes(&self) -> Result<Vec<NoteCounters>, StorageError> {
            let notes = self.inner.snapshot_notes()?;
            self.inner.delete_note(self.delete_id)?;
            Ok(notes)
        }
    }

    /// Parks inside the snapshot until the test releases it.
    struct BlockingSource {
        barrier: Arc<Barrier>,
    }

    impl NoteSource for BlockingSource {
        fn snapshot_notes(&self) -> Result<Vec<NoteCounters>, StorageError> {
            self.barrier.wait();
            self.barrier.wait();
            Ok(Vec::new())
        }
    }

    /// Parks inside the first score write until the test releases it.
    struct BlockingSink {
        storage: Arc<Storage>,
        barrier: Arc<Barrier>,
        writes: std::sync::atomic::AtomicUsize,
    }

    impl ScoreSink for BlockingSink {
        fn persist_score(&self, note_id: NoteId, score: f64) -> Result<PersistOutcome, StorageError> {
            if self.writes.fetch_add(1, Ordering::SeqCst) == 0 {
                self.barrier.wait();
                self.barrier.wait();
            }
            self.storage.persist_score(note_id, score)
        }
    }

    #[test]
    fn test_run_persists_scores() {
        let (storage, _temp) = create_test_storage();
        seed(&storage);

        let recomputer = HotnessRecomputer::for_storage(storage.clone());
        let report = recomputer.run().unwrap();

        assert_eq!(report.scanned, 3);
        assert_eq!(report.persisted, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(recomputer.phase(), RunPhase::Idle);

        let top = storage.get_note(1).unwrap().unwrap().score;
        assert!((top - 80.0).abs() < 1e-9);
        assert_eq!(storage.get_note(2).unwrap().unwrap().score, 0.0);
        assert_eq!(storage.get_note(3).unwrap().unwrap().score, top);
    }

    #[test]
    fn test_empty_population() {
        let (storage, _temp) = create_test_storage();
        let report = HotnessRecomputer::for_storage(storage).run().unwrap();
        assert_eq!(report.scanned, 0);
        assert_eq!(report.persisted, 0);
    }

    #[test]
    fn test_rerun_without_mutation_is_idempotent() {
        let (storage, _temp) = create_test_storage();
        seed(&storage);
        let recomputer = HotnessRecomputer::for_storage(storage.clone());

        recomputer.run().unwrap();
        let first: Vec<f64> = (1..=3)
            .map(|id| storage.get_note(id).unwrap().unwrap().score)
            .collect();
        recomputer.run().unwrap();
        let second: Vec<f64> = (1..=3)
            .map(|id| storage.get_note(id).unwrap().unwrap().score)
            .collect();

        assert_eq!(first, second);
        assert_eq!(storage.get_stats().unwrap().feed_entry_count, 3);
    }

    #[test]
    fn test_mutation_visible_next_run() {
        let (storage, _temp) = create_test_storage();
        seed(&storage);
        let recomputer = HotnessRecomputer::for_storage(storage.clone());
        recomputer.run().unwrap();
        assert_eq!(storage.get_note(2).unwrap().unwrap().score, 0.0);

        storage.add_comment(2).unwrap();
        // Score is stale until the next run
        assert_eq!(storage.get_note(2).unwrap().unwrap().score, 0.0);

        recomputer.run().unwrap();
        let score = storage.get_note(2).unwrap().unwrap().score;
        assert!((score - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_failure_aborts_run() {
        let (storage, _temp) = create_test_storage();
        let recomputer = HotnessRecomputer::new(Arc::new(FailingSource), storage);

        let result = recomputer.run();
        assert!(matches!(result, Err(RankingError::Snapshot(_))));
        assert_eq!(recomputer.phase(), RunPhase::Idle);
        assert!(!recomputer.is_running());
    }

    #[test]
    fn test_persist_failure_is_skipped() {
        let (storage, _temp) = create_test_storage();
        seed(&storage);
        let sink = Arc::new(FlakySink {
            inner: storage.clone(),
            fail_id: 1,
        });
        let recomputer = HotnessRecomputer::new(storage.clone(), sink);

        let report = recomputer.run().unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.persisted, 2);
        // Note 1 keeps its previous score, the others are updated
        assert_eq!(storage.get_note(1).unwrap().unwrap().score, 0.0);
        assert!(storage.get_note(3).unwrap().unwrap().score > 0.0);
    }

    #[test]
    fn test_deleted_note_not_resurrected() {
        let (storage, _temp) = create_test_storage();
        seed(&storage);
        let source = Arc::new(DeletingSource {
            inner: storage.clone(),
            delete_id: 3,
        });
        let recomputer = HotnessRecomputer::new(source, storage.clone());

        let report = recomputer.run().unwrap();
        assert_eq!(report.scanned, 3);
        assert_eq!(report.skipped_missing, 1);
        assert!(storage.get_note(3).unwrap().is_none());
        assert_eq!(storage.get_stats().unwrap().feed_entry_count, 2);
    }

    #[test]
    fn test_single_flight_and_phase() {
        let (storage, _temp) = create_test_storage();
        let barrier = Arc::new(Barrier::new(2));
        let recomputer = Arc::new(HotnessRecomputer::new(
            Arc::new(BlockingSource {
                barrier: barrier.clone(),
            }),
            storage,
        ));

        let runner = {
            let recomputer = recomputer.clone();
            std::thread::spawn(move || recomputer.run())
        };

        barrier.wait();
        assert_eq!(recomputer.phase(), RunPhase::Snapshotting);
        assert!(recomputer.is_running());
        assert!(matches!(recomputer.run(), Err(RankingError::AlreadyRunning)));
        barrier.wait();

        let report = runner.join().unwrap().unwrap();
        assert_eq!(report.scanned, 0);
        assert_eq!(recomputer.phase(), RunPhase::Idle);
    }

    #[test]
    fn test_scores_computed_before_first_write() {
        let (storage, _temp) = create_test_storage();
        seed(&storage);

        let barrier = Arc::new(Barrier::new(2));
        let sink = Arc::new(BlockingSink {
            storage: storage.clone(),
            barrier: barrier.clone(),
            writes: std::sync::atomic::AtomicUsize::new(0),
        });
        let recomputer = Arc::new(HotnessRecomputer::new(storage.clone(), sink.clone()));

        let runner = {
            let recomputer = recomputer.clone();
            std::thread::spawn(move || recomputer.run())
        };

        barrier.wait();
        assert_eq!(recomputer.phase(), RunPhase::Persisting);
        assert!(recomputer.is_running());
        assert_eq!(sink.writes.load(Ordering::SeqCst), 1);
        // Nothing written yet; every note still has its creation score
        for id in 1..=3 {
            assert_eq!(storage.get_note(id).unwrap().unwrap().score, 0.0);
        }
        barrier.wait();

        let report = runner.join().unwrap().unwrap();
        assert_eq!(report.persisted, 3);
        assert_eq!(sink.writes.load(Ordering::SeqCst), 3);
        assert_eq!(recomputer.phase(), RunPhase::Idle);
        assert!(!recomputer.is_running());
    }

    #[test]
    fn test_report_metadata() {
        let report = RecomputeReport {
            scanned: 4,
            persisted: 3,
            failed: 1,
            skipped_missing: 0,
            duration: Duration::from_millis(12),
        };
        let metadata = report.to_metadata();
        assert_eq!(metadata["scanned"], "4");
        assert_eq!(metadata["failed"], "1");
        assert_eq!(metadata["duration_ms"], "12");
    }
}
