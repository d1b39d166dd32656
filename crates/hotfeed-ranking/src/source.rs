//! Storage seams used by the recomputation pipeline.

use hotfeed_storage::{Storage, StorageError};
use hotfeed_types::{NoteCounters, NoteId};

/// Outcome of persisting one score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// Score and feed entry were written
    Written,
    /// The note was deleted after the snapshot; nothing was written
    NoteMissing,
}

/// Enumerates the full note population for a run.
pub trait NoteSource: Send + Sync {
    /// Read every note's counters from one point-in-time view.
    fn snapshot_notes(&self) -> Result<Vec<NoteCounters>, StorageError>;
}

/// Receives computed scores.
///
/// Persisting the same score twice must leave the same state as once.
pub trait ScoreSink: Send + Sync {
    fn persist_score(&self, note_id: NoteId, score: f64) -> Result<PersistOutcome, StorageError>;
}

impl NoteSource for Storage {
    fn snapshot_notes(&self) -> Result<Vec<NoteCounters>, StorageError> {
        Storage::snapshot_notes(self)
    }
}

impl ScoreSink for Storage {
    fn persist_score(&self, note_id: NoteId, score: f64) -> Result<PersistOutcome, StorageError> {
        if self.put_score(note_id, score)? {
            Ok(PersistOutcome::Written)
        } else {
            Ok(PersistOutcome::NoteMissing)
        }
    }
}
