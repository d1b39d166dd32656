//! RocksDB wrapper for hotfeed storage.
//!
//! Provides:
//! - Database open with column family setup
//! - Note lifecycle (create, delete, touch) and counter mutations
//! - Per-note score persistence that keeps the feed index in step
//! - Snapshot reads for the recomputation scan and feed pages

use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use hotfeed_types::{CounterField, NoteCounters, NoteId, ScoredNote, DEFAULT_SCORE};

use crate::column_families::{build_cf_descriptors, ALL_CF_NAMES, CF_FEED, CF_NOTES, CF_SCORES};
use crate::error::StorageError;
use crate::keys::{decode_score, encode_score, FeedKey, NoteKey, ScoreKey};

/// Main storage interface for hotfeed
pub struct Storage {
    db: DB,
    /// Serializes every read-modify-write so counter updates and score
    /// persists never interleave on the same note.
    write_lock: Mutex<()>,
}

impl Storage {
    /// Open storage at the given path, creating if necessary
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        info!("Opening storage at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_background_jobs(4);

        let cf_descriptors = build_cf_descriptors();
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(name.to_string()))
    }

    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>, StorageError> {
        self.write_lock.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn read_counters(&self, note_id: NoteId) -> Result<Option<NoteCounters>, StorageError> {
        let notes_cf = self.cf(CF_NOTES)?;
        match self.db.get_cf(notes_cf, NoteKey::new(note_id).to_bytes())? {
            Some(bytes) => Ok(Some(NoteCounters::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn read_score(&self, note_id: NoteId) -> Result<Option<f64>, StorageError> {
        let scores_cf = self.cf(CF_SCORES)?;
        match self.db.get_cf(scores_cf, ScoreKey::new(note_id).to_bytes())? {
            Some(bytes) => Ok(Some(decode_score(&bytes)?)),
            None => Ok(None),
        }
    }

    // ==================== Note Lifecycle ====================

    /// Create a note with zero counters and the default score.
    ///
    /// The note is immediately visible in the feed at `DEFAULT_SCORE`.
    pub fn create_note(&self, note_id: NoteId, update_time: i64) -> Result<NoteCounters, StorageError> {
        let notes_cf = self.cf(CF_NOTES)?;
        let scores_cf = self.cf(CF_SCORES)?;
        let feed_cf = self.cf(CF_FEED)?;

        let _guard = self.lock_writes()?;
        if self.read_counters(note_id)?.is_some() {
            return Err(StorageError::AlreadyExists(note_id));
        }

        let counters = NoteCounters::new(note_id, update_time);

        let mut batch = WriteBatch::default();
        batch.put_cf(notes_cf, NoteKey::new(note_id).to_bytes(), counters.to_bytes()?);
        batch.put_cf(scores_cf, ScoreKey::new(note_id).to_bytes(), encode_score(DEFAULT_SCORE));
        batch.put_cf(feed_cf, FeedKey::new(DEFAULT_SCORE, note_id).to_bytes(), b"");
        self.db.write(batch)?;

        debug!(note_id, update_time, "Created note");
        Ok(counters)
    }

    /// Delete a note together with its score and feed entry.
    ///
    /// Returns false if the note did not exist.
    pub fn delete_note(&self, note_id: NoteId) -> Result<bool, StorageError> {
        let notes_cf = self.cf(CF_NOTES)?;
        let scores_cf = self.cf(CF_SCORES)?;
        let feed_cf = self.cf(CF_FEED)?;

        let _guard = self.lock_writes()?;
        if self.read_counters(note_id)?.is_none() {
            return Ok(false);
        }
        let score = self.read_score(note_id)?.unwrap_or(DEFAULT_SCORE);

        let mut batch = WriteBatch::default();
        batch.delete_cf(notes_cf, NoteKey::new(note_id).to_bytes());
        batch.delete_cf(scores_cf, ScoreKey::new(note_id).to_bytes());
        batch.delete_cf(feed_cf, FeedKey::new(score, note_id).to_bytes());
        self.db.write(batch)?;

        debug!(note_id, "Deleted note");
        Ok(true)
    }

    /// Record a content edit by setting the note's update timestamp.
    pub fn touch_note(&self, note_id: NoteId, update_time: i64) -> Result<NoteCounters, StorageError> {
        let notes_cf = self.cf(CF_NOTES)?;

        let _guard = self.lock_writes()?;
        let mut counters = self
            .read_counters(note_id)?
            .ok_or(StorageError::NotFound(note_id))?;
        counters.update_time = update_time;
        self.db
            .put_cf(notes_cf, NoteKey::new(note_id).to_bytes(), counters.to_bytes()?)?;

        Ok(counters)
    }

    /// Get a note's counters and its last persisted score.
    ///
    /// Both are read from one snapshot, so the pair never straddles a
    /// concurrent write.
    pub fn get_note(&self, note_id: NoteId) -> Result<Option<ScoredNote>, StorageError> {
        let notes_cf = self.cf(CF_NOTES)?;
        let scores_cf = self.cf(CF_SCORES)?;
        let snapshot = self.db.snapshot();

        let Some(bytes) = snapshot.get_cf(notes_cf, NoteKey::new(note_id).to_bytes())? else {
            return Ok(None);
        };
        let counters = NoteCounters::from_bytes(&bytes)?;
        let score = match snapshot.get_cf(scores_cf, ScoreKey::new(note_id).to_bytes())? {
            Some(bytes) => decode_score(&bytes)?,
            None => DEFAULT_SCORE,
        };
        Ok(Some(ScoredNote::new(counters, score)))
    }

    // ==================== Counter Mutations ====================

    /// Atomically add `delta` to one counter of a note.
    ///
    /// Returns the new counter value. A result below zero is rejected with
    /// `CounterUnderflow` and the stored value is left unchanged.
    pub fn increment(
        &self,
        note_id: NoteId,
        field: CounterField,
        delta: i64,
    ) -> Result<u64, StorageError> {
        let notes_cf = self.cf(CF_NOTES)?;

        let _guard = self.lock_writes()?;
        let mut counters = self
            .read_counters(note_id)?
            .ok_or(StorageError::NotFound(note_id))?;

        let current = counters.get(field);
        let Some(next) = counters.apply_delta(field, delta) else {
            return Err(if delta < 0 {
                StorageError::CounterUnderflow { note_id, field, current, delta }
            } else {
                StorageError::CounterOverflow { note_id, field, current, delta }
            });
        };

        self.db
            .put_cf(notes_cf, NoteKey::new(note_id).to_bytes(), counters.to_bytes()?)?;
        debug!(note_id, %field, delta, value = next, "Counter updated");
        Ok(next)
    }

    pub fn like(&self, note_id: NoteId) -> Result<u64, StorageError> {
        self.increment(note_id, CounterField::Likes, 1)
    }

    pub fn unlike(&self, note_id: NoteId) -> Result<u64, StorageError> {
        self.increment(note_id, CounterField::Likes, -1)
    }

    pub fn collect(&self, note_id: NoteId) -> Result<u64, StorageError> {
        self.increment(note_id, CounterField::Collects, 1)
    }

    pub fn uncollect(&self, note_id: NoteId) -> Result<u64, StorageError> {
        self.increment(note_id, CounterField::Collects, -1)
    }

    pub fn add_comment(&self, note_id: NoteId) -> Result<u64, StorageError> {
        self.increment(note_id, CounterField::Comments, 1)
    }

    pub fn remove_comment(&self, note_id: NoteId) -> Result<u64, StorageError> {
        self.increment(note_id, CounterField::Comments, -1)
    }

    pub fn record_view(&self, note_id: NoteId) -> Result<u64, StorageError> {
        self.increment(note_id, CounterField::Views, 1)
    }

    // ==================== Scores ====================

    /// Read every note's counters from one point-in-time snapshot.
    ///
    /// Does not take the write lock; writes committed after the snapshot
    /// are not included.
    pub fn snapshot_notes(&self) -> Result<Vec<NoteCounters>, StorageError> {
        let notes_cf = self.cf(CF_NOTES)?;
        let snapshot = self.db.snapshot();

        let mut notes = Vec::new();
        for item in snapshot.iterator_cf(notes_cf, IteratorMode::Start) {
            let (_, value) = item?;
            notes.push(NoteCounters::from_bytes(&value)?);
        }

        debug!(count = notes.len(), "Snapshot of note counters taken");
        Ok(notes)
    }

    /// Persist a note's score and move its feed entry in one write batch.
    ///
    /// Returns false without writing if the note no longer exists, so a
    /// note deleted after a scan is never resurrected in the feed.
    /// Writing the same score twice is a no-op in effect.
    pub fn put_score(&self, note_id: NoteId, score: f64) -> Result<bool, StorageError> {
        let scores_cf = self.cf(CF_SCORES)?;
        let feed_cf = self.cf(CF_FEED)?;

        let _guard = self.lock_writes()?;
        if self.read_counters(note_id)?.is_none() {
            debug!(note_id, "Skipping score for deleted note");
            return Ok(false);
        }

        let mut batch = WriteBatch::default();
        if let Some(old) = self.read_score(note_id)? {
            batch.delete_cf(feed_cf, FeedKey::new(old, note_id).to_bytes());
        }
        batch.put_cf(scores_cf, ScoreKey::new(note_id).to_bytes(), encode_score(score));
        batch.put_cf(feed_cf, FeedKey::new(score, note_id).to_bytes(), b"");
        self.db.write(batch)?;

        Ok(true)
    }

    // ==================== Feed ====================

    /// Read up to `limit` notes in feed order from one snapshot.
    ///
    /// With `after = Some(key)` the scan starts strictly after that key.
    pub fn scan_feed(
        &self,
        after: Option<FeedKey>,
        limit: usize,
    ) -> Result<Vec<ScoredNote>, StorageError> {
        let notes_cf = self.cf(CF_NOTES)?;
        let feed_cf = self.cf(CF_FEED)?;
        let snapshot = self.db.snapshot();

        let start = match after {
            Some(key) => key.to_bytes(),
            None => FeedKey::prefix().to_vec(),
        };
        let skip = after.map(|key| key.to_bytes());

        let mut results = Vec::new();
        let iter = snapshot.iterator_cf(feed_cf, IteratorMode::From(&start, Direction::Forward));
        for item in iter {
            if results.len() >= limit {
                break;
            }
            let (key, _) = item?;
            if !key.starts_with(FeedKey::prefix()) {
                break;
            }
            if skip.as_deref() == Some(key.as_ref()) {
                continue;
            }

            let feed_key = FeedKey::from_bytes(&key)?;
            let Some(bytes) =
                snapshot.get_cf(notes_cf, NoteKey::new(feed_key.note_id).to_bytes())?
            else {
                continue;
            };
            let counters = NoteCounters::from_bytes(&bytes)?;
            results.push(ScoredNote::new(counters, feed_key.score));
        }

        Ok(results)
    }

    // ===== Admin Operations =====

    /// Flush all column families to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        for cf_name in ALL_CF_NAMES {
            if let Some(cf) = self.db.cf_handle(cf_name) {
                self.db.flush_cf(cf)?;
            }
        }
        Ok(())
    }

    /// Trigger manual compaction on all column families.
    pub fn compact(&self) -> Result<(), StorageError> {
        info!("Starting full compaction...");
        for cf_name in ALL_CF_NAMES {
            if let Some(cf) = self.db.cf_handle(cf_name) {
                self.db.compact_range_cf::<&[u8], &[u8]>(cf, None, None);
            }
        }
        info!("Compaction complete");
        Ok(())
    }

    /// Get database statistics.
    pub fn get_stats(&self) -> Result<StorageStats, StorageError> {
        Ok(StorageStats {
            note_count: self.count_cf_entries(self.cf(CF_NOTES)?)?,
            feed_entry_count: self.count_cf_entries(self.cf(CF_FEED)?)?,
            disk_usage_bytes: self.get_disk_usage(),
        })
    }

    fn count_cf_entries(&self, cf: &rocksdb::ColumnFamily) -> Result<u64, StorageError> {
        let mut count = 0u64;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    fn get_disk_usage(&self) -> u64 {
        let mut total_size = 0u64;
        if let Ok(entries) = std::fs::read_dir(self.db.path()) {
            for entry in entries.flatten() {
                if let Ok(metadata) = entry.metadata() {
                    total_size += metadata.len();
                }
            }
        }
        total_size
    }
}

/// Statistics about the storage.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of notes stored
    pub note_count: u64,
    /// Number of entries in the ranked feed index
    pub feed_entry_count: u64,
    /// Total disk usage in bytes
    pub disk_usage_bytes: u64,
}
