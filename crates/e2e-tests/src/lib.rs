//! End-to-end test infrastructure for hotfeed.
//!
//! Provides a shared TestHarness and helper functions for E2E tests
//! covering the full mutate-recompute-paginate pipeline.

use std::collections::HashSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use hotfeed_ranking::{FeedPage, FeedReader, FeedRequest, HotnessRecomputer};
use hotfeed_storage::Storage;
use hotfeed_types::{NoteId, ScoredNote};

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Shared storage instance
    pub storage: Arc<Storage>,
}

impl TestHarness {
    /// Create a new test harness with temp directory and storage.
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let storage =
            Arc::new(Storage::open(temp_dir.path()).expect("Failed to open test storage"));

        Self {
            _temp_dir: temp_dir,
            storage,
        }
    }

    /// Recomputer bound to this harness's storage.
    pub fn recomputer(&self) -> HotnessRecomputer {
        HotnessRecomputer::for_storage(self.storage.clone())
    }

    /// Feed reader with the given maximum page size.
    pub fn reader(&self, max_page_size: usize) -> FeedReader {
        FeedReader::new(self.storage.clone(), max_page_size)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Engagement to seed for one note.
#[derive(Debug, Clone, Copy)]
pub struct SeedNote {
    pub note_id: NoteId,
    pub likes: u64,
    pub collects: u64,
    pub comments: u64,
    pub update_time: i64,
}

impl SeedNote {
    pub fn new(note_id: NoteId, likes: u64, collects: u64, comments: u64, update_time: i64) -> Self {
        Self {
            note_id,
            likes,
            collects,
            comments,
            update_time,
        }
    }
}

/// Create notes and drive their counters through the public mutation API.
pub fn seed_notes(storage: &Storage, notes: &[SeedNote]) {
    for note in notes {
        storage
            .create_note(note.note_id, note.update_time)
            .expect("Failed to create note");
        for _ in 0..note.likes {
            storage.like(note.note_id).expect("Failed to like");
        }
        for _ in 0..note.collects {
            storage.collect(note.note_id).expect("Failed to collect");
        }
        for _ in 0..note.comments {
            storage.add_comment(note.note_id).expect("Failed to comment");
        }
    }
}

/// The three-note population where A and C tie:
/// A(10, 5, 0, ts=100), B(0, 0, 0, ts=50), C(10, 5, 0, ts=100).
pub fn tie_population() -> Vec<SeedNote> {
    vec![
        SeedNote::new(1, 10, 5, 0, 100),
        SeedNote::new(2, 0, 0, 0, 50),
        SeedNote::new(3, 10, 5, 0, 100),
    ]
}

/// Random engagement for `count` notes with ids `1..=count`.
///
/// Counters are kept small and drawn from narrow ranges so ties are common.
pub fn random_population(count: u64, seed: u64) -> Vec<SeedNote> {
    let mut rng = StdRng::seed_from_u64(seed);
    (1..=count)
        .map(|note_id| {
            SeedNote::new(
                note_id,
                rng.random_range(0..4),
                rng.random_range(0..3),
                rng.random_range(0..2),
                rng.random_range(0..3) * 1_000,
            )
        })
        .collect()
}

/// Walk the whole feed following cursors, returning every page.
pub fn collect_pages(reader: &FeedReader, limit: usize) -> Vec<FeedPage> {
    let mut pages = Vec::new();
    let mut request = FeedRequest::first_page(limit);
    loop {
        let page = reader.get_feed(&request).expect("Failed to read feed page");
        let next = page.next_cursor.clone();
        pages.push(page);
        match next {
            Some(cursor) => request = FeedRequest::next_page(cursor, limit),
            None => return pages,
        }
    }
}

/// Flatten pages into the note sequence they served.
pub fn flatten(pages: &[FeedPage]) -> Vec<ScoredNote> {
    pages.iter().flat_map(|p| p.notes.iter().cloned()).collect()
}

/// Assert the sequence is ordered by (score DESC, id DESC) with no repeats.
pub fn assert_feed_order(notes: &[ScoredNote]) {
    let mut seen = HashSet::new();
    for note in notes {
        assert!(
            seen.insert(note.note_id()),
            "note {} served twice",
            note.note_id()
        );
    }
    for pair in notes.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let ordered = a.score > b.score || (a.score == b.score && a.note_id() > b.note_id());
        assert!(
            ordered,
            "out of order: ({}, {}) before ({}, {})",
            a.score,
            a.note_id(),
            b.score,
            b.note_id()
        );
    }
}
