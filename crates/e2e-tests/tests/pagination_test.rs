//! Feed pagination E2E tests.
//!
//! Walking every page of the feed must serve each note exactly once in
//! (score DESC, id DESC) order, including when scores tie.

use pretty_assertions::assert_eq;

use e2e_tests::{
    assert_feed_order, collect_pages, flatten, random_population, seed_notes, tie_population,
    TestHarness,
};
use hotfeed_ranking::{FeedError, FeedRequest};
use hotfeed_types::NoteId;

fn ids(notes: &[hotfeed_types::ScoredNote]) -> Vec<NoteId> {
    notes.iter().map(|n| n.note_id()).collect()
}

/// A and C tie at the top; paging one at a time still serves both once.
#[test]
fn test_tied_notes_limit_one() {
    let harness = TestHarness::new();
    seed_notes(&harness.storage, &tie_population());
    harness.recomputer().run().unwrap();

    let pages = collect_pages(&harness.reader(30), 1);
    assert_eq!(pages.len(), 3);
    assert!(pages[0].has_more);
    assert!(pages[1].has_more);
    assert!(!pages[2].has_more);
    assert!(pages[2].next_cursor.is_none());

    let notes = flatten(&pages);
    assert_eq!(ids(&notes), vec![3, 1, 2]);
    assert_eq!(notes[0].score, notes[1].score);
    assert_eq!(notes[0].score, 80.0);
    assert_eq!(notes[2].score, 0.0);
}

#[test]
fn test_random_population_every_limit() {
    let harness = TestHarness::new();
    let population = random_population(40, 7);
    seed_notes(&harness.storage, &population);
    harness.recomputer().run().unwrap();

    let reader = harness.reader(30);
    let mut reference: Option<Vec<NoteId>> = None;
    for limit in [1, 2, 3, 7, 30, 100] {
        let notes = flatten(&collect_pages(&reader, limit));
        assert_eq!(notes.len(), population.len(), "limit {}", limit);
        assert_feed_order(&notes);

        let served = ids(&notes);
        match &reference {
            Some(expected) => assert_eq!(&served, expected, "limit {}", limit),
            None => reference = Some(served),
        }
    }
}

/// Before any run every note sits at the default score, ordered by id.
#[test]
fn test_feed_before_first_run() {
    let harness = TestHarness::new();
    seed_notes(&harness.storage, &tie_population());

    let notes = flatten(&collect_pages(&harness.reader(30), 2));
    assert_eq!(ids(&notes), vec![3, 2, 1]);
    assert!(notes.iter().all(|n| n.score == 0.0));
}

#[test]
fn test_empty_feed() {
    let harness = TestHarness::new();
    let page = harness
        .reader(30)
        .get_feed(&FeedRequest::first_page(10))
        .unwrap();
    assert!(page.notes.is_empty());
    assert!(!page.has_more);
    assert!(page.next_cursor.is_none());
}

/// The cursor marks a (score, id) position, not a frozen snapshot. After a
/// rescore between pages, reading resumes below that position against the
/// new scores, so a note already served can appear again on a later page
/// and a note that rose above the cursor is not served at all.
#[test]
fn test_cursor_resumes_by_position_after_rescore() {
    let harness = TestHarness::new();
    seed_notes(&harness.storage, &tie_population());
    harness.recomputer().run().unwrap();

    let reader = harness.reader(30);
    let first = reader.get_feed(&FeedRequest::first_page(1)).unwrap();
    assert_eq!(ids(&first.notes), vec![3]);

    for _ in 0..20 {
        harness.storage.like(2).unwrap();
    }
    harness.recomputer().run().unwrap();

    // A and C dropped to 50, B rose to 30; all now sit below (80, 3).
    // Note 3 was on the first page and is served again here.
    let cursor = first.next_cursor.unwrap();
    let rest = reader.get_feed(&FeedRequest::next_page(cursor, 30)).unwrap();
    assert_eq!(ids(&rest.notes), vec![3, 1, 2]);
    assert_eq!(rest.notes[0].score, 50.0);
    assert_eq!(rest.notes[2].score, 30.0);
    assert!(!rest.has_more);
}

#[test]
fn test_limit_capped_at_max_page_size() {
    let harness = TestHarness::new();
    seed_notes(&harness.storage, &random_population(10, 1));
    harness.recomputer().run().unwrap();

    let page = harness
        .reader(4)
        .get_feed(&FeedRequest::first_page(1_000))
        .unwrap();
    assert_eq!(page.notes.len(), 4);
    assert!(page.has_more);
}

#[test]
fn test_bad_requests_are_client_errors() {
    let harness = TestHarness::new();
    seed_notes(&harness.storage, &tie_population());
    let reader = harness.reader(30);

    for cursor in ["", "80", "not-a-cursor", "4054000000000000-x", "7ff0000000000000-1"] {
        let err = reader
            .get_feed(&FeedRequest::next_page(cursor, 5))
            .unwrap_err();
        assert!(
            matches!(err, FeedError::InvalidCursor(_)),
            "cursor {:?} gave {:?}",
            cursor,
            err
        );
        assert!(err.is_client_error());
    }

    let err = reader.get_feed(&FeedRequest::first_page(0)).unwrap_err();
    assert!(matches!(err, FeedError::InvalidLimit(0)));
    assert!(err.is_client_error());
}
