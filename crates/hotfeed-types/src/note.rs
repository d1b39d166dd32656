//! Note engagement counters and scored notes.
//!
//! A note's counters are mutated by interaction handlers (likes, collects,
//! comments, views) and read in bulk by the hotness recomputation. The score
//! is derived and stored separately; it is never part of `NoteCounters`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FeedTypesError;

/// Opaque note identity.
pub type NoteId = u64;

/// Score assigned to a note at creation, before its first recomputation.
pub const DEFAULT_SCORE: f64 = 0.0;

/// Mutable engagement counter of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterField {
    Likes,
    Collects,
    Comments,
    Views,
}

impl CounterField {
    /// All counter fields, in storage order.
    pub const ALL: [CounterField; 4] = [
        CounterField::Likes,
        CounterField::Collects,
        CounterField::Comments,
        CounterField::Views,
    ];
}

impl fmt::Display for CounterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterField::Likes => write!(f, "likes"),
            CounterField::Collects => write!(f, "collects"),
            CounterField::Comments => write!(f, "comments"),
            CounterField::Views => write!(f, "views"),
        }
    }
}

impl FromStr for CounterField {
    type Err = FeedTypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "likes" | "like" => Ok(CounterField::Likes),
            "collects" | "collect" => Ok(CounterField::Collects),
            "comments" | "comment" => Ok(CounterField::Comments),
            "views" | "view" => Ok(CounterField::Views),
            other => Err(FeedTypesError::InvalidInput(format!(
                "unknown counter field '{}'",
                other
            ))),
        }
    }
}

/// Engagement counters of a single note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteCounters {
    /// Note identity
    pub note_id: NoteId,
    /// Number of likes
    #[serde(default)]
    pub like_count: u64,
    /// Number of collects (bookmarks)
    #[serde(default)]
    pub collect_count: u64,
    /// Number of comments
    #[serde(default)]
    pub comment_count: u64,
    /// Number of views (carried, not scored)
    #[serde(default)]
    pub view_count: u64,
    /// Last content edit, Unix milliseconds
    pub update_time: i64,
}

impl NoteCounters {
    /// Create counters for a freshly created note.
    pub fn new(note_id: NoteId, update_time: i64) -> Self {
        Self {
            note_id,
            like_count: 0,
            collect_count: 0,
            comment_count: 0,
            view_count: 0,
            update_time,
        }
    }

    /// Builder-style counter setup, mostly for tests and seeding.
    pub fn with_counts(mut self, likes: u64, collects: u64, comments: u64) -> Self {
        self.like_count = likes;
        self.collect_count = collects;
        self.comment_count = comments;
        self
    }

    /// Current value of a counter.
    pub fn get(&self, field: CounterField) -> u64 {
        match field {
            CounterField::Likes => self.like_count,
            CounterField::Collects => self.collect_count,
            CounterField::Comments => self.comment_count,
            CounterField::Views => self.view_count,
        }
    }

    /// Apply a signed delta to a counter.
    ///
    /// Returns the new value, or `None` if the result would leave the
    /// `u64` range. The counter is unchanged on `None`.
    pub fn apply_delta(&mut self, field: CounterField, delta: i64) -> Option<u64> {
        let current = self.get(field);
        let next = if delta >= 0 {
            current.checked_add(delta.unsigned_abs())?
        } else {
            current.checked_sub(delta.unsigned_abs())?
        };

        let slot = match field {
            CounterField::Likes => &mut self.like_count,
            CounterField::Collects => &mut self.collect_count,
            CounterField::Comments => &mut self.comment_count,
            CounterField::Views => &mut self.view_count,
        };
        *slot = next;
        Some(next)
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// A note's counters together with its last persisted hotness score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredNote {
    #[serde(flatten)]
    pub counters: NoteCounters,
    /// Hotness score from the most recent recomputation
    pub score: f64,
}

impl ScoredNote {
    pub fn new(counters: NoteCounters, score: f64) -> Self {
        Self { counters, score }
    }

    pub fn note_id(&self) -> NoteId {
        self.counters.note_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_note_has_zero_counters() {
        let counters = NoteCounters::new(100001, 1_706_540_400_000);
        for field in CounterField::ALL {
            assert_eq!(counters.get(field), 0);
        }
        assert_eq!(counters.update_time, 1_706_540_400_000);
    }

    #[test]
    fn test_apply_delta_increments_and_decrements() {
        let mut counters = NoteCounters::new(1, 0);
        assert_eq!(counters.apply_delta(CounterField::Likes, 3), Some(3));
        assert_eq!(counters.apply_delta(CounterField::Likes, -1), Some(2));
        assert_eq!(counters.like_count, 2);
        assert_eq!(counters.collect_count, 0);
    }

    #[test]
    fn test_apply_delta_rejects_underflow() {
        let mut counters = NoteCounters::new(1, 0).with_counts(0, 1, 0);
        assert_eq!(counters.apply_delta(CounterField::Likes, -1), None);
        assert_eq!(counters.apply_delta(CounterField::Collects, -2), None);
        assert_eq!(counters.collect_count, 1);
    }

    #[test]
    fn test_apply_delta_rejects_overflow() {
        let mut counters = NoteCounters::new(1, 0).with_counts(0, 0, 0);
        counters.view_count = u64::MAX - 1;
        assert_eq!(counters.apply_delta(CounterField::Views, 2), None);
        assert_eq!(counters.view_count, u64::MAX - 1);
        assert_eq!(counters.apply_delta(CounterField::Views, 1), Some(u64::MAX));
    }

    #[test]
    fn test_counter_field_parse() {
        assert_eq!("likes".parse::<CounterField>().unwrap(), CounterField::Likes);
        assert_eq!("Collect".parse::<CounterField>().unwrap(), CounterField::Collects);
        assert_eq!("views".parse::<CounterField>().unwrap(), CounterField::Views);
        assert!("shares".parse::<CounterField>().is_err());
    }

    #[test]
    fn test_counters_bytes_roundtrip() {
        let counters = NoteCounters::new(42, 1000).with_counts(10, 5, 2);
        let decoded = NoteCounters::from_bytes(&counters.to_bytes().unwrap()).unwrap();
        assert_eq!(counters, decoded);
    }

    #[test]
    fn test_scored_note_serializes_flat() {
        let note = ScoredNote::new(NoteCounters::new(7, 50), 12.5);
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["note_id"], 7);
        assert_eq!(json["score"], 12.5);
    }
}
