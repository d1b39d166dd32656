//! Per-run input ranges.
//!
//! Ranges are derived from one population snapshot and discarded after the
//! run, so scores are relative to the population at that moment.

use hotfeed_types::NoteCounters;

use crate::normalize::normalize;

/// Observed `[min, max]` of one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionRange {
    pub min: i128,
    pub max: i128,
}

impl DimensionRange {
    /// Range containing exactly one value.
    pub fn point(value: i128) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Widen the range to include `value`.
    pub fn include(&mut self, value: i128) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Normalize `value` against this range.
    pub fn normalize(&self, value: i128) -> i64 {
        normalize(value, self.min, self.max)
    }
}

/// Ranges of all scored dimensions for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreInputRange {
    pub likes: DimensionRange,
    pub collects: DimensionRange,
    pub comments: DimensionRange,
    pub update_time: DimensionRange,
}

impl ScoreInputRange {
    /// Derive ranges from a snapshot. Returns `None` for an empty population.
    pub fn from_snapshot(notes: &[NoteCounters]) -> Option<Self> {
        let (first, rest) = notes.split_first()?;

        let mut ranges = Self {
            likes: DimensionRange::point(first.like_count.into()),
            collects: DimensionRange::point(first.collect_count.into()),
            comments: DimensionRange::point(first.comment_count.into()),
            update_time: DimensionRange::point(first.update_time.into()),
        };

        for note in rest {
            ranges.likes.include(note.like_count.into());
            ranges.collects.include(note.collect_count.into());
            ranges.comments.include(note.comment_count.into());
            ranges.update_time.include(note.update_time.into());
        }

        Some(ranges)
    }
}
