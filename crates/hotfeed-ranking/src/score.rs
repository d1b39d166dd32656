//! Hotness score calculation.
//!
//! ```text
//! score = 0.4 * collects + 0.3 * likes + 0.2 * comments + 0.1 * recency
//! ```
//!
//! Each component is normalized to 0..=100 against the run's
//! [`ScoreInputRange`]. Recency is the normalized `update_time`, i.e. the
//! note's position within the population's time span. `view_count` does
//! not contribute.

use hotfeed_types::NoteCounters;
use serde::{Deserialize, Serialize};

use crate::range::ScoreInputRange;

pub const COLLECT_WEIGHT: f64 = 0.4;
pub const LIKE_WEIGHT: f64 = 0.3;
pub const COMMENT_WEIGHT: f64 = 0.2;
pub const RECENCY_WEIGHT: f64 = 0.1;

/// Normalized inputs of one note's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub likes: i64,
    pub collects: i64,
    pub comments: i64,
    pub recency: i64,
}

impl ScoreComponents {
    /// Normalize a note's counters against the run's ranges.
    pub fn from_counters(counters: &NoteCounters, ranges: &ScoreInputRange) -> Self {
        Self {
            likes: ranges.likes.normalize(counters.like_count.into()),
            collects: ranges.collects.normalize(counters.collect_count.into()),
            comments: ranges.comments.normalize(counters.comment_count.into()),
            recency: ranges.update_time.normalize(counters.update_time.into()),
        }
    }

    /// Weighted sum of the components. Not clamped.
    pub fn weighted_sum(&self) -> f64 {
        COLLECT_WEIGHT * self.collects as f64
            + LIKE_WEIGHT * self.likes as f64
            + COMMENT_WEIGHT * self.comments as f64
            + RECENCY_WEIGHT * self.recency as f64
    }
}

/// Hotness score of one note for the given run ranges.
pub fn calculate_score(counters: &NoteCounters, ranges: &ScoreInputRange) -> f64 {
    ScoreComponents::from_counters(counters, ranges).weighted_sum()
}
