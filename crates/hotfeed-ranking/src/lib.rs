//! # hotfeed-ranking
//!
//! Engagement scoring and ranked-feed pagination.
//!
//! ## Components
//!
//! - [`normalize`]: maps a raw value into 0..=100 relative to an observed range
//! - [`ScoreInputRange`]: per-run min/max of every scored dimension
//! - [`calculate_score`]: weighted hotness score of one note
//! - [`HotnessRecomputer`]: snapshot, range, score and persist the whole population
//! - [`FeedReader`]: score-ordered pages with an opaque `(score, id)` cursor
//!
//! Storage is reached through the [`NoteSource`] and [`ScoreSink`] traits,
//! both implemented for `hotfeed_storage::Storage`.

pub mod error;
pub mod feed;
pub mod normalize;
pub mod range;
pub mod recompute;
pub mod score;
pub mod source;

pub use error::{FeedError, RankingError};
pub use feed::{FeedCursor, FeedPage, FeedReader, FeedRequest};
pub use normalize::{normalize, NORMALIZED_MAX};
pub use range::{DimensionRange, ScoreInputRange};
pub use recompute::{HotnessRecomputer, RecomputeReport, RunPhase};
pub use score::{calculate_score, ScoreComponents};
pub use source::{NoteSource, PersistOutcome, ScoreSink};
