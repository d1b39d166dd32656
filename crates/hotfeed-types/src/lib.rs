//! # hotfeed-types
//!
//! Shared domain types for the hotfeed ranking engine.
//!
//! - Notes: per-note engagement counters and the derived hotness score
//! - Settings: layered daemon configuration
//! - Errors: configuration and serialization failures shared across crates

pub mod config;
pub mod error;
pub mod note;

pub use config::{FeedSettings, HotnessSettings, Settings};
pub use error::FeedTypesError;
pub use note::{CounterField, NoteCounters, NoteId, ScoredNote, DEFAULT_SCORE};
