//! Storage layer for the hotfeed engine.
//!
//! Provides RocksDB-backed storage with:
//! - Column family isolation for counters, scores and the feed index
//! - Order-preserving feed keys so forward iteration is the ranked order
//! - Atomic per-note writes via WriteBatch
//! - Serialized read-modify-write for counter mutations
//! - Point-in-time snapshots for whole-population scans and feed pages

pub mod column_families;
pub mod db;
pub mod error;
pub mod keys;

pub use db::{Storage, StorageStats};
pub use error::StorageError;
pub use keys::{FeedKey, NoteKey, ScoreKey};
