//! Storage layer error types.

use hotfeed_types::{CounterField, NoteId};
use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// RocksDB operation failed
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Column family not found
    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(String),

    /// Key encoding/decoding error
    #[error("Key error: {0}")]
    Key(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Note not found
    #[error("Note not found: {0}")]
    NotFound(NoteId),

    /// Note id already taken
    #[error("Note already exists: {0}")]
    AlreadyExists(NoteId),

    /// Decrement would take a counter below zero
    #[error("Counter underflow on note {note_id}: {field} {current} {delta:+}")]
    CounterUnderflow {
        note_id: NoteId,
        field: CounterField,
        current: u64,
        delta: i64,
    },

    /// Increment would overflow a counter
    #[error("Counter overflow on note {note_id}: {field} {current} {delta:+}")]
    CounterOverflow {
        note_id: NoteId,
        field: CounterField,
        current: u64,
        delta: i64,
    },

    /// A writer panicked while holding the write lock
    #[error("Storage write lock poisoned")]
    LockPoisoned,
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underflow_display() {
        let err = StorageError::CounterUnderflow {
            note_id: 7,
            field: CounterField::Likes,
            current: 0,
            delta: -1,
        };
        assert_eq!(err.to_string(), "Counter underflow on note 7: likes 0 -1");
    }
}
