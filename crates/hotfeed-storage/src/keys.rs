//! Key encoding and decoding for storage layer.
//!
//! Note and score keys: `{prefix}:{note_id:020}`, zero-padded so they sort
//! numerically.
//!
//! Feed keys: `feed:{desc_score:016x}:{desc_id:016x}`. Both components are
//! inverted so a forward RocksDB iteration yields score descending, then
//! note id descending.

use hotfeed_types::NoteId;

use crate::error::StorageError;

const SIGN_BIT: u64 = 1 << 63;

/// Map f64 bits onto u64 so that unsigned order equals numeric order.
fn ordered_bits(score: f64) -> u64 {
    let bits = score.to_bits();
    if bits & SIGN_BIT != 0 {
        !bits
    } else {
        bits ^ SIGN_BIT
    }
}

fn score_from_ordered(ordered: u64) -> f64 {
    let bits = if ordered & SIGN_BIT != 0 {
        ordered ^ SIGN_BIT
    } else {
        !ordered
    };
    f64::from_bits(bits)
}

/// Key for note counters
/// Format: note:{note_id:020}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteKey {
    pub note_id: NoteId,
}

impl NoteKey {
    pub fn new(note_id: NoteId) -> Self {
        Self { note_id }
    }

    /// Encode key to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("note:{:020}", self.note_id).into_bytes()
    }

    /// Decode key from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))?;

        let id = s
            .strip_prefix("note:")
            .ok_or_else(|| StorageError::Key(format!("Invalid note key format: {}", s)))?;
        let note_id: NoteId = id
            .parse()
            .map_err(|e| StorageError::Key(format!("Invalid note id: {}", e)))?;

        Ok(Self { note_id })
    }
}

/// Key for persisted scores
/// Format: score:{note_id:020}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreKey {
    pub note_id: NoteId,
}

impl ScoreKey {
    pub fn new(note_id: NoteId) -> Self {
        Self { note_id }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        format!("score:{:020}", self.note_id).into_bytes()
    }
}

/// Encode a score value for the scores column family.
pub fn encode_score(score: f64) -> [u8; 8] {
    score.to_be_bytes()
}

/// Decode a score value written by [`encode_score`].
pub fn decode_score(bytes: &[u8]) -> Result<f64, StorageError> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StorageError::Serialization(format!("score is {} bytes", bytes.len())))?;
    Ok(f64::from_be_bytes(raw))
}

/// Key for the ranked feed index.
/// Format: feed:{desc_score:016x}:{desc_id:016x}
///
/// Lexicographic byte order of encoded keys is `(score DESC, note_id DESC)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedKey {
    pub score: f64,
    pub note_id: NoteId,
}

impl FeedKey {
    pub fn new(score: f64, note_id: NoteId) -> Self {
        Self { score, note_id }
    }

    /// Encode key to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let desc_score = !ordered_bits(self.score);
        let desc_id = !self.note_id;
        format!("feed:{:016x}:{:016x}", desc_score, desc_id).into_bytes()
    }

    /// Decode key from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))?;

        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 || parts[0] != "feed" {
            return Err(StorageError::Key(format!("Invalid feed key format: {}", s)));
        }

        let desc_score = u64::from_str_radix(parts[1], 16)
            .map_err(|e| StorageError::Key(format!("Invalid feed score: {}", e)))?;
        let desc_id = u64::from_str_radix(parts[2], 16)
            .map_err(|e| StorageError::Key(format!("Invalid feed note id: {}", e)))?;

        Ok(Self {
            score: score_from_ordered(!desc_score),
            note_id: !desc_id,
        })
    }

    /// Prefix shared by every feed key
    pub fn prefix() -> &'static [u8] {
        b"feed:"
    }
}
