//! Ranked feed reader.
//!
//! Pages are ordered by `(score DESC, note_id DESC)`. The cursor carries the
//! exact score bits and id of the last returned note; the next page starts
//! strictly after that pair, so ties are neither skipped nor repeated.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use hotfeed_storage::{FeedKey, Storage};
use hotfeed_types::{FeedSettings, NoteId, ScoredNote};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FeedError;

/// Position after the last note of a page.
///
/// Encoded as `{score_bits:016x}-{note_id}`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedCursor {
    pub score: f64,
    pub note_id: NoteId,
}

impl FeedCursor {
    pub fn new(score: f64, note_id: NoteId) -> Self {
        Self { score, note_id }
    }

    /// Cursor pointing just past `note`.
    pub fn after(note: &ScoredNote) -> Self {
        Self::new(note.score, note.note_id())
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }

    pub fn parse(s: &str) -> Result<Self, FeedError> {
        s.parse()
    }

    fn feed_key(&self) -> FeedKey {
        FeedKey::new(self.score, self.note_id)
    }
}

impl fmt::Display for FeedCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}-{}", self.score.to_bits(), self.note_id)
    }
}

impl FromStr for FeedCursor {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FeedError::InvalidCursor(s.to_string());

        let (bits, id) = s.split_once('-').ok_or_else(invalid)?;
        if bits.len() != 16 || !bits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let bits = u64::from_str_radix(bits, 16).map_err(|_| invalid())?;
        let note_id: NoteId = id.parse().map_err(|_| invalid())?;
        let score = f64::from_bits(bits);
        if !score.is_finite() {
            return Err(invalid());
        }

        Ok(Self { score, note_id })
    }
}

/// One feed query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedRequest {
    /// Cursor returned by the previous page, if any
    pub cursor: Option<String>,
    /// Requested page size, capped at the reader's maximum
    pub limit: usize,
}

impl FeedRequest {
    pub fn first_page(limit: usize) -> Self {
        Self {
            cursor: None,
            limit,
        }
    }

    pub fn next_page(cursor: impl Into<String>, limit: usize) -> Self {
        Self {
            cursor: Some(cursor.into()),
            limit,
        }
    }
}

/// One page of the ranked feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPage {
    pub notes: Vec<ScoredNote>,
    /// Present only when more notes follow this page
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Serves score-ordered pages from the persisted feed index.
pub struct FeedReader {
    storage: Arc<Storage>,
    max_page_size: usize,
}

impl FeedReader {
    pub fn new(storage: Arc<Storage>, max_page_size: usize) -> Self {
        Self {
            storage,
            max_page_size: max_page_size.max(1),
        }
    }

    pub fn from_settings(storage: Arc<Storage>, settings: &FeedSettings) -> Self {
        Self::new(storage, settings.max_page_size)
    }

    pub fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    /// Read one page.
    ///
    /// Rejects `limit == 0` and malformed cursors; caps larger limits at
    /// the maximum page size.
    pub fn get_feed(&self, request: &FeedRequest) -> Result<FeedPage, FeedError> {
        if request.limit == 0 {
            return Err(FeedError::InvalidLimit(request.limit));
        }
        let limit = request.limit.min(self.max_page_size);

        let after = request
            .cursor
            .as_deref()
            .map(FeedCursor::parse)
            .transpose()?;

        // One extra row tells whether another page exists
        let mut notes = self
            .storage
            .scan_feed(after.map(|c| c.feed_key()), limit + 1)?;
        let has_more = notes.len() > limit;
        notes.truncate(limit);

        let next_cursor = if has_more {
            notes.last().map(|note| FeedCursor::after(note).encode())
        } else {
            None
        };

        debug!(
            requested = request.limit,
            limit,
            returned = notes.len(),
            has_more,
            "Feed page served"
        );

        Ok(FeedPage {
            notes,
            next_cursor,
            has_more,
        })
    }
}
