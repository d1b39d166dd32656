//! Column family definitions for RocksDB.
//!
//! - notes: per-note engagement counters (point reads, full scans)
//! - scores: last persisted hotness score per note
//! - feed: ranked index, key-only, ordered by score desc then id desc

use rocksdb::{ColumnFamilyDescriptor, Options};

/// Column family name for note counters
pub const CF_NOTES: &str = "notes";

/// Column family name for persisted scores
pub const CF_SCORES: &str = "scores";

/// Column family name for the ranked feed index
pub const CF_FEED: &str = "feed";

/// All column family names
pub const ALL_CF_NAMES: &[&str] = &[CF_NOTES, CF_SCORES, CF_FEED];

fn notes_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
    opts
}

/// Build all column family descriptors
pub fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_NOTES, notes_options()),
        ColumnFamilyDescriptor::new(CF_SCORES, Options::default()),
        ColumnFamilyDescriptor::new(CF_FEED, Options::default()),
    ]
}
