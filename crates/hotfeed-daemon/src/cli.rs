//! CLI argument parsing for the hotfeed daemon.
//!
//! CLI flags override all other config sources.

use clap::{Parser, Subcommand};

use hotfeed_types::{CounterField, NoteId};

/// hotfeed daemon
///
/// Engagement scoring and ranked-feed engine for notes.
#[derive(Parser, Debug)]
#[command(name = "hotfeed-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/hotfeed/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Daemon commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the daemon and the hotness recomputation job
    Start {
        /// Run in foreground (don't daemonize)
        #[arg(short, long)]
        foreground: bool,

        /// Override database path
        #[arg(long)]
        db_path: Option<String>,
    },

    /// Stop the running daemon
    Stop,

    /// Show daemon status
    Status,

    /// Print one page of the ranked feed as JSON
    Feed {
        /// Database path (default from config)
        #[arg(long)]
        db_path: Option<String>,

        /// Cursor returned by the previous page
        #[arg(long)]
        cursor: Option<String>,

        /// Page size (default and cap: feed.max_page_size)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Note administration
    Notes {
        /// Database path (default from config)
        #[arg(long)]
        db_path: Option<String>,

        #[command(subcommand)]
        command: NoteCommands,
    },

    /// Administrative commands
    Admin {
        /// Database path (default from config)
        #[arg(long)]
        db_path: Option<String>,

        #[command(subcommand)]
        command: AdminCommands,
    },
}

/// Note subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum NoteCommands {
    /// Create a note with zero counters
    Create {
        note_id: NoteId,

        /// Update time in Unix ms (default: now)
        #[arg(long)]
        update_time: Option<i64>,
    },

    /// Delete a note, its score and feed entry
    Delete { note_id: NoteId },

    /// Add a signed delta to a counter (likes, collects, comments, views)
    Incr {
        note_id: NoteId,

        field: CounterField,

        #[arg(default_value = "1", allow_negative_numbers = true)]
        delta: i64,
    },

    /// Record a content edit
    Touch {
        note_id: NoteId,

        /// Update time in Unix ms (default: now)
        #[arg(long)]
        update_time: Option<i64>,
    },

    /// Show counters and current score
    Show { note_id: NoteId },
}

/// Admin subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum AdminCommands {
    /// Show database statistics
    Stats,

    /// Recompute every score now
    Rescore,

    /// Trigger RocksDB compaction
    Compact,

    /// Print the effective configuration as TOML
    Config,
}
