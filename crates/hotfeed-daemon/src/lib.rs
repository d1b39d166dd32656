//! hotfeed daemon library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (start, stop, status, feed, notes, admin)

pub mod cli;
pub mod commands;

pub use cli::{AdminCommands, Cli, Commands, NoteCommands};
pub use commands::{
    handle_admin, handle_feed, handle_notes, show_status, start_daemon, stop_daemon,
};
