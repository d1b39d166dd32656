//! hotfeed daemon
//!
//! Recomputes note hotness scores on a schedule and serves the ranked feed.
//!
//! # Usage
//!
//! ```bash
//! hotfeed-daemon start [--foreground] [--db-path PATH]
//! hotfeed-daemon stop
//! hotfeed-daemon status
//! hotfeed-daemon feed [--cursor C] [--limit N]
//! hotfeed-daemon notes <create|delete|incr|touch|show> ...
//! hotfeed-daemon admin <stats|rescore|compact|config>
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/hotfeed/config.toml)
//! 3. `--config` file
//! 4. Environment variables (HOTFEED_*)
//! 5. CLI flags

use anyhow::Result;
use clap::Parser;

use hotfeed_daemon::{
    handle_admin, handle_feed, handle_notes, show_status, start_daemon, stop_daemon, Cli,
    Commands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Start {
            foreground,
            db_path,
        } => {
            start_daemon(
                config,
                foreground,
                db_path.as_deref(),
                cli.log_level.as_deref(),
            )
            .await?;
        }
        Commands::Stop => {
            stop_daemon()?;
        }
        Commands::Status => {
            show_status()?;
        }
        Commands::Feed {
            db_path,
            cursor,
            limit,
        } => {
            handle_feed(config, db_path.as_deref(), cursor, limit)?;
        }
        Commands::Notes { db_path, command } => {
            handle_notes(config, db_path.as_deref(), command)?;
        }
        Commands::Admin { db_path, command } => {
            handle_admin(config, db_path.as_deref(), command)?;
        }
    }

    Ok(())
}
