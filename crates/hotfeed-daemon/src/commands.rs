//! Command implementations for the hotfeed daemon.
//!
//! Handles:
//! - start: Load config, open storage, run the hotness job until signalled
//! - stop/status: PID file based process control
//! - feed: Read one page of the ranked feed
//! - notes: Create, delete, mutate and inspect notes
//! - admin: Stats, immediate rescore, compaction, effective config

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tokio::signal;
use tracing::{info, warn};

use hotfeed_ranking::{FeedPage, FeedReader, FeedRequest, HotnessRecomputer};
use hotfeed_scheduler::{create_hotness_job, HotnessJobConfig, SchedulerConfig, SchedulerService};
use hotfeed_storage::Storage;
use hotfeed_types::Settings;

use crate::cli::{AdminCommands, NoteCommands};

/// Get the PID file path
fn pid_file_path() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| {
            #[cfg(unix)]
            {
                dirs.runtime_dir()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| dirs.cache_dir().to_path_buf())
            }
            #[cfg(not(unix))]
            {
                dirs.cache_dir().to_path_buf()
            }
        })
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("hotfeed")
        .join("daemon.pid")
}

fn write_pid_file() -> Result<()> {
    let pid_path = pid_file_path();
    if let Some(parent) = pid_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&pid_path, std::process::id().to_string())?;
    info!("Wrote PID file: {:?}", pid_path);
    Ok(())
}

fn remove_pid_file() {
    let pid_path = pid_file_path();
    if pid_path.exists() {
        if let Err(e) = fs::remove_file(&pid_path) {
            warn!("Failed to remove PID file: {}", e);
        } else {
            info!("Removed PID file");
        }
    }
}

fn read_pid_file() -> Option<u32> {
    fs::read_to_string(pid_file_path())
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

#[cfg(unix)]
fn is_process_running(pid: u32) -> bool {
    // Signal 0 only checks that the process exists
    unsafe { libc::kill(pid as i32, 0) == 0 }
}

#[cfg(not(unix))]
fn is_process_running(_pid: u32) -> bool {
    true
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Load settings and apply CLI overrides (highest precedence).
fn load_settings(
    config_path: Option<&str>,
    db_path_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(db_path) = db_path_override {
        settings.db_path = db_path.to_string();
    }
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    Ok(settings)
}

fn open_storage(settings: &Settings) -> Result<Arc<Storage>> {
    let db_path = settings.expanded_db_path();
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    let storage = Storage::open(&db_path)
        .with_context(|| format!("Failed to open storage at {:?}", db_path))?;
    Ok(Arc::new(storage))
}

fn init_tracing(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?;
        tokio::select! {
            result = signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl+C")?;
                info!("Received Ctrl+C, shutting down...");
            }
            _ = terminate.recv() => {
                info!("Received SIGTERM, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")?;
        info!("Received Ctrl+C, shutting down...");
    }

    Ok(())
}

/// Start the daemon.
///
/// 1. Load configuration (defaults -> file -> env -> CLI)
/// 2. Open RocksDB storage
/// 3. Register and start the hotness job
/// 4. Wait for SIGINT/SIGTERM, then shut the scheduler down
pub async fn start_daemon(
    config_path: Option<&str>,
    foreground: bool,
    db_path_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<()> {
    let settings = load_settings(config_path, db_path_override, log_level_override)?;
    init_tracing(&settings.log_level)?;

    info!("hotfeed daemon starting...");
    info!("  Database path: {}", settings.db_path);
    info!("  Hotness cron: {} ({})", settings.hotness.cron, settings.hotness.timezone);
    info!("  Max page size: {}", settings.feed.max_page_size);

    if !foreground {
        warn!("Background mode not implemented, running in foreground");
        warn!("Use a process manager (systemd, launchd) for background operation");
    }

    let storage = open_storage(&settings)?;
    let recomputer = Arc::new(HotnessRecomputer::for_storage(storage.clone()));

    let mut scheduler =
        SchedulerService::new(SchedulerConfig::with_timezone(&settings.hotness.timezone))
            .await
            .context("Failed to create scheduler")?;
    create_hotness_job(
        &scheduler,
        recomputer,
        HotnessJobConfig::from(&settings.hotness),
    )
    .await
    .context("Failed to register hotness job")?;
    scheduler.start().await.context("Failed to start scheduler")?;

    write_pid_file()?;

    let result = wait_for_shutdown_signal().await;

    if let Err(e) = scheduler.shutdown().await {
        warn!("Scheduler shutdown error: {}", e);
    }
    if let Err(e) = storage.flush() {
        warn!("Failed to flush storage: {}", e);
    }
    remove_pid_file();

    result
}

/// Stop the running daemon by sending SIGTERM.
pub fn stop_daemon() -> Result<()> {
    let pid = read_pid_file().context("No PID file found - daemon may not be running")?;

    if !is_process_running(pid) {
        remove_pid_file();
        anyhow::bail!("Daemon not running (stale PID file removed)");
    }

    #[cfg(unix)]
    {
        unsafe {
            if libc::kill(pid as i32, libc::SIGTERM) != 0 {
                anyhow::bail!("Failed to send SIGTERM to daemon");
            }
        }
        println!("Sent SIGTERM to daemon (PID {})", pid);
    }

    #[cfg(not(unix))]
    {
        anyhow::bail!("Stop command not implemented on this platform");
    }

    Ok(())
}

/// Show daemon status.
pub fn show_status() -> Result<()> {
    let pid_path = pid_file_path();

    match read_pid_file() {
        Some(pid) if is_process_running(pid) => {
            println!("hotfeed daemon is running (PID {})", pid);
            println!("PID file: {:?}", pid_path);
        }
        Some(pid) => {
            println!(
                "hotfeed daemon is NOT running (stale PID {} in {:?})",
                pid, pid_path
            );
        }
        None => {
            println!("hotfeed daemon is NOT running (no PID file)");
        }
    }
    Ok(())
}

/// Read one feed page. A missing limit means the configured maximum.
pub fn read_feed_page(
    storage: Arc<Storage>,
    settings: &Settings,
    cursor: Option<String>,
    limit: Option<usize>,
) -> Result<FeedPage> {
    let reader = FeedReader::from_settings(storage, &settings.feed);
    let request = FeedRequest {
        cursor,
        limit: limit.unwrap_or(reader.max_page_size()),
    };
    let page = reader.get_feed(&request).map_err(|e| {
        if e.is_client_error() {
            anyhow::anyhow!("Bad feed request: {}", e)
        } else {
            anyhow::Error::new(e).context("Failed to read feed")
        }
    })?;
    Ok(page)
}

pub fn handle_feed(
    config_path: Option<&str>,
    db_path: Option<&str>,
    cursor: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let settings = load_settings(config_path, db_path, None)?;
    let storage = open_storage(&settings)?;
    let page = read_feed_page(storage, &settings, cursor, limit)?;
    println!("{}", serde_json::to_string_pretty(&page)?);
    Ok(())
}

/// Apply one note command and describe the result as JSON.
pub fn run_note_command(storage: &Storage, command: NoteCommands) -> Result<Value> {
    let output = match command {
        NoteCommands::Create {
            note_id,
            update_time,
        } => {
            let counters = storage
                .create_note(note_id, update_time.unwrap_or_else(now_ms))
                .with_context(|| format!("Failed to create note {}", note_id))?;
            json!({ "created": counters })
        }
        NoteCommands::Delete { note_id } => {
            let deleted = storage
                .delete_note(note_id)
                .with_context(|| format!("Failed to delete note {}", note_id))?;
            json!({ "note_id": note_id, "deleted": deleted })
        }
        NoteCommands::Incr {
            note_id,
            field,
            delta,
        } => {
            let value = storage
                .increment(note_id, field, delta)
                .with_context(|| format!("Failed to update {} of note {}", field, note_id))?;
            json!({ "note_id": note_id, "field": field, "value": value })
        }
        NoteCommands::Touch {
            note_id,
            update_time,
        } => {
            let counters = storage
                .touch_note(note_id, update_time.unwrap_or_else(now_ms))
                .with_context(|| format!("Failed to touch note {}", note_id))?;
            json!({ "touched": counters })
        }
        NoteCommands::Show { note_id } => {
            let note = storage
                .get_note(note_id)?
                .with_context(|| format!("Note {} not found", note_id))?;
            serde_json::to_value(note)?
        }
    };
    Ok(output)
}

pub fn handle_notes(
    config_path: Option<&str>,
    db_path: Option<&str>,
    command: NoteCommands,
) -> Result<()> {
    let settings = load_settings(config_path, db_path, None)?;
    let storage = open_storage(&settings)?;
    let output = run_note_command(&storage, command)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub fn handle_admin(
    config_path: Option<&str>,
    db_path: Option<&str>,
    command: AdminCommands,
) -> Result<()> {
    let settings = load_settings(config_path, db_path, None)?;

    match command {
        AdminCommands::Config => {
            println!(
                "{}",
                toml::to_string_pretty(&settings).context("Failed to render configuration")?
            );
        }
        AdminCommands::Stats => {
            let storage = open_storage(&settings)?;
            let stats = storage.get_stats()?;
            println!("Database: {}", settings.db_path);
            println!("  Notes:        {}", stats.note_count);
            println!("  Feed entries: {}", stats.feed_entry_count);
            println!("  Disk usage:   {} bytes", stats.disk_usage_bytes);
        }
        AdminCommands::Rescore => {
            let storage = open_storage(&settings)?;
            let report = HotnessRecomputer::for_storage(storage)
                .run()
                .context("Recomputation failed")?;
            println!(
                "Rescored {} of {} notes in {} ms ({} failed, {} deleted during run)",
                report.persisted,
                report.scanned,
                report.duration.as_millis(),
                report.failed,
                report.skipped_missing
            );
        }
        AdminCommands::Compact => {
            let storage = open_storage(&settings)?;
            storage.compact()?;
            println!("Compaction complete");
        }
    }
    Ok(())
}
