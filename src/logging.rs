//! Structured JSONL logging plus human-readable stderr output.
//!
//! This module provides dual-output logging:
//! - **JSONL to file** (~/.app-menu/logs/app-menu.jsonl) - structured, one event per line
//! - **Pretty to stderr** - human-readable for developers
//!
//! # Usage
//!
//! ```rust,ignore
//! use app_menu::logging;
//!
//! // Initialize logging - MUST keep guard alive for duration of program
//! let _guard = logging::init();
//!
//! tracing::info!(event_type = "app_lifecycle", "Menu bar item created");
//! ```
//!
//! # JSONL Output Format
//!
//! ```json
//! {"timestamp":"2024-12-25T10:30:45.123Z","level":"INFO","target":"app_menu::scanner","fields":{"message":"Scan complete","app_count":84,"duration_ms":12}}
//! ```

use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::OnceLock;

use parking_lot::Mutex;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::preferences::app_home_dir;

/// In-memory tail shown in the About dialog
static LOG_BUFFER: OnceLock<Mutex<VecDeque<String>>> = OnceLock::new();
const MAX_LOG_LINES: usize = 50;

const LOG_FILE_NAME: &str = "app-menu.jsonl";

/// UTC, millisecond precision, e.g. `2024-12-25T10:30:45.123Z`
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");

/// Guard that must be kept alive for the duration of the program.
/// Dropping this guard will flush and close the log file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initialize the dual-output logging system.
///
/// Returns a guard that MUST be kept alive for the duration of the program.
pub fn init() -> LoggingGuard {
    let _ = LOG_BUFFER.set(Mutex::new(VecDeque::with_capacity(MAX_LOG_LINES)));

    let log_dir = log_dir();
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("[LOGGING] Failed to create log directory: {}", e);
    }

    let log_path = log_path();

    // Fall back to a sink so a read-only home never prevents startup
    let (non_blocking_file, file_guard) =
        match OpenOptions::new().create(true).append(true).open(&log_path) {
            Ok(file) => tracing_appender::non_blocking(file),
            Err(e) => {
                eprintln!("[LOGGING] Failed to open log file: {}", e);
                tracing_appender::non_blocking(std::io::sink())
            }
        };

    // Default to info, allow override via RUST_LOG
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tao=warn,tray_icon=warn,notify=warn"));

    let json_layer = fmt::layer()
        .json()
        .with_writer(non_blocking_file)
        .with_timer(fmt::time::UtcTime::new(TIMESTAMP_FORMAT))
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE);

    let pretty_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .compact();

    // try_init: the CLI may call init() after a test harness installed a subscriber
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(pretty_layer)
        .try_init();

    tracing::info!(
        event_type = "app_lifecycle",
        action = "started",
        log_path = %log_path.display(),
        "Application logging initialized"
    );

    LoggingGuard {
        _file_guard: file_guard,
    }
}

fn log_dir() -> PathBuf {
    app_home_dir().join("logs")
}

/// Path to the JSONL log file
pub fn log_path() -> PathBuf {
    log_dir().join(LOG_FILE_NAME)
}

fn add_to_buffer(category: &str, message: &str) {
    let buffer = LOG_BUFFER.get_or_init(|| Mutex::new(VecDeque::with_capacity(MAX_LOG_LINES)));
    let mut buf = buffer.lock();
    if buf.len() >= MAX_LOG_LINES {
        buf.pop_front();
    }
    buf.push_back(format!("[{}] {}", category, message));
}

/// Recent log lines, oldest first
pub fn recent_lines() -> Vec<String> {
    LOG_BUFFER
        .get()
        .map(|buffer| buffer.lock().iter().cloned().collect())
        .unwrap_or_default()
}

/// Record a finished scan.
pub fn log_scan_complete(
    primary_count: usize,
    web_app_count: usize,
    skipped_directories: usize,
    duration_ms: u64,
) {
    add_to_buffer(
        "SCAN",
        &format!(
            "{} apps, {} web apps, {} directories skipped ({}ms)",
            primary_count, web_app_count, skipped_directories, duration_ms
        ),
    );

    tracing::info!(
        event_type = "scan_complete",
        app_count = primary_count,
        web_app_count = web_app_count,
        skipped_directories = skipped_directories,
        duration_ms = duration_ms,
        "Application scan complete"
    );
}

/// Record a menu interaction (launch, refresh, settings, ...)
pub fn log_menu_event(action: &str, details: Option<&str>) {
    let msg = match details {
        Some(d) => format!("{} - {}", action, d),
        None => action.to_string(),
    };
    add_to_buffer("MENU", &msg);

    tracing::info!(
        event_type = "menu_event",
        action = action,
        details = details,
        "{}",
        msg
    );
}

/// Log a performance metric with structured fields
pub fn log_perf(operation: &str, duration_ms: u64, threshold_ms: u64) {
    if duration_ms > threshold_ms {
        add_to_buffer("PERF", &format!("{} {}ms [SLOW]", operation, duration_ms));
        tracing::warn!(
            event_type = "performance",
            operation = operation,
            duration_ms = duration_ms,
            threshold_ms = threshold_ms,
            is_slow = true,
            "Slow operation: {} took {}ms (threshold: {}ms)",
            operation,
            duration_ms,
            threshold_ms
        );
    } else {
        tracing::debug!(
            event_type = "performance",
            operation = operation,
            duration_ms = duration_ms,
            threshold_ms = threshold_ms,
            is_slow = false,
            "Operation {} completed in {}ms",
            operation,
            duration_ms
        );
    }
}
