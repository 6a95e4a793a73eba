//! Tracing setup and log file retention.
//!
//! Stderr always gets human-readable output. Commands that run a task also
//! write JSON lines to `.tether/logs/<task-slug>/<timestamp>.log` under the
//! working directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tether_core::PROJECT_DIR;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Maximum age of log files before cleanup, in days.
const LOG_RETENTION_DAYS: u64 = 3;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "warn";

/// Initialize the global subscriber.
///
/// With a `slug`, a JSON file layer writing under `working_dir` is added.
/// The returned [`WorkerGuard`] must live until exit so buffered lines
/// are flushed.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or the
/// log file cannot be opened.
pub fn init_tracing(working_dir: &Path, slug: Option<&str>) -> Result<Option<WorkerGuard>> {
    let guard = build_tracing(working_dir, slug)?;

    if let Some((subscriber, guard)) = guard {
        subscriber.init();
        Ok(Some(guard))
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter())
            .init();
        Ok(None)
    }
}

/// Stderr plus JSON file layers, or `None` without a slug.
fn build_tracing(
    working_dir: &Path,
    slug: Option<&str>,
) -> Result<Option<(impl tracing::Subscriber + Send + Sync, WorkerGuard)>> {
    let Some(slug) = slug else {
        return Ok(None);
    };

    let (non_blocking, guard) = open_log_writer(working_dir, slug)?;

    let subscriber = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env_filter()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(env_filter()),
        );

    Ok(Some((subscriber, guard)))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Create `.tether/logs/<slug>/<YYYYMMDD_HHMMSS>.log` and wrap it in a
/// non-blocking writer.
fn open_log_writer(
    working_dir: &Path,
    slug: &str,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let log_path = build_log_path(working_dir, slug);

    let log_dir = log_path.parent().context(format!(
        "failed to resolve parent directory for log path: {}",
        log_path.display(),
    ))?;

    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory: {}", log_dir.display()))?;

    let log_file = fs::File::create(&log_path)
        .with_context(|| format!("failed to create log file: {}", log_path.display()))?;

    Ok(tracing_appender::non_blocking(log_file))
}

/// Delete task logs older than [`LOG_RETENTION_DAYS`], then any task
/// directory left empty. Only `logs/<slug>/*.log` is touched.
///
/// Best-effort: failures go to stderr since tracing is not set up yet.
pub fn cleanup_old_logs(working_dir: &Path) {
    let Ok(task_dirs) = fs::read_dir(logs_dir(working_dir)) else {
        return;
    };
    let cutoff = SystemTime::now() - Duration::from_secs(LOG_RETENTION_DAYS * SECS_PER_DAY);

    for task_dir in task_dirs.flatten().map(|e| e.path()).filter(|p| p.is_dir()) {
        if let Err(e) = prune_task_dir(&task_dir, cutoff) {
            eprintln!("warning: failed to clean logs in {}: {e}", task_dir.display());
        }
    }
}

/// Remove stale `.log` files from one task directory, and the directory
/// itself once nothing is left in it.
fn prune_task_dir(task_dir: &Path, cutoff: SystemTime) -> std::io::Result<()> {
    let mut remaining = 0;
    for entry in fs::read_dir(task_dir)? {
        let path = entry?.path();
        let is_log = path.extension().is_some_and(|ext| ext == "log");
        let stale = is_log && fs::metadata(&path)?.modified()? < cutoff;
        if stale {
            fs::remove_file(&path)?;
        } else {
            remaining += 1;
        }
    }
    if remaining == 0 {
        fs::remove_dir(task_dir)?;
    }
    Ok(())
}

fn logs_dir(working_dir: &Path) -> PathBuf {
    working_dir.join(PROJECT_DIR).join("logs")
}

fn build_log_path(working_dir: &Path, slug: &str) -> PathBuf {
    logs_dir(working_dir)
        .join(slug)
        .join(format!("{}.log", format_utc_timestamp(SystemTime::now())))
}

/// `YYYYMMDD_HHMMSS` in UTC.
fn format_utc_timestamp(time: SystemTime) -> String {
    let secs = time.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    let (year, month, day) = days_to_date(secs / SECS_PER_DAY);
    let clock = secs % SECS_PER_DAY;
    format!(
        "{year:04}{month:02}{day:02}_{:02}{:02}{:02}",
        clock / 3600,
        clock % 3600 / 60,
        clock % 60
    )
}

/// Civil date of a day count since 1970-01-01 (Hinnant's `civil_from_days`).
fn days_to_date(days: u64) -> (u64, u64, u64) {
    let shifted = days + 719_468;
    let era = shifted / 146_097;
    let day_of_era = shifted % 146_097;
    let year_of_era =
        (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let month_index = (5 * day_of_year + 2) / 153;
    let day = day_of_year - (153 * month_index + 2) / 5 + 1;
    let month = if month_index < 10 { month_index + 3 } else { month_index - 9 };
    let year = era * 400 + year_of_era + u64::from(month <= 2);
    (year, month, day)
}
