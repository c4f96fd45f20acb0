//! Tracing configuration and log routing.
//!
//! The binary logs to stdout using a compact formatter and to a file. When
//! `PAPERDIGEST_LOG_FILE` is set, logs are appended to that path; otherwise a file logger is
//! created under `logs/paperdigest.log`. The file layer goes through a non-blocking writer.
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "paperdigest.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Configure tracing subscribers for stdout and file logging.
///
/// - `verbose` forces the `debug` level; otherwise `RUST_LOG` is respected (defaults to `info`).
/// - Installs a compact stdout layer and, when available, a file layer.
/// - Uses a global guard to keep the non-blocking writer alive for the process lifetime.
pub fn init_tracing(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    if let Some(writer) = configure_file_writer() {
        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact();

        registry.with(file_layer).init();
    } else {
        registry.init();
    }
}

/// Resolve where file logs go: `PAPERDIGEST_LOG_FILE` when set, else `logs/paperdigest.log`.
fn log_file_path(override_path: Option<String>) -> PathBuf {
    override_path
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(DEFAULT_LOG_DIR).join(DEFAULT_LOG_FILE))
}

/// Build a non-blocking writer for file logging.
///
/// Returns `None` when the parent directory cannot be created or the target file cannot be
/// opened; stdout logging still works in that case.
fn configure_file_writer() -> Option<NonBlocking> {
    let path = log_file_path(std::env::var("PAPERDIGEST_LOG_FILE").ok());
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        if let Err(err) = std::fs::create_dir_all(parent) {
            eprintln!("Failed to create log directory {}: {err}", parent.display());
            return None;
        }
    }

    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
    {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let _ = LOG_GUARD.set(guard);
            Some(non_blocking)
        }
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_path_prefers_override() {
        assert_eq!(
            log_file_path(Some("/tmp/digest.log".into())),
            PathBuf::from("/tmp/digest.log")
        );
    }

    #[test]
    fn log_file_path_defaults_under_logs() {
        assert_eq!(log_file_path(None), PathBuf::from("logs/paperdigest.log"));
        assert_eq!(
            log_file_path(Some("  ".into())),
            PathBuf::from("logs/paperdigest.log")
        );
    }
}
