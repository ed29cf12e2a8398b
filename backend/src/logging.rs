//! Tracing setup for the binary.
//!
//! Console output goes to stderr so stdout stays clean for JSON output. When a
//! log directory is configured each run also writes `etl_run_<timestamp>.log`
//! there.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogFormat;

pub const DEFAULT_FILTER: &str = "rosterload=info";

/// Name of the per-run log file.
pub fn run_log_file_name() -> String {
    format!("etl_run_{}.log", Local::now().format("%Y%m%d_%H%M%S"))
}

/// Install the global subscriber. `RUST_LOG` overrides [`DEFAULT_FILTER`].
///
/// Keep the returned guard alive until exit or buffered file lines are lost.
pub fn init_logging(format: LogFormat, log_dir: Option<&Path>) -> std::io::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let path = prepare_log_file(dir)?;
            let file_appender = tracing_appender::rolling::never(dir, path);
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init(),
    }

    Ok(guard)
}

fn prepare_log_file(dir: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    Ok(PathBuf::from(run_log_file_name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_log_file_name() {
        let name = run_log_file_name();
        assert!(name.starts_with("etl_run_"));
        assert!(name.ends_with(".log"));
        // etl_run_YYYYmmdd_HHMMSS.log
        assert_eq!(name.len(), "etl_run_".len() + 15 + ".log".len());
    }

    #[test]
    fn test_prepare_log_file_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");

        let file = prepare_log_file(&logs).unwrap();
        assert!(logs.is_dir());
        assert!(file.to_string_lossy().starts_with("etl_run_"));
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(DEFAULT_FILTER.parse::<tracing_subscriber::filter::Directive>().is_ok());
    }
}
