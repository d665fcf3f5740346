//! Logging configuration using tracing

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Environment variable controlling the log filter.
pub const LOG_ENV: &str = "GFXTRACE_LOG";

/// Initialize the logging subsystem
///
/// Logs are written to `<data dir>/<app_name>/logs/`.
/// Log level is controlled by the `GFXTRACE_LOG` environment variable.
///
/// # Examples
/// ```bash
/// GFXTRACE_LOG=debug gfxtrace schema
/// GFXTRACE_LOG=rpclib_rpc=trace gfxtrace captures
/// ```
pub fn init(app_name: &str) -> Result<()> {
    let log_dir = get_log_directory(app_name);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender =
        RollingFileAppender::new(Rotation::DAILY, &log_dir, format!("{app_name}.log"));

    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .try_init()
        .map_err(|e| crate::error::Error::config(format!("logging already initialized: {e}")))?;

    tracing::info!("{} starting, log directory: {}", app_name, log_dir.display());

    Ok(())
}

/// Get the log directory path
pub fn get_log_directory(app_name: &str) -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join(app_name).join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directory_ends_with_app_logs() {
        let dir = get_log_directory("gfxtrace");
        assert!(dir.ends_with("gfxtrace/logs"));
    }
}
