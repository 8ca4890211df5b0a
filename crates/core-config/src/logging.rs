//! Tracing subscriber installation.
//!
//! The writer is always routed through `tracing-appender`'s
//! non-blocking worker so a slow sink never stalls the render or
//! input paths; the returned guard must stay alive for the process
//! lifetime. A second `init` is tolerated (the first subscriber
//! wins), so tests and embedders can install their own.

use crate::{LogConfig, LogFormat};
use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

/// Default timestamp rendering when no format override is given.
const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Install the global subscriber per `cfg`. Returns the non-blocking
/// writer guard; dropping it flushes and stops the writer thread.
pub fn init(cfg: &LogConfig) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_new(&cfg.level)
        .with_context(|| format!("invalid log level {:?}", cfg.level))?;

    let (writer, guard) = match &cfg.file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            let name = path
                .file_name()
                .context("log file path has no file name")?;
            let appender =
                tracing_appender::rolling::never(dir.unwrap_or(Path::new(".")), name);
            tracing_appender::non_blocking(appender)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let timer = ChronoLocal::new(
        cfg.timestamp_format
            .clone()
            .unwrap_or_else(|| DEFAULT_TIMESTAMP_FORMAT.to_string()),
    );

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_file(cfg.full_paths)
        .with_line_number(cfg.full_paths);

    // The builder's type changes with every formatting combinator, so
    // each shape terminates in its own arm.
    let installed = match (cfg.format, cfg.timestamps) {
        (LogFormat::Text, true) => builder.compact().with_timer(timer).try_init(),
        (LogFormat::Text, false) => builder.compact().without_time().try_init(),
        (LogFormat::Pretty, true) => builder.pretty().with_timer(timer).try_init(),
        (LogFormat::Pretty, false) => builder.pretty().without_time().try_init(),
        (LogFormat::Json, true) => builder.json().with_timer(timer).try_init(),
        (LogFormat::Json, false) => builder.json().without_time().try_init(),
    };
    if installed.is_err() {
        // A subscriber is already installed; keep it and let the new
        // guard flush whatever this writer sees (nothing).
        tracing::debug!(target: "config.logging", "subscriber already installed");
    }
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    #[test]
    fn init_writes_to_the_configured_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hexes.log");
        let cfg = Config::from_lookup(|name| match name {
            "HEXES_LOG_LEVEL" => Some("info".to_string()),
            "HEXES_LOG_FILE" => Some(path.to_string_lossy().into_owned()),
            _ => None,
        });
        let guard = init(&cfg.log).expect("subscriber installs");
        tracing::info!(target: "config.logging", "hello from the test");
        drop(guard);
        let written = std::fs::read_to_string(&path).unwrap_or_default();
        // Either we installed the global subscriber and the line is
        // present, or another test won the race and the file is empty.
        assert!(written.is_empty() || written.contains("hello from the test"));
    }

    #[test]
    fn invalid_level_is_rejected() {
        let cfg = LogConfig {
            level: "screen.render=notalevel".to_string(),
            ..LogConfig::default()
        };
        assert!(init(&cfg).is_err());
    }
}
