use std::path::Path;

use tracing::subscriber::DefaultGuard;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::app::LoggingConfig;

const LOG_FILE_PREFIX: &str = "creditlens.log";

/// `RUST_LOG` wins; otherwise `creditlens=<level>` plus quiet sqlx.
pub fn build_env_filter(level: &str, debug: bool) -> anyhow::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let level = if debug { "debug" } else { level };
    let directives = format!("creditlens={},sqlx=warn", level);
    EnvFilter::try_new(&directives)
        .map_err(|e| anyhow::anyhow!("Invalid tracing filter '{}': {}", directives, e))
}

/// Stderr-only subscriber at the default level, writing to `writer`.
pub fn bootstrap_subscriber<W>(
    debug: bool,
    writer: W,
) -> anyhow::Result<impl Subscriber + Send + Sync + 'static>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(false)
        .with_filter(build_env_filter("info", debug)?);
    Ok(tracing_subscriber::registry().with(layer))
}

/// Thread-local stderr logging for the steps that run before the
/// configuration is known. Drop the guard before calling [`init_logging`].
pub fn init_bootstrap_logging(debug: bool) -> anyhow::Result<DefaultGuard> {
    let subscriber = bootstrap_subscriber(debug, std::io::stderr)?;
    Ok(tracing::subscriber::set_default(subscriber))
}

/// Console logging goes to stderr so page output on stdout stays clean.
/// With file logging on, a daily-rolling file is written under `logs_dir`;
/// keep the returned guard alive until exit so buffered lines are flushed.
pub fn init_logging(
    config: &LoggingConfig,
    logs_dir: &Path,
    debug: bool,
) -> anyhow::Result<Option<WorkerGuard>> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(build_env_filter(&config.level, debug)?);

    let (file_layer, guard) = if config.file_logging {
        std::fs::create_dir_all(logs_dir)?;
        let appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
            .with_target(true)
            .with_filter(build_env_filter(&config.level, debug)?);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::debug!(
        "Logging initialized: level={}, file_logging={}",
        config.level,
        config.file_logging
    );
    Ok(guard)
}
