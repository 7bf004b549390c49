//! Tracing setup: a console layer plus an optional plain-text log file.
//!
//! The filter comes from `RUST_LOG` when set, otherwise from the level the
//! CLI resolved (`-v`/`-q` > `--log-level` > `logging.level`).

use std::fs::OpenOptions;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use webai_config::LoggingConfig;
use webai_core::{Result, WebAiError};

/// Console output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl LogFormat {
    /// Parse from config text (case-insensitive). Unknown values are `Pretty`.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Pick the level: `--verbose` > `--quiet` > `--log-level` > config.
pub fn resolve_level<'a>(
    verbose: bool,
    quiet: bool,
    explicit: Option<&'a str>,
    configured: &'a str,
) -> &'a str {
    if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        explicit.unwrap_or(configured)
    }
}

/// Keeps the log file writer flushing. Hold it until the process exits.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber.
pub fn init(level: &str, logging: &LoggingConfig) -> Result<LogGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Console logs go to stderr so stdout only carries command output.
    let console = match LogFormat::parse(&logging.format) {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let (file_layer, guard) = match logging.file {
        Some(ref path) => {
            let (writer, guard) = tracing_appender::non_blocking(open_log_file(path)?);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| WebAiError::Other(anyhow::anyhow!("cannot install logger: {e}")))?;

    Ok(LogGuard { _file: guard })
}

/// Open `path` for appending, creating its directory if needed.
fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| WebAiError::Config(format!("cannot open log file {}: {e}", path.display())))
}
