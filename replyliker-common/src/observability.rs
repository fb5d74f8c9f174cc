//! `tracing` setup for the `replyliker` binary.
//!
//! Events go to a daily rolling file and, on request, to `stderr` as well.
//! [`init_logging`] may be called more than once; only the first call installs
//! the subscriber, the rest hand back the same file path.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

const APP_NAME: &str = "replyliker";
const LOG_DIR_ENV: &str = "REPLYLIKER_LOG_DIR";

/// Used when `RUST_LOG` is unset: progress from the binary and the
/// collector/dispatcher, only problems from the transport.
pub const DEFAULT_FILTER: &str =
    "warn,replyliker=info,replyliker_social=info,replyliker_config=info,replyliker_http=warn";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Output encoding for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format `{other}` (expected text or json)")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Directory for the log files. Falls back to `REPLYLIKER_LOG_DIR`, then
    /// `~/.local/share/replyliker`.
    pub log_dir: Option<PathBuf>,
    /// Copy every event to `stderr` too.
    pub emit_stderr: bool,
    pub format: LogFormat,
}

/// Install the global subscriber and return today's log file.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = LOG_PATH.get() {
        return Ok(path.clone());
    }

    let dir = resolve_log_dir(config.log_dir.as_deref());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

    // The appender rolls on UTC midnight, so the returned name must use UTC too.
    let path = log_file_path(&dir, Utc::now().date_naive());
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, log_file_prefix()));
    let _ = LOG_GUARD.set(guard);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let mut layers: Vec<BoxedLayer> = vec![sink(config.format, writer, false)];
    if config.emit_stderr {
        layers.push(sink(config.format, std::io::stderr, true));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;

    let _ = LOG_PATH.set(path.clone());
    Ok(path)
}

fn sink<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Text => fmt::layer().with_writer(writer).with_ansi(ansi).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    }
}

fn log_file_prefix() -> String {
    format!("{APP_NAME}.log")
}

/// File `tracing_appender::rolling::daily` writes to on `date`.
fn log_file_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}.{}", log_file_prefix(), date.format("%Y-%m-%d")))
}

fn resolve_log_dir(explicit: Option<&Path>) -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let configured = explicit.map(Path::to_path_buf).or_else(|| {
        std::env::var_os(LOG_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    });

    match (configured, home) {
        (Some(dir), Some(home)) => match dir.strip_prefix("~") {
            Ok(rest) => home.join(rest),
            Err(_) => dir,
        },
        (Some(dir), None) => dir,
        (None, Some(home)) => home.join(".local/share").join(APP_NAME),
        (None, None) => PathBuf::from(APP_NAME),
    }
}
