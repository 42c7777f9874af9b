//! Logging setup for the `rgo` tool
//!
//! Structured logging through `tracing`, with pretty, compact or JSON
//! output to stderr or a daily-rolling file. Stdout is left alone: the
//! CLI writes generated source and JSON there.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{Level, Subscriber};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, multi-line
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Log output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stderr,
    /// Daily-rolling files named `<prefix>.<date>` in `directory`
    File { directory: PathBuf, prefix: String },
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Log span open/close events
    pub span_events: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Pretty,
            output: LogOutput::Stderr,
            span_events: false,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }
}

/// Installs the global subscriber.
///
/// Only the first call in a process installs anything; later calls, and
/// calls made after the host installed its own subscriber, return `None`.
/// The returned guard flushes buffered output when dropped and must be
/// kept alive until the program exits.
pub fn init_logging(config: LogConfig) -> Option<WorkerGuard> {
    if INSTALLED.set(()).is_err() {
        return None;
    }

    let filter = build_filter(config.level);
    let (writer, guard) = match &config.output {
        LogOutput::Stderr => tracing_appender::non_blocking(std::io::stderr()),
        LogOutput::File { directory, prefix } => {
            tracing_appender::non_blocking(rolling::daily(directory, prefix))
        }
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer(config.format, writer, config.span_events))
        .try_init()
        .is_ok();

    installed.then_some(guard)
}

/// `RUST_LOG` when set, otherwise `level` for this tool and its runtime
/// and `warn` for everything else.
fn build_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.as_str().to_ascii_lowercase();
        EnvFilter::new(format!("warn,rgo={0},rgo_runtime={0}", level))
    })
}

fn fmt_layer<S, W>(format: LogFormat, writer: W, span_events: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_span_events(span_events_config(span_events));
    match format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

fn span_events_config(enabled: bool) -> FmtSpan {
    if enabled {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

/// Development defaults: debug level, span events on.
pub fn init_dev_logging() -> Option<WorkerGuard> {
    init_logging(
        LogConfig::new()
            .with_level(Level::DEBUG)
            .with_span_events(true),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = LogConfig::new()
            .with_level(Level::DEBUG)
            .with_format(LogFormat::Json)
            .with_span_events(true);

        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.span_events);
        assert_eq!(config.output, LogOutput::Stderr);
    }

    #[test]
    fn test_format_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            format: LogFormat,
        }
        let w: Wrapper = toml::from_str("format = \"compact\"").unwrap();
        assert_eq!(w.format, LogFormat::Compact);
        assert!(toml::from_str::<Wrapper>("format = \"xml\"").is_err());
    }

    #[test]
    fn test_init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig::new().with_output(LogOutput::File {
            directory: dir.path().to_path_buf(),
            prefix: "rgo.log".into(),
        });
        let _first = init_logging(config.clone());
        assert!(init_logging(config).is_none());
    }
}
