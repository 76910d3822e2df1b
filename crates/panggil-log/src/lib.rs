//! Logging setup for panggil.
//!
//! The HTTP crate only emits `tracing` events; binaries and tests call
//! [`init`] once to install a subscriber.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Environment variable names.
pub mod vars {
    pub const PANGGIL_LOG_LEVEL: &str = "PANGGIL_LOG_LEVEL";
    pub const PANGGIL_LOG_FORMAT: &str = "PANGGIL_LOG_FORMAT";
    pub const PANGGIL_LOG_FILE: &str = "PANGGIL_LOG_FILE";
    pub const PANGGIL_LOG_SOURCE: &str = "PANGGIL_LOG_SOURCE";
    pub const PANGGIL_LOG_SPANS: &str = "PANGGIL_LOG_SPANS";
    pub const RUST_LOG: &str = "RUST_LOG";
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level, used when `RUST_LOG` holds no filter directives.
    pub level: LogLevel,
    /// Output format.
    pub format: LogFormat,
    /// Also append events to this file.
    pub file_path: Option<PathBuf>,
    /// Include source file and line.
    pub source_location: bool,
    /// Emit span open/close events.
    pub span_events: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            file_path: None,
            source_location: false,
            span_events: false,
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a level name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl From<LogLevel> for tracing_subscriber::filter::LevelFilter {
    fn from(level: LogLevel) -> Self {
        use tracing_subscriber::filter::LevelFilter;
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human-readable.
    #[default]
    Pretty,
    /// One line per event.
    Compact,
    /// Newline-delimited JSON.
    Json,
}

impl LogFormat {
    /// Parse a format name; unknown names fall back to `Pretty`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

fn flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

impl LogConfig {
    /// Read `PANGGIL_LOG_*` variables. The level falls back to `RUST_LOG`
    /// when it names a single level.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        let level = std::env::var(vars::PANGGIL_LOG_LEVEL)
            .or_else(|_| std::env::var(vars::RUST_LOG))
            .ok();
        if let Some(level) = level.as_deref().and_then(LogLevel::parse) {
            config.level = level;
        }

        if let Ok(format) = std::env::var(vars::PANGGIL_LOG_FORMAT) {
            config.format = LogFormat::parse(&format);
        }

        if let Ok(path) = std::env::var(vars::PANGGIL_LOG_FILE) {
            config.file_path = Some(PathBuf::from(path));
        }

        if let Ok(value) = std::env::var(vars::PANGGIL_LOG_SOURCE) {
            config.source_location = flag(&value);
        }

        if let Ok(value) = std::env::var(vars::PANGGIL_LOG_SPANS) {
            config.span_events = flag(&value);
        }

        config
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

fn open_log_file(path: &Path) -> Result<Arc<File>, LogError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Arc::new(file))
}

/// Install a global subscriber built from `config`.
///
/// Fails if a subscriber is already installed.
pub fn init(config: LogConfig) -> Result<(), LogError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));
    let file = config.file_path.as_deref().map(open_log_file).transpose()?;
    let source = config.source_location;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Pretty => {
            let stderr = fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_file(source)
                .with_line_number(source)
                .with_span_events(config.span_events());
            let file = file.map(|f| {
                fmt::layer()
                    .with_writer(f)
                    .with_ansi(false)
                    .with_target(true)
                    .with_file(source)
                    .with_line_number(source)
                    .with_span_events(config.span_events())
            });
            registry.with(stderr).with(file).try_init()
        }
        LogFormat::Compact => {
            let stderr = fmt::layer()
                .compact()
                .with_writer(io::stderr)
                .with_span_events(config.span_events());
            let file = file.map(|f| {
                fmt::layer()
                    .compact()
                    .with_writer(f)
                    .with_ansi(false)
                    .with_span_events(config.span_events())
            });
            registry.with(stderr).with(file).try_init()
        }
        LogFormat::Json => {
            let stderr = fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_span_events(config.span_events());
            let file = file.map(|f| {
                fmt::layer()
                    .json()
                    .with_writer(f)
                    .with_span_events(config.span_events())
            });
            registry.with(stderr).with(file).try_init()
        }
    };

    result.map_err(|e| LogError::InitError(e.to_string()))
}

/// Logging errors.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("failed to initialize logging: {0}")]
    InitError(String),

    #[error("failed to open log file: {0}")]
    FileError(#[from] io::Error),
}

pub use tracing::{debug, error, info, trace, warn};
