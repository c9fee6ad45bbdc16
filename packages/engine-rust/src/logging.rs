//! Tracing subscriber setup for binaries and embedding services.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the process that owns `main`.

use std::env;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, multi-line.
    #[default]
    Pretty,
    /// Single line per event.
    Compact,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name. Unknown names fall back to `Pretty`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset.
    pub default_level: String,
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            default_level: "info".to_string(),
            include_target: true,
        }
    }
}

impl LogConfig {
    /// Reads `LOG_FORMAT` (pretty, compact, json) and `LOG_LEVEL`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            format: env::var("LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or_default(),
            default_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_default_level(mut self, level: impl Into<String>) -> Self {
        self.default_level = level.into();
        self
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &LogConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(config.include_target))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(config.include_target))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_target(config.include_target))
            .try_init(),
    }
}
