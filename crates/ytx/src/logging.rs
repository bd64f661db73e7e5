//! Tracing setup for ytx
//!
//! Structured logging with selectable output formats and a per-process
//! correlation id. All output goes to stderr.
//!
//! | variable         | meaning                                         |
//! |------------------|-------------------------------------------------|
//! | `YTX_LOG`        | full filter directive, wins over `RUST_LOG`     |
//! | `YTX_LOG_LEVEL`  | level for every ytx crate (`warn` by default)   |
//! | `YTX_LOG_FORMAT` | `pretty`, `compact`, `json` or `dev`            |

use std::io;
pub use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Tracing output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Pretty-printed human-readable format
    Pretty,
    /// Compact single-line format
    Compact,
    /// Structured JSON format
    Json,
    /// Development format with file locations
    Dev,
}

impl std::str::FromStr for TracingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            "dev" => Ok(Self::Dev),
            _ => Err(format!("Unknown tracing format: {s}")),
        }
    }
}

/// Log level options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Show all logs (trace level)
    Trace,
    /// Show debug and above
    Debug,
    /// Show info and above
    Info,
    /// Show warnings and above (default)
    Warn,
    /// Show errors only
    Error,
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {s}")),
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// Tracing configuration
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Output format
    pub format: TracingFormat,
    /// Level for ytx crates when `RUST_LOG` is unset
    pub level: Level,
    /// Show file and line in the `Dev` format
    pub enable_file_location: bool,
    /// Explicit filter directive, overriding `RUST_LOG` and `level`
    pub filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            format: TracingFormat::Compact,
            level: Level::WARN,
            enable_file_location: true,
            filter: None,
        }
    }
}

impl TracingConfig {
    /// Configuration from `YTX_LOG*` variables, defaults for the rest
    ///
    /// # Errors
    ///
    /// Fails on an unknown format or level.
    pub fn from_env() -> miette::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Configuration from an arbitrary variable lookup; empty values are unset
    ///
    /// # Errors
    ///
    /// Fails on an unknown format or level.
    pub fn from_lookup<F>(lookup: F) -> miette::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();
        if let Some(format) = get("YTX_LOG_FORMAT") {
            config.format = format.parse().map_err(|e: String| miette::miette!("{e}"))?;
        }
        if let Some(level) = get("YTX_LOG_LEVEL") {
            let level: LogLevel = level.parse().map_err(|e: String| miette::miette!("{e}"))?;
            config.level = level.into();
        }
        config.filter = get("YTX_LOG");
        Ok(config)
    }
}

/// Global correlation ID for tracing request correlation
static CORRELATION_ID: std::sync::OnceLock<Uuid> = std::sync::OnceLock::new();

/// Get or create a correlation ID for the current process
pub fn correlation_id() -> Uuid {
    *CORRELATION_ID.get_or_init(Uuid::new_v4)
}

/// Default filter directive giving every ytx crate `level`
#[must_use]
pub fn default_directive(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    ["ytx", "ytx_core", "ytx_cache", "ytx_audio", "ytx_engines"]
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize tracing with the given configuration
///
/// # Errors
///
/// Fails when the filter directive is invalid or a global subscriber is
/// already installed.
pub fn init_tracing(config: TracingConfig) -> miette::Result<()> {
    let correlation_id = correlation_id();

    let env_filter = if let Some(filter) = config.filter {
        EnvFilter::try_new(filter)
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_directive(config.level)))
    }
    .map_err(|e| miette::miette!("Failed to create tracing filter: {e}"))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match config.format {
        TracingFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(io::stderr)
                    .with_target(true),
            )
            .try_init(),
        TracingFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(io::stderr)
                    .with_target(false),
            )
            .try_init(),
        TracingFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init(),
        TracingFormat::Dev => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(io::stderr)
                    .with_file(config.enable_file_location)
                    .with_line_number(config.enable_file_location)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true),
            )
            .try_init(),
    };
    installed.map_err(|e| miette::miette!("Failed to install tracing subscriber: {e}"))?;

    tracing::info!(
        correlation_id = %correlation_id,
        version = env!("CARGO_PKG_VERSION"),
        format = ?config.format,
        "Tracing initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("pretty".parse::<TracingFormat>().unwrap(), TracingFormat::Pretty);
        assert_eq!("JSON".parse::<TracingFormat>().unwrap(), TracingFormat::Json);
        assert!("invalid".parse::<TracingFormat>().is_err());
    }

    #[test]
    fn test_config_from_lookup() {
        let config = TracingConfig::from_lookup(|name| match name {
            "YTX_LOG_FORMAT" => Some("json".into()),
            "YTX_LOG_LEVEL" => Some("Debug".into()),
            "YTX_LOG" => Some("  ".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.format, TracingFormat::Json);
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.filter.is_none(), "blank directive is unset");
    }

    #[test]
    fn test_config_from_lookup_defaults_and_errors() {
        let config = TracingConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.format, TracingFormat::Compact);
        assert_eq!(config.level, Level::WARN);

        let directive = TracingConfig::from_lookup(|name| {
            (name == "YTX_LOG").then(|| "ytx_cache=trace".to_string())
        })
        .unwrap();
        assert_eq!(directive.filter.as_deref(), Some("ytx_cache=trace"));

        assert!(TracingConfig::from_lookup(|name| {
            (name == "YTX_LOG_LEVEL").then(|| "loud".to_string())
        })
        .is_err());
    }

    #[test]
    fn test_correlation_id_consistency() {
        assert_eq!(correlation_id(), correlation_id());
    }

    #[test]
    fn test_default_directive_covers_all_crates() {
        let directive = default_directive(LogLevel::Debug.into());
        assert!(directive.contains("ytx_engines=debug"));
        assert!(directive.starts_with("ytx=debug"));
    }
}
