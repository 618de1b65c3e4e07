//! Logging infrastructure for adowork.
//!
//! Logging is off unless a level is requested, so command output on stdout
//! stays clean JSON. When enabled, events go to stderr or to a file, as text
//! or JSON, through a non-blocking writer.
//!
//! Sources, highest precedence first:
//! - `--log-level`, `--log-file`, `--log-format`
//! - `ADOWORK_LOG_LEVEL`, `ADOWORK_LOG_FILE`, `ADOWORK_LOG_FORMAT`

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub const ENV_LOG_LEVEL: &str = "ADOWORK_LOG_LEVEL";
pub const ENV_LOG_FILE: &str = "ADOWORK_LOG_FILE";
pub const ENV_LOG_FORMAT: &str = "ADOWORK_LOG_FORMAT";

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a log level from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LogConfig {
    /// `None` disables logging.
    pub level: Option<LogLevel>,
    /// `None` means stderr.
    pub file: Option<PathBuf>,
    pub format: LogFormat,
}

impl LogConfig {
    /// Combine command-line values with the environment (looked up through
    /// `env`). Unparseable values are ignored.
    pub fn resolve(
        cli_level: Option<&str>,
        cli_file: Option<&str>,
        cli_format: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let pick = |cli: Option<&str>, var: &str| {
            cli.map(str::to_string)
                .or_else(|| env(var))
                .filter(|v| !v.is_empty())
        };
        Self {
            level: pick(cli_level, ENV_LOG_LEVEL).and_then(|s| LogLevel::parse(&s)),
            file: pick(cli_file, ENV_LOG_FILE).map(PathBuf::from),
            format: pick(cli_format, ENV_LOG_FORMAT)
                .and_then(|s| LogFormat::parse(&s))
                .unwrap_or_default(),
        }
    }

    /// Same as [`LogConfig::resolve`] against the process environment.
    pub fn from_cli_and_env(
        cli_level: Option<&str>,
        cli_file: Option<&str>,
        cli_format: Option<&str>,
    ) -> Self {
        Self::resolve(cli_level, cli_file, cli_format, |var| {
            std::env::var(var).ok()
        })
    }
}

/// Guard that must be held to ensure logs are flushed.
///
/// When this guard is dropped, all pending log messages are flushed.
pub struct LogGuard {
    _guard: WorkerGuard,
}

/// Initialize the logging system.
///
/// Returns `None` when logging is disabled, the log file cannot be opened,
/// or a global subscriber is already installed.
///
/// # Example
///
/// ```rust,no_run
/// use adowork::logging::{LogConfig, LogFormat, LogLevel, init_logging};
///
/// let config = LogConfig {
///     level: Some(LogLevel::Debug),
///     file: None,
///     format: LogFormat::Text,
/// };
/// let _guard = init_logging(config);
/// ```
#[must_use = "the returned guard must be held until application exit"]
pub fn init_logging(config: LogConfig) -> Option<LogGuard> {
    let level = config.level?;

    // Only our own crate; reqwest/hyper are noisy at debug.
    let filter = EnvFilter::new(format!("adowork={}", level.as_filter_str()));

    let (writer, guard) = match &config.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()?;
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => fmt::layer()
            .with_writer(writer)
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Text => fmt::layer()
            .with_writer(writer)
            .with_ansi(config.file.is_none())
            .with_target(true)
            .with_level(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .ok()?;

    Some(LogGuard { _guard: guard })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    /// # Test: Log Level Parsing
    ///
    /// Verifies that log levels are parsed case-insensitively.
    ///
    /// ## Test Scenario
    /// - Parse valid and invalid level strings
    ///
    /// ## Expected Outcome
    /// - Valid strings map to their level, others to None
    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::parse("TRACE"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse("Debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("error"), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("verbose"), None);
        assert_eq!(LogLevel::Info.as_filter_str(), "info");
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("text"), Some(LogFormat::Text));
        assert_eq!(LogFormat::parse("yaml"), None);
    }

    /// # Test: Disabled by Default
    ///
    /// Verifies that nothing set means logging is off.
    ///
    /// ## Test Scenario
    /// - Resolve with no CLI values and an empty environment
    ///
    /// ## Expected Outcome
    /// - Level None, stderr, text; init_logging returns None
    #[test]
    fn test_disabled_by_default() {
        let config = LogConfig::resolve(None, None, None, env_from(&[]));
        assert_eq!(config, LogConfig::default());
        assert!(init_logging(config).is_none());
    }

    /// # Test: CLI Over Environment
    ///
    /// Verifies precedence between flags and environment variables.
    ///
    /// ## Test Scenario
    /// - Environment sets all three; CLI overrides the level only
    ///
    /// ## Expected Outcome
    /// - Level from CLI, file and format from environment
    #[test]
    fn test_cli_overrides_env() {
        let env = env_from(&[
            (ENV_LOG_LEVEL, "error"),
            (ENV_LOG_FILE, "/tmp/adowork.log"),
            (ENV_LOG_FORMAT, "json"),
        ]);
        let config = LogConfig::resolve(Some("debug"), None, None, env);
        assert_eq!(config.level, Some(LogLevel::Debug));
        assert_eq!(config.file, Some(PathBuf::from("/tmp/adowork.log")));
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_values_ignored() {
        let env = env_from(&[(ENV_LOG_LEVEL, "loud"), (ENV_LOG_FORMAT, "xml")]);
        let config = LogConfig::resolve(None, Some(""), None, env);
        assert_eq!(config.level, None);
        assert_eq!(config.file, None);
        assert_eq!(config.format, LogFormat::Text);
    }
}
