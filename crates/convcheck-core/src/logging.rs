//! Structured logging configuration for convcheck.
//!
//! Harness runs, conversions and provider executions all log through
//! `tracing`; this module installs the subscriber that renders them.

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum log level to display
    pub level: LogLevel,
    /// Whether to include timestamps
    pub with_timestamps: bool,
    /// Whether to include thread IDs
    pub with_thread_ids: bool,
    /// Whether to include source code locations
    pub with_source_location: bool,
    /// Whether to log span events (enter/exit)
    pub with_span_events: bool,
    /// Whether to output in JSON format
    pub json_format: bool,
    /// Route output through the test writer so `cargo test` captures it
    pub test_writer: bool,
}

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Trace-level logging (most verbose)
    Trace,
    /// Debug-level logging
    Debug,
    /// Info-level logging
    Info,
    /// Warn-level logging
    Warn,
    /// Error-level logging (least verbose)
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            with_timestamps: true,
            with_thread_ids: false,
            with_source_location: false,
            with_span_events: false,
            json_format: false,
            test_writer: false,
        }
    }
}

impl LoggingConfig {
    /// Create a new logging configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum log level.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Enable or disable timestamps.
    pub fn with_timestamps(mut self, enable: bool) -> Self {
        self.with_timestamps = enable;
        self
    }

    /// Enable or disable thread IDs.
    pub fn with_thread_ids(mut self, enable: bool) -> Self {
        self.with_thread_ids = enable;
        self
    }

    /// Enable or disable source code locations.
    pub fn with_source_location(mut self, enable: bool) -> Self {
        self.with_source_location = enable;
        self
    }

    /// Enable or disable span event logging.
    pub fn with_span_events(mut self, enable: bool) -> Self {
        self.with_span_events = enable;
        self
    }

    /// Enable or disable JSON output format.
    pub fn with_json_format(mut self, enable: bool) -> Self {
        self.json_format = enable;
        self
    }

    /// Verbose, human-readable output for local debugging.
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            with_timestamps: true,
            with_thread_ids: true,
            with_source_location: true,
            with_span_events: true,
            json_format: false,
            test_writer: false,
        }
    }

    /// JSON output for CI log aggregation.
    pub fn ci() -> Self {
        Self {
            level: LogLevel::Info,
            with_timestamps: true,
            with_thread_ids: false,
            with_source_location: false,
            with_span_events: false,
            json_format: true,
            test_writer: false,
        }
    }

    /// Output captured per test by the test harness.
    pub fn for_tests() -> Self {
        Self {
            level: LogLevel::Debug,
            with_timestamps: false,
            with_thread_ids: true,
            with_source_location: false,
            with_span_events: true,
            json_format: false,
            test_writer: true,
        }
    }
}

/// Install the global subscriber, failing if one is already set.
///
/// `RUST_LOG` takes precedence over `config.level` when present.
pub fn try_init_logging(config: LoggingConfig) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.to_tracing_level().as_str()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let span_events = if config.with_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let fmt_layer = fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_current_span(true)
            .with_thread_ids(config.with_thread_ids)
            .with_file(config.with_source_location)
            .with_line_number(config.with_source_location);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    } else if config.test_writer {
        let fmt_layer = fmt::layer()
            .with_test_writer()
            .with_span_events(span_events)
            .with_thread_ids(config.with_thread_ids)
            .with_target(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    } else {
        let fmt_layer = fmt::layer()
            .with_span_events(span_events)
            .with_thread_ids(config.with_thread_ids)
            .with_file(config.with_source_location)
            .with_line_number(config.with_source_location)
            .with_target(config.with_source_location);

        if config.with_timestamps {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer.without_time())
                .try_init()
        }
    }
}

/// Install the global subscriber; later calls are ignored.
///
/// # Example
///
/// ```no_run
/// use convcheck_core::logging::{init_logging, LoggingConfig};
///
/// init_logging(LoggingConfig::development());
/// ```
pub fn init_logging(config: LoggingConfig) {
    if let Err(err) = try_init_logging(config) {
        tracing::debug!("logging already initialised: {}", err);
    }
}

/// Initialize logging with default configuration.
pub fn init_default_logging() {
    init_logging(LoggingConfig::default());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert!(config.with_timestamps);
        assert!(!config.with_thread_ids);
        assert!(!config.test_writer);
    }

    #[test]
    fn test_logging_config_presets() {
        assert!(LoggingConfig::development().with_span_events);
        assert!(LoggingConfig::ci().json_format);
        assert!(LoggingConfig::for_tests().test_writer);
    }

    #[test]
    fn test_logging_config_builder() {
        let config = LoggingConfig::new()
            .with_level(LogLevel::Trace)
            .with_timestamps(false)
            .with_thread_ids(true)
            .with_json_format(true);

        assert_eq!(config.level, LogLevel::Trace);
        assert!(!config.with_timestamps);
        assert!(config.with_thread_ids);
        assert!(config.json_format);
    }

    #[test]
    fn test_second_init_is_harmless() {
        init_logging(LoggingConfig::for_tests());
        init_logging(LoggingConfig::for_tests());
        assert!(try_init_logging(LoggingConfig::for_tests()).is_err());
    }
}
