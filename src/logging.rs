//! Structured logging setup.
//!
//! Builds a `tracing_subscriber` registry with an [`EnvFilter`] and either a
//! JSON or a pretty formatting layer. Output goes to stdout, optionally through
//! a `tracing_appender` non-blocking writer.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `PIPEROUTE_LOG_LEVEL` | `info` | base level |
//! | `PIPEROUTE_LOG_FORMAT` | `json` | `json` or `pretty` |
//! | `PIPEROUTE_LOG_ASYNC` | `false` | buffer output on a writer thread |
//! | `PIPEROUTE_LOG_TARGET_FILTER` | unset | extra comma-separated directives |
//! | `PIPEROUTE_LOG_INCLUDE_LOCATION` | `false` | add file and line to events |
//!
//! `RUST_LOG`, when set, takes precedence over the base level.

use std::env;

use anyhow::{Context, Result};
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, with span context
    Json,
    /// Multi-line human-readable output
    Pretty,
}

impl LogFormat {
    /// Parse a format name; anything but `pretty` is JSON
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base level: trace, debug, info, warn or error
    pub log_level: String,
    /// Output format
    pub format: LogFormat,
    /// Write through a background thread
    pub async_logging: bool,
    /// Extra `EnvFilter` directives, comma separated
    pub target_filter: Option<String>,
    /// Add source file and line number to each event
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            async_logging: false,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Load from `PIPEROUTE_LOG_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            log_level: lookup("PIPEROUTE_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: lookup("PIPEROUTE_LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or(defaults.format),
            async_logging: lookup("PIPEROUTE_LOG_ASYNC")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.async_logging),
            target_filter: lookup("PIPEROUTE_LOG_TARGET_FILTER"),
            include_location: lookup("PIPEROUTE_LOG_INCLUDE_LOCATION")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.include_location),
        }
    }

    /// Verbose, human-readable settings for local work
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            async_logging: false,
            target_filter: None,
            include_location: true,
        }
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    let level = parse_level(&config.log_level);
    let mut env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if let Some(target_filter) = &config.target_filter {
        for filter in target_filter.split(',') {
            let filter = filter.trim();
            if filter.is_empty() {
                continue;
            }
            match filter.parse() {
                Ok(directive) => env_filter = env_filter.add_directive(directive),
                Err(_) => eprintln!("Warning: Invalid log filter directive: {filter}"),
            }
        }
    }
    env_filter
}

// One formatting layer for either writer; only the sink differs between the
// sync and async setups.
fn fmt_layer<S, W>(config: &LogConfig, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    }
}

/// Install the global subscriber.
///
/// With `async_logging` the returned guard owns the writer thread; keep it
/// alive until exit or buffered lines are lost.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let (writer, guard) = if config.async_logging {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
        (BoxMakeWriter::new(non_blocking), Some(guard))
    } else {
        (BoxMakeWriter::new(std::io::stdout), None)
    };

    tracing_subscriber::registry()
        .with(build_filter(config))
        .with(fmt_layer(config, writer))
        .try_init()
        .with_context(|| {
            let mode = if config.async_logging { "async" } else { "sync" };
            format!("Failed to initialize {mode} logging")
        })?;
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("invalid"), LogFormat::Json);
    }

    #[test]
    fn test_log_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("PIPEROUTE_LOG_LEVEL", "debug"),
            ("PIPEROUTE_LOG_FORMAT", "pretty"),
            ("PIPEROUTE_LOG_ASYNC", "true"),
            ("PIPEROUTE_LOG_TARGET_FILTER", "piperoute::router=trace"),
        ]
        .into_iter()
        .collect();
        let config = LogConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.async_logging);
        assert_eq!(
            config.target_filter.as_deref(),
            Some("piperoute::router=trace")
        );
        assert!(!config.include_location);
    }

    #[test]
    fn test_log_config_defaults_on_garbage() {
        let config = LogConfig::from_lookup(|k| match k {
            "PIPEROUTE_LOG_ASYNC" => Some("maybe".to_string()),
            _ => None,
        });
        assert_eq!(config.log_level, "info");
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.async_logging);
    }

    #[derive(Clone)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuf {
        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture(config: &LogConfig) -> String {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let writer = SharedBuf(Arc::clone(&buf));
        let subscriber = tracing_subscriber::registry()
            .with(fmt_layer(config, move || writer.clone()));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(route = "/pages/:page", "Route compiled");
        });
        let out = buf.lock().unwrap();
        String::from_utf8_lossy(&out).into_owned()
    }

    #[test]
    fn test_fmt_layer_formats() {
        let json = capture(&LogConfig::default());
        let line: serde_json::Value = serde_json::from_str(json.trim()).unwrap();
        assert_eq!(line["fields"]["message"], "Route compiled");
        assert_eq!(line["fields"]["route"], "/pages/:page");
        assert!(line.get("filename").is_none());

        let located = capture(&LogConfig {
            include_location: true,
            ..LogConfig::default()
        });
        let line: serde_json::Value = serde_json::from_str(located.trim()).unwrap();
        assert!(line["filename"].as_str().unwrap().ends_with("logging.rs"));

        let pretty = capture(&LogConfig {
            format: LogFormat::Pretty,
            ..LogConfig::default()
        });
        assert!(pretty.contains("Route compiled"));
        assert!(serde_json::from_str::<serde_json::Value>(pretty.trim()).is_err());
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("WARN"), Level::WARN);
        assert_eq!(parse_level("nonsense"), Level::INFO);
    }
}
