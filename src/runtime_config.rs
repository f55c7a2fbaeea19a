//! # Runtime Configuration Module
//!
//! Environment-based settings for the `piperoute` binary and for embedding
//! applications that want the same defaults.
//!
//! ## Environment Variables
//!
//! ### `PIPEROUTE_ROUTES_FILE`
//!
//! Route file to load when none is given on the command line. YAML when the
//! extension is `.yaml`/`.yml`, JSON otherwise.
//!
//! Default: `config/routes.yaml`
//!
//! ### `PIPEROUTE_SLOW_MATCH_US`
//!
//! Lookups slower than this many microseconds are logged at `warn`.
//!
//! Default: `1000`
//!
//! ## Usage
//!
//! ```rust
//! use piperoute::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Routes: {}", config.routes_file.display());
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::router::DEFAULT_SLOW_MATCH;

/// Default route file location
pub const DEFAULT_ROUTES_FILE: &str = "config/routes.yaml";

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Route file path
    pub routes_file: PathBuf,
    /// Slow lookup threshold
    pub slow_match: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            routes_file: PathBuf::from(DEFAULT_ROUTES_FILE),
            slow_match: DEFAULT_SLOW_MATCH,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let routes_file = lookup("PIPEROUTE_ROUTES_FILE")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.routes_file);
        let slow_match = lookup("PIPEROUTE_SLOW_MATCH_US")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_micros)
            .unwrap_or(defaults.slow_match);
        RuntimeConfig {
            routes_file,
            slow_match,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::from_lookup(|_| None);
        assert_eq!(config.routes_file, PathBuf::from("config/routes.yaml"));
        assert_eq!(config.slow_match, Duration::from_millis(1));
    }

    #[test]
    fn test_overrides() {
        let config = RuntimeConfig::from_lookup(|k| match k {
            "PIPEROUTE_ROUTES_FILE" => Some("/etc/app/routes.json".to_string()),
            "PIPEROUTE_SLOW_MATCH_US" => Some("250".to_string()),
            _ => None,
        });
        assert_eq!(config.routes_file, PathBuf::from("/etc/app/routes.json"));
        assert_eq!(config.slow_match, Duration::from_micros(250));
    }

    #[test]
    fn test_invalid_threshold_falls_back() {
        let config = RuntimeConfig::from_lookup(|k| match k {
            "PIPEROUTE_SLOW_MATCH_US" => Some("fast".to_string()),
            "PIPEROUTE_ROUTES_FILE" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.slow_match, DEFAULT_SLOW_MATCH);
        assert_eq!(config.routes_file, PathBuf::from(DEFAULT_ROUTES_FILE));
    }
}
