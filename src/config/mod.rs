//! Configuration management for the frontier crawler
//!
//! This module handles loading and validating configuration from environment variables,
//! files, and command-line arguments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Frontier configuration
    pub frontier: FrontierConfig,

    /// Politeness delays and backoff
    pub politeness: PolitenessConfig,

    /// Fetch workers
    pub fetch: FetchConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Frontier-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontierConfig {
    /// Maximum pending path-queries per host
    pub path_query_limit: usize,

    /// DNS lookup timeout in milliseconds
    pub dns_timeout_ms: u64,
}

/// Politeness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolitenessConfig {
    /// Minimum delay between fetches of one host
    pub min_delay_ms: u64,

    /// Maximum delay after a successful fetch
    pub max_delay_ms: u64,

    /// Delay after success as a multiple of fetch latency
    pub latency_factor: f64,

    /// Delay after the first failure
    pub backoff_base_ms: u64,

    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,

    /// Cap on the failure delay
    pub max_backoff_ms: u64,

    /// Failures tolerated per path-query before it is dropped
    pub max_retries: u32,

    /// Random extra delay as a fraction of the computed delay
    pub jitter: f64,
}

/// Fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Number of concurrent fetch workers
    pub workers: usize,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// User agent string
    pub user_agent: String,

    /// Global rate limit across all hosts (requests per second)
    pub requests_per_second: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            path_query_limit: crate::frontier::DEFAULT_PATH_QUERY_LIMIT,
            dns_timeout_ms: 5000,
        }
    }
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1000,
            max_delay_ms: 30_000,
            latency_factor: 10.0,
            backoff_base_ms: 5000,
            backoff_multiplier: 2.0,
            max_backoff_ms: 600_000,
            max_retries: 3,
            jitter: 0.0,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            request_timeout_secs: 30,
            user_agent: format!("baram-frontier/{}", env!("CARGO_PKG_VERSION")),
            requests_per_second: 20,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let frontier = FrontierConfig {
            path_query_limit: env_parse("FRONTIER_PATH_QUERY_LIMIT")
                .unwrap_or(defaults.frontier.path_query_limit),
            dns_timeout_ms: env_parse("FRONTIER_DNS_TIMEOUT_MS")
                .unwrap_or(defaults.frontier.dns_timeout_ms),
        };

        let p = defaults.politeness;
        let politeness = PolitenessConfig {
            min_delay_ms: env_parse("FRONTIER_MIN_DELAY_MS").unwrap_or(p.min_delay_ms),
            max_delay_ms: env_parse("FRONTIER_MAX_DELAY_MS").unwrap_or(p.max_delay_ms),
            latency_factor: env_parse("FRONTIER_LATENCY_FACTOR").unwrap_or(p.latency_factor),
            backoff_base_ms: env_parse("FRONTIER_BACKOFF_BASE_MS").unwrap_or(p.backoff_base_ms),
            backoff_multiplier: env_parse("FRONTIER_BACKOFF_MULTIPLIER")
                .unwrap_or(p.backoff_multiplier),
            max_backoff_ms: env_parse("FRONTIER_MAX_BACKOFF_MS").unwrap_or(p.max_backoff_ms),
            max_retries: env_parse("FRONTIER_MAX_RETRIES").unwrap_or(p.max_retries),
            jitter: env_parse("FRONTIER_JITTER").unwrap_or(p.jitter),
        };

        let fetch = FetchConfig {
            workers: env_parse("FRONTIER_WORKERS").unwrap_or(defaults.fetch.workers),
            request_timeout_secs: env_parse("FRONTIER_REQUEST_TIMEOUT")
                .unwrap_or(defaults.fetch.request_timeout_secs),
            user_agent: std::env::var("FRONTIER_USER_AGENT")
                .unwrap_or(defaults.fetch.user_agent),
            requests_per_second: env_parse("FRONTIER_REQUESTS_PER_SECOND")
                .unwrap_or(defaults.fetch.requests_per_second),
        };

        let logging = LoggingConfig {
            level: std::env::var("FRONTIER_LOG_LEVEL").unwrap_or(defaults.logging.level),
            format: std::env::var("FRONTIER_LOG_FORMAT").unwrap_or(defaults.logging.format),
        };

        Ok(Self {
            frontier,
            politeness,
            fetch,
            logging,
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.frontier.path_query_limit == 0 {
            anyhow::bail!("path_query_limit must be greater than 0");
        }

        if self.politeness.min_delay_ms > self.politeness.max_delay_ms {
            anyhow::bail!("min_delay_ms must not exceed max_delay_ms");
        }

        if self.politeness.latency_factor < 0.0 {
            anyhow::bail!("latency_factor must not be negative");
        }

        if self.politeness.backoff_multiplier < 1.0 {
            anyhow::bail!("backoff_multiplier must be at least 1.0");
        }

        if !(0.0..=1.0).contains(&self.politeness.jitter) {
            anyhow::bail!("jitter must be between 0.0 and 1.0");
        }

        if self.fetch.workers == 0 {
            anyhow::bail!("workers must be greater than 0");
        }

        if self.fetch.requests_per_second == 0 {
            anyhow::bail!("requests_per_second must be greater than 0");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("log format must be 'text' or 'json'");
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.request_timeout_secs)
    }

    /// Get DNS timeout as Duration
    #[must_use]
    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.frontier.dns_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frontier.path_query_limit, 1000);
    }

    #[test]
    fn test_invalid_workers() {
        let mut config = Config::default();
        config.fetch.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_delay_bounds() {
        let mut config = Config::default();
        config.politeness.min_delay_ms = 10_000;
        config.politeness.max_delay_ms = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = String::from("xml");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_conversion() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.dns_timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [frontier]
            path_query_limit = 50

            [politeness]
            min_delay_ms = 200
            "#,
        )
        .unwrap();

        assert_eq!(config.frontier.path_query_limit, 50);
        assert_eq!(config.frontier.dns_timeout_ms, 5000);
        assert_eq!(config.politeness.min_delay_ms, 200);
        assert_eq!(config.politeness.max_retries, 3);
        assert_eq!(config.fetch.workers, 8);
    }
}
