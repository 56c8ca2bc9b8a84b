//! Error types for the frontier collaborators
//!
//! These cover the work done around the frontier: resolving host addresses
//! and fetching pages. The frontier itself never interprets them; consumers
//! turn them into a recorded failure on the host entry.

use thiserror::Error;

/// Errors that can occur during HTTP fetching operations
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Server error with status code
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Client error with status code
    #[error("Client error: {0}")]
    ClientError(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Check if retrying the same path-query later may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::RateLimit | Self::ServerError(_) | Self::Timeout => true,
            Self::ClientError(status) => *status == 408,
            Self::InvalidUrl(_) => false,
        }
    }

    /// Classify an HTTP status code, `None` for success
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=399 => None,
            429 => Some(Self::RateLimit),
            400..=499 => Some(Self::ClientError(status)),
            _ => Some(Self::ServerError(status)),
        }
    }
}

/// Errors that can occur while resolving a host address
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The system resolver returned an error
    #[error("DNS lookup for '{host}' failed: {reason}")]
    LookupFailed { host: String, reason: String },

    /// Lookup succeeded without any address
    #[error("No address found for '{host}'")]
    NoAddress { host: String },

    /// Lookup did not finish in time
    #[error("DNS lookup for '{host}' timed out")]
    Timeout { host: String },
}

impl ResolveError {
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::NoAddress { .. })
    }
}
