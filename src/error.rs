//! Unified error handling for the baram-frontier crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while maintaining the ability to use
//! domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`BaramErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use baram_frontier::error::{BaramErrorTrait, Error};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         println!("Retrying ({}): {}", err.category().description(), err);
//!     } else {
//!         eprintln!("Fatal error: {}", err);
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::frontier::error::FrontierError;
pub use crate::utils::error::{FetchError, ResolveError};

/// Common trait for all baram-frontier error types
pub trait BaramErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, DNS, timeout, rate limit)
    Network,
    /// Frontier contract and capacity errors
    Frontier,
    /// Storage and I/O errors
    Storage,
}

impl ErrorCategory {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "network error",
            Self::Frontier => "frontier error",
            Self::Storage => "storage error",
        }
    }
}

/// Unified error type for the baram-frontier crate
#[derive(Error, Debug)]
pub enum Error {
    /// Frontier errors (capacity, contract violations, cancellation)
    #[error("Frontier error: {0}")]
    Frontier(#[from] FrontierError),

    /// Fetch-specific errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Host resolution errors
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Checkpoint written by an incompatible format version
    #[error("Unsupported checkpoint version {found} (expected {expected})")]
    UnsupportedCheckpoint { found: u32, expected: u32 },

    /// File operation that failed, with the path it was working on
    #[error("{context}")]
    Storage {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl BaramErrorTrait for FrontierError {
    fn is_recoverable(&self) -> bool {
        FrontierError::is_recoverable(self)
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Frontier
    }
}

impl BaramErrorTrait for FetchError {
    fn is_recoverable(&self) -> bool {
        FetchError::is_recoverable(self)
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Network
    }
}

impl BaramErrorTrait for ResolveError {
    fn is_recoverable(&self) -> bool {
        ResolveError::is_recoverable(self)
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Network
    }
}

impl BaramErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Frontier(e) => e.is_recoverable(),
            Self::Fetch(e) => e.is_recoverable(),
            Self::Resolve(e) => e.is_recoverable(),
            Self::Io(_) => true, // I/O errors are often transient
            Self::Json(_) => false,
            Self::Storage { .. } => true,
            Self::UnsupportedCheckpoint { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Frontier(_) => ErrorCategory::Frontier,
            Self::Fetch(_) | Self::Resolve(_) => ErrorCategory::Network,
            Self::Io(_)
            | Self::Json(_)
            | Self::Storage { .. }
            | Self::UnsupportedCheckpoint { .. } => ErrorCategory::Storage,
        }
    }
}

impl Error {
    /// Attach context to a failed file operation
    pub fn storage(context: impl Into<String>, source: io::Error) -> Self {
        Self::Storage {
            context: context.into(),
            source,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
