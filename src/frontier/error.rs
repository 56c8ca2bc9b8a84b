//! Error types for the frontier module

use thiserror::Error;

/// Result type for frontier operations
pub type FrontierResult<T> = Result<T, FrontierError>;

/// Why an entry could not be admitted to the ready scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inadmissible {
    /// No path-query is pending
    Empty,

    /// The host address has not been resolved yet
    Unresolved,

    /// The entry is already waiting in the scheduler
    AlreadyScheduled,

    /// The entry was retired from the registry
    Retired,
}

impl std::fmt::Display for Inadmissible {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::Empty => "no pending path-query",
            Self::Unresolved => "address not resolved",
            Self::AlreadyScheduled => "already scheduled",
            Self::Retired => "retired",
        };
        f.write_str(reason)
    }
}

/// Frontier-specific errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrontierError {
    /// URL cannot be split into authority and path-query
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The host queue is at its bound
    #[error("Queue for '{authority}' is full ({limit} path-queries)")]
    CapacityExceeded { authority: String, limit: usize },

    /// Dequeue on an entry with nothing pending
    #[error("No pending path-query for '{authority}'")]
    EmptyQueue { authority: String },

    /// Submission that breaks the scheduler admission rule
    #[error("Entry '{authority}' cannot be scheduled: {reason}")]
    NotAdmissible {
        authority: String,
        reason: Inadmissible,
    },

    /// Outcome reported for a host no consumer is holding
    #[error("Host '{authority}' is not being fetched")]
    NotInFlight { authority: String },

    /// Authority is not tracked by the registry
    #[error("Unknown host '{authority}'")]
    UnknownHost { authority: String },

    /// Retirement requested while the host still has work or is scheduled
    #[error("Host '{authority}' is still in rotation")]
    HostBusy { authority: String },

    /// The scheduler was shut down while waiting
    #[error("Frontier shut down")]
    Cancelled,
}

impl FrontierError {
    /// Create an invalid URL error
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a not-admissible error
    pub fn not_admissible(authority: impl Into<String>, reason: Inadmissible) -> Self {
        Self::NotAdmissible {
            authority: authority.into(),
            reason,
        }
    }

    /// Check if the caller may retry the operation later
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::CapacityExceeded { .. } | Self::HostBusy { .. })
    }

    /// Check if the error points at a bug in the calling crawler logic
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::EmptyQueue { .. } | Self::NotAdmissible { .. } | Self::NotInFlight { .. }
        )
    }
}
