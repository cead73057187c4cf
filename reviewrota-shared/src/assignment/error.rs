/// Domain errors for reviewer assignment
///
/// Every failure a caller can branch on is a distinct variant, and every
/// variant maps to a stable [`ErrorCode`] string so HTTP consumers never
/// need to parse messages. Storage failures that are not otherwise
/// classified are wrapped with the operation and entity they hit.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;

use crate::storage::StoreError;

/// Stable, transport-independent error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    TeamExists,
    PrExists,
    PrMerged,
    NotAssigned,
    NoCandidate,
    NotFound,
    ConcurrentUpdate,
    Timeout,
    Cancelled,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::TeamExists => "TEAM_EXISTS",
            ErrorCode::PrExists => "PR_EXISTS",
            ErrorCode::PrMerged => "PR_MERGED",
            ErrorCode::NotAssigned => "NOT_ASSIGNED",
            ErrorCode::NoCandidate => "NO_CANDIDATE",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ConcurrentUpdate => "CONCURRENT_UPDATE",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain error types
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// Team name collision
    #[error("team_name already exists: {0}")]
    TeamExists(String),

    /// Pull request ID collision
    #[error("PR id already exists: {0}")]
    PrExists(String),

    /// Reassignment attempted after merge
    #[error("cannot reassign on merged PR: {0}")]
    PrMerged(String),

    /// Old reviewer is not on the pull request
    #[error("reviewer {user_id} is not assigned to PR {pull_request_id}")]
    NotAssigned {
        pull_request_id: String,
        user_id: String,
    },

    /// No eligible replacement reviewer
    #[error("no active replacement candidate in team for PR {0}")]
    NoCandidate(String),

    #[error("PR not found: {0}")]
    PrNotFound(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("team not found: {0}")]
    TeamNotFound(String),

    /// Conditional writes kept losing against concurrent writers
    #[error("PR {0} was modified concurrently, retry the request")]
    ConcurrentUpdate(String),

    /// A storage round-trip or the whole request exceeded its deadline
    #[error("{0} timed out")]
    Timeout(&'static str),

    /// The operation was cancelled before it completed
    #[error("operation cancelled")]
    Cancelled,

    /// Unclassified storage failure
    #[error("storage failure during {operation} ({entity_id}): {source}")]
    Storage {
        operation: &'static str,
        entity_id: String,
        #[source]
        source: StoreError,
    },
}

/// Domain result type alias
pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Wraps a storage error with the operation and entity it concerns
    ///
    /// Timeouts and cancellation keep their own variants; anything else is
    /// logged here with the entity ID and becomes `Storage`.
    pub fn storage(operation: &'static str, entity_id: &str, source: StoreError) -> Self {
        match source {
            StoreError::TimedOut => DomainError::Timeout(operation),
            StoreError::Cancelled => DomainError::Cancelled,
            source => {
                error!(operation, entity_id, error = %source, "Storage failure");
                DomainError::Storage {
                    operation,
                    entity_id: entity_id.to_string(),
                    source,
                }
            }
        }
    }

    /// Stable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            DomainError::TeamExists(_) => ErrorCode::TeamExists,
            DomainError::PrExists(_) => ErrorCode::PrExists,
            DomainError::PrMerged(_) => ErrorCode::PrMerged,
            DomainError::NotAssigned { .. } => ErrorCode::NotAssigned,
            DomainError::NoCandidate(_) => ErrorCode::NoCandidate,
            DomainError::PrNotFound(_)
            | DomainError::UserNotFound(_)
            | DomainError::TeamNotFound(_) => ErrorCode::NotFound,
            DomainError::ConcurrentUpdate(_) => ErrorCode::ConcurrentUpdate,
            DomainError::Timeout(_) => ErrorCode::Timeout,
            DomainError::Cancelled => ErrorCode::Cancelled,
            DomainError::Storage { .. } => ErrorCode::Internal,
        }
    }
}

/// Attaches operation context to storage results
pub(crate) trait StoreResultExt<T> {
    fn context(self, operation: &'static str, entity_id: &str) -> DomainResult<T>;
}

impl<T> StoreResultExt<T> for Result<T, StoreError> {
    fn context(self, operation: &'static str, entity_id: &str) -> DomainResult<T> {
        self.map_err(|e| DomainError::storage(operation, entity_id, e))
    }
}
