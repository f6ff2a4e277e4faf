//! # Versioning Errors
//!
//! Every engine operation returns [`VersioningResult`]. Store failures are
//! wrapped, except optimistic-concurrency rejections which surface as
//! [`VersioningError::Conflict`] so callers can match on them directly.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for versioning operations
pub type VersioningResult<T> = Result<T, VersioningError>;

/// Versioning engine errors
#[derive(Debug, Clone, Error)]
pub enum VersioningError {
    /// Both an allow-list and a deny-list were configured, or a matcher is invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Reference is neither an integer nor a recognizable revision
    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    /// Target lies outside `[1, current_version]`
    #[error("The requested version does not exist: {0}")]
    VersionNotFound(i64),

    /// Empty ledger or out-of-range milestone index
    #[error("Unknown milestone: {0}")]
    MilestoneNotFound(String),

    /// Store rejected a write against a stale base revision
    #[error("Conflict on document {id}: expected revision {expected}, found {actual}")]
    Conflict {
        id: String,
        expected: String,
        actual: String,
    },

    /// Snapshot payload is corrupt or undecodable
    #[error("Attachment codec error: {0}")]
    AttachmentCodec(String),

    /// Any other store failure
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl VersioningError {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            VersioningError::Configuration(_) => "MEMORIES_CONFIGURATION",
            VersioningError::InvalidVersion(_) => "MEMORIES_INVALID_VERSION",
            VersioningError::VersionNotFound(_) => "MEMORIES_VERSION_NOT_FOUND",
            VersioningError::MilestoneNotFound(_) => "MEMORIES_MILESTONE_NOT_FOUND",
            VersioningError::Conflict { .. } => "MEMORIES_CONFLICT",
            VersioningError::AttachmentCodec(_) => "MEMORIES_ATTACHMENT_CODEC",
            VersioningError::Store(_) => "MEMORIES_STORE",
        }
    }

    /// Codec failures mean history itself is unreadable
    pub fn is_fatal(&self) -> bool {
        matches!(self, VersioningError::AttachmentCodec(_))
    }

    /// True for optimistic-concurrency rejections
    pub fn is_conflict(&self) -> bool {
        matches!(self, VersioningError::Conflict { .. })
    }
}

impl From<StoreError> for VersioningError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict {
                id,
                expected,
                actual,
            } => VersioningError::Conflict {
                id,
                expected,
                actual,
            },
            other => VersioningError::Store(other),
        }
    }
}
