//! # Document Store Errors

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Document store errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    // Document errors
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Revision {rev} of document {id} not found")]
    RevisionNotFound { id: String, rev: String },

    #[error("Invalid document id: {0}")]
    InvalidId(String),

    #[error("Reserved property name: {0}")]
    ReservedProperty(String),

    // Attachment errors
    #[error("Attachment not found: {0}")]
    AttachmentNotFound(String),

    #[error("Attachment already exists: {0}")]
    AttachmentExists(String),

    // Concurrency
    #[error("Conflict on document {id}: expected revision {expected}, found {actual}")]
    Conflict {
        id: String,
        expected: String,
        actual: String,
    },

    // Integrity
    #[error("Corrupted record: {0}")]
    Corrupted(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    IoError(String),

    // Internal
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// True when retrying the same write cannot succeed without a reload
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    pub(crate) fn conflict(id: &str, expected: Option<&str>, actual: Option<&str>) -> Self {
        StoreError::Conflict {
            id: id.to_string(),
            expected: expected.unwrap_or("<none>").to_string(),
            actual: actual.unwrap_or("<none>").to_string(),
        }
    }
}
