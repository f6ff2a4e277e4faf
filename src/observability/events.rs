//! Observable versioning events
//!
//! Events are explicit and typed.

use std::fmt;

use super::Severity;

/// Observable events in the versioning engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// A document type was registered with its policy
    PolicyConfigured,

    // Write path
    /// Snapshot of the prior persisted state staged for commit
    SnapshotCaptured,
    /// A versioned attachment could not be read during capture and was left out
    SnapshotAttachmentSkipped,
    /// Document committed by the store
    DocumentSaved,
    /// Store rejected the commit against a stale revision
    SaveConflict,
    /// A store backend wrote a record
    StoreWrite,

    // Revert path
    /// Past state applied in memory
    RevertApplied,
    /// Reverted state persisted as a new revision
    RevertPersisted,
    /// Snapshot payload could not be decoded
    SnapshotCorrupt,

    // Milestones
    /// Milestone appended to the ledger
    MilestoneTagged,
}

impl Event {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::PolicyConfigured => "POLICY_CONFIGURED",
            Event::SnapshotCaptured => "SNAPSHOT_CAPTURED",
            Event::SnapshotAttachmentSkipped => "SNAPSHOT_ATTACHMENT_SKIPPED",
            Event::DocumentSaved => "DOCUMENT_SAVED",
            Event::SaveConflict => "SAVE_CONFLICT",
            Event::StoreWrite => "STORE_WRITE",
            Event::RevertApplied => "REVERT_APPLIED",
            Event::RevertPersisted => "REVERT_PERSISTED",
            Event::SnapshotCorrupt => "SNAPSHOT_CORRUPT",
            Event::MilestoneTagged => "MILESTONE_TAGGED",
        }
    }

    /// Default severity for this event
    pub fn severity(&self) -> Severity {
        match self {
            Event::StoreWrite => Severity::Trace,
            Event::SnapshotAttachmentSkipped => Severity::Warn,
            Event::SaveConflict => Severity::Error,
            Event::SnapshotCorrupt => Severity::Fatal,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
