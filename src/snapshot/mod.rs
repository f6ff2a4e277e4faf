//! # Snapshots
//!
//! Immutable prior-state records, stored as attachments named
//! `rev-<revision>` on the document they belong to.
//!
//! - `codec`: the snapshot blob format
//! - `capture`: the commit hooks that write a snapshot on every save
//!
//! Snapshots are write-once. Nothing in this crate updates or deletes one.

pub mod capture;
mod codec;

pub use capture::{after_commit, before_commit, StagedSnapshot};
pub use codec::{
    AttachmentMemories, RememberedAttachment, Snapshot, SNAPSHOT_CONTENT_TYPE, TIMESTAMP_PROPERTY,
};
