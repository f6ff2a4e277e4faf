//! Revert engine
//!
//! A revert resolves its target to a version number, decodes that version's
//! snapshot, reconciles attachments and overwrites the snapshot's properties
//! in memory. A soft revert stops there and leaves a logical version on the
//! instance. A hard revert then saves, which writes a *new* revision; old
//! revisions are never resurrected.

use crate::errors::{VersioningError, VersioningResult};
use crate::observability::{log_event_with_fields, Event};
use crate::revision::VersionRef;
use crate::snapshot::Snapshot;
use crate::store::{Attachment, DOCUMENT_KEYS};

use super::{LogicalState, VersionedDocument};

/// Whether a revert is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertMode {
    /// In memory only
    Soft,
    /// In memory, then saved as a new revision
    Hard,
}

impl RevertMode {
    fn as_str(&self) -> &'static str {
        match self {
            RevertMode::Soft => "soft",
            RevertMode::Hard => "hard",
        }
    }
}

impl VersionedDocument {
    /// Revert to a version number or revision.
    ///
    /// Reverting to the current version is a no-op in both modes: nothing
    /// is touched and nothing is written.
    pub fn revert(
        &mut self,
        target: impl Into<VersionRef>,
        mode: RevertMode,
    ) -> VersioningResult<&mut Self> {
        let requested = target.into().resolve()?;
        let current = self.current_version();
        let version = u64::try_from(requested)
            .ok()
            .filter(|v| (1..=current).contains(v))
            .ok_or(VersioningError::VersionNotFound(requested))?;

        if version == current {
            return Ok(self);
        }

        let name = self
            .version_id(version)
            .ok_or(VersioningError::VersionNotFound(requested))?;
        let snapshot = self.load_snapshot(&name)?;

        self.reconcile_attachments(&snapshot)?;
        let properties = self.doc.properties_mut();
        for (key, value) in &snapshot.properties {
            if !DOCUMENT_KEYS.contains(&key.as_str()) {
                properties.insert(key.clone(), value.clone());
            }
        }

        self.logical = Some(LogicalState {
            version,
            revision: name.clone(),
        });

        let version_field = version.to_string();
        log_event_with_fields(
            Event::RevertApplied,
            &[
                ("doc_id", self.doc.id()),
                ("mode", mode.as_str()),
                ("snapshot", name.as_str()),
                ("version", version_field.as_str()),
            ],
        );

        if mode == RevertMode::Hard {
            let rev = self.commit(snapshot.timestamp().is_some())?;
            log_event_with_fields(
                Event::RevertPersisted,
                &[
                    ("doc_id", self.doc.id()),
                    ("rev", rev.as_str()),
                    ("version", version_field.as_str()),
                ],
            );
        }
        Ok(self)
    }

    /// Soft revert
    pub fn revert_to(&mut self, target: impl Into<VersionRef>) -> VersioningResult<&mut Self> {
        self.revert(target, RevertMode::Soft)
    }

    /// Hard revert
    pub fn revert_to_and_save(
        &mut self,
        target: impl Into<VersionRef>,
    ) -> VersioningResult<&mut Self> {
        self.revert(target, RevertMode::Hard)
    }

    /// Soft revert to the previous version
    pub fn rollback(&mut self) -> VersioningResult<&mut Self> {
        let previous = self.previous_version();
        self.revert(previous, RevertMode::Soft)
    }

    /// Hard revert to the previous version
    pub fn rollback_and_save(&mut self) -> VersioningResult<&mut Self> {
        let previous = self.previous_version();
        self.revert(previous, RevertMode::Hard)
    }

    fn load_snapshot(&self, name: &str) -> VersioningResult<Snapshot> {
        let attachment = self
            .doc
            .attachment(name)
            .ok_or_else(|| VersioningError::AttachmentCodec(format!("missing snapshot {}", name)))?;
        Snapshot::decode(&attachment.data).map_err(|e| {
            let reason = e.to_string();
            log_event_with_fields(
                Event::SnapshotCorrupt,
                &[
                    ("doc_id", self.doc.id()),
                    ("reason", reason.as_str()),
                    ("snapshot", name),
                ],
            );
            e
        })
    }

    /// Restore remembered attachments and drop versioned ones the snapshot
    /// did not know about. Every payload is decoded before anything changes.
    fn reconcile_attachments(&mut self, snapshot: &Snapshot) -> VersioningResult<()> {
        let Some(memories) = &snapshot.attachment_memories else {
            return Ok(());
        };

        let restored = memories
            .versioned_attachments
            .iter()
            .map(|(name, remembered)| {
                let data = remembered.decode().map_err(|e| {
                    VersioningError::AttachmentCodec(format!("attachment {}: {}", name, e))
                })?;
                Ok((name.clone(), Attachment::new(remembered.content_type.clone(), data)))
            })
            .collect::<VersioningResult<Vec<_>>>()?;

        for (name, attachment) in restored {
            self.doc.put_attachment(&name, attachment);
        }

        let policy = self.doc_type.policy();
        let unknown: Vec<String> = self
            .doc
            .user_attachment_names()
            .into_iter()
            .filter(|name| !memories.knows(name) && policy.is_attachment_versioned(name))
            .collect();
        for name in unknown {
            self.doc.remove_attachment(&name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::policy::{DocumentType, Policy, PolicyBuilder};
    use crate::store::{DocumentStore, MemoryStore};

    fn book(policy: Policy) -> VersionedDocument {
        let doc_type = DocumentType::register("Book", policy);
        VersionedDocument::with_id(&doc_type, Arc::new(MemoryStore::new()), "book")
    }

    fn book_with_titles(titles: &[&str]) -> VersionedDocument {
        let mut doc = book(Policy::default());
        for title in titles {
            doc.set("title", *title).unwrap();
            doc.save().unwrap();
        }
        doc
    }

    #[test]
    fn test_soft_revert_sets_logical_state() {
        let mut doc = book_with_titles(&["v1", "v2", "v3"]);
        doc.revert_to(1).unwrap();

        assert_eq!(doc.get_str("title"), Some("v1"));
        assert_eq!(doc.current_version(), 3);
        assert_eq!(doc.logical_version_number(), 1);
        assert_eq!(doc.logical_revision(), doc.version_id(1));
        assert_eq!(doc.store().get("book").unwrap().get("title").unwrap(), "v3");
    }

    #[test]
    fn test_hard_revert_creates_new_revision() {
        let mut doc = book_with_titles(&["v1", "v2", "v3"]);
        doc.revert_to_and_save(1).unwrap();

        assert_eq!(doc.current_version(), 4);
        assert_eq!(doc.get_str("title"), Some("v1"));
        assert_eq!(doc.logical_version_number(), 4);
        assert_eq!(doc.store().get("book").unwrap().get("title").unwrap(), "v1");
        // the state that was replaced is itself history now
        assert!(doc.version_id(3).is_some());
    }

    #[test]
    fn test_revert_to_current_is_noop_even_when_hard() {
        let mut doc = book_with_titles(&["v1", "v2"]);
        let rev = doc.rev().cloned();
        doc.set("title", "unsaved").unwrap();

        doc.revert_to_and_save(2).unwrap();
        assert_eq!(doc.rev().cloned(), rev);
        assert_eq!(doc.get_str("title"), Some("unsaved"));
        assert_eq!(doc.logical_version_number(), 2);
    }

    #[test]
    fn test_out_of_range_targets() {
        let mut doc = book_with_titles(&["v1", "v2"]);
        for target in [0i64, -1, 3, 100] {
            assert!(matches!(
                doc.revert_to(target),
                Err(VersioningError::VersionNotFound(_))
            ));
        }
    }

    #[test]
    fn test_invalid_targets() {
        let mut doc = book_with_titles(&["v1", "v2"]);
        assert!(matches!(
            doc.revert_to("latest"),
            Err(VersioningError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_revert_by_revision_string() {
        let mut doc = book_with_titles(&["v1", "v2", "v3"]);
        let name = doc.version_id(2).unwrap();
        doc.revert_to(name.as_str()).unwrap();
        assert_eq!(doc.get_str("title"), Some("v2"));

        let bare = name.trim_start_matches("rev-").to_string();
        doc.revert_to(bare).unwrap();
        assert_eq!(doc.get_str("title"), Some("v2"));

        doc.revert_to("1").unwrap();
        assert_eq!(doc.get_str("title"), Some("v1"));
    }

    #[test]
    fn test_properties_missing_from_snapshot_are_kept() {
        let policy = PolicyBuilder::new().remember(["title"]).unwrap().build();
        let mut doc = book(policy);
        doc.set("title", "v1").unwrap();
        doc.set("author", "a1").unwrap();
        doc.save().unwrap();
        doc.set("title", "v2").unwrap();
        doc.set("author", "a2").unwrap();
        doc.save().unwrap();

        doc.revert_to(1).unwrap();
        assert_eq!(doc.get_str("title"), Some("v1"));
        assert_eq!(doc.get_str("author"), Some("a2"));
    }

    #[test]
    fn test_rollback() {
        let mut doc = book_with_titles(&["v1", "v2", "v3"]);
        doc.rollback().unwrap();
        assert_eq!(doc.get_str("title"), Some("v2"));
        assert_eq!(doc.current_version(), 3);

        doc.rollback_and_save().unwrap();
        assert_eq!(doc.get_str("title"), Some("v2"));
        assert_eq!(doc.current_version(), 4);
    }

    #[test]
    fn test_rollback_at_first_version_fails() {
        let mut doc = book_with_titles(&["v1"]);
        assert!(matches!(
            doc.rollback(),
            Err(VersioningError::VersionNotFound(0))
        ));
    }

    #[test]
    fn test_hard_revert_restores_timestamp_verbatim() {
        let mut doc = book(PolicyBuilder::new().timestamps(true).build());
        doc.save().unwrap();
        let first_stamp = doc.get_str("updated_at").unwrap().to_string();
        doc.set("title", "later").unwrap();
        doc.save().unwrap();

        doc.revert_to_and_save(1).unwrap();
        assert_eq!(doc.get_str("updated_at"), Some(first_stamp.as_str()));
        assert_eq!(
            doc.store().get("book").unwrap().get("updated_at").unwrap(),
            first_stamp.as_str()
        );
    }

    #[test]
    fn test_corrupt_snapshot_is_fatal() {
        let mut doc = book_with_titles(&["v1", "v2"]);
        let name = doc.version_id(1).unwrap();
        doc.doc
            .put_attachment(&name, Attachment::new("application/json", b"{broken".to_vec()));

        let err = doc.revert_to(1).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(doc.get_str("title"), Some("v2"));
        assert_eq!(doc.logical_version_number(), 2);
    }
}
