//! Snapshot capture: the commit hooks around every save
//!
//! `before_commit` snapshots the *persisted* head (fetched fresh, never the
//! pending in-memory edits) and stages it as attachment `rev-<head rev>` on
//! the document about to be saved, so the store commits the new state and
//! the snapshot in one write. `after_commit` adopts the new revision, or
//! unstages the snapshot when the store refused the write.

use crate::errors::VersioningResult;
use crate::observability::{log_event_with_fields, Event};
use crate::policy::Policy;
use crate::revision::{snapshot_name, RevisionId};
use crate::store::{Attachment, Document, DocumentStore, StoreError, StoreResult};

use super::codec::{AttachmentMemories, RememberedAttachment, Snapshot, SNAPSHOT_CONTENT_TYPE};

/// A snapshot attachment staged on a pending document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedSnapshot {
    name: String,
}

impl StagedSnapshot {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Build the snapshot of a persisted document.
///
/// An attachment that cannot be read is left out; capture carries on.
pub fn capture(
    store: &dyn DocumentStore,
    policy: &Policy,
    persisted: &Document,
) -> Snapshot {
    let mut snapshot = Snapshot::project(persisted, policy);
    if !policy.remembers_attachments() {
        return snapshot;
    }

    let known_attachments = persisted.user_attachment_names();
    let mut memories = AttachmentMemories {
        known_attachments: known_attachments.clone(),
        ..Default::default()
    };

    for name in known_attachments
        .iter()
        .filter(|name| policy.is_attachment_versioned(name))
    {
        let Some(stub) = persisted.attachment(name) else {
            continue;
        };
        match store.read_attachment(persisted.id(), name) {
            Ok(bytes) => {
                memories.versioned_attachments.insert(
                    name.clone(),
                    RememberedAttachment::encode(&stub.content_type, &bytes),
                );
            }
            Err(e) => {
                let reason = e.to_string();
                log_event_with_fields(
                    Event::SnapshotAttachmentSkipped,
                    &[
                        ("attachment", name.as_str()),
                        ("doc_id", persisted.id()),
                        ("reason", reason.as_str()),
                    ],
                );
            }
        }
    }

    snapshot.attachment_memories = Some(memories);
    snapshot
}

/// Stage the snapshot of the persisted head on `doc`.
///
/// Returns `None` for a document that has never been saved. Fails with a
/// conflict if `doc` is not based on the persisted head.
pub fn before_commit(
    store: &dyn DocumentStore,
    policy: &Policy,
    doc: &mut Document,
) -> VersioningResult<Option<StagedSnapshot>> {
    let Some(base) = doc.rev().cloned() else {
        return Ok(None);
    };

    let persisted = store.get(doc.id())?;
    if persisted.rev() != Some(&base) {
        return Err(StoreError::conflict(
            doc.id(),
            Some(base.as_str()),
            persisted.rev().map(RevisionId::as_str),
        )
        .into());
    }

    let snapshot = capture(store, policy, &persisted);
    let name = snapshot_name(&base);
    doc.put_attachment(&name, Attachment::new(SNAPSHOT_CONTENT_TYPE, snapshot.encode()?));

    log_event_with_fields(
        Event::SnapshotCaptured,
        &[("doc_id", doc.id()), ("snapshot", name.as_str())],
    );
    Ok(Some(StagedSnapshot { name }))
}

/// Settle a save: adopt the new revision or unstage the snapshot.
pub fn after_commit(
    doc: &mut Document,
    staged: Option<StagedSnapshot>,
    outcome: &StoreResult<RevisionId>,
) {
    match outcome {
        Ok(rev) => {
            doc.set_rev(Some(rev.clone()));
            log_event_with_fields(
                Event::DocumentSaved,
                &[("doc_id", doc.id()), ("rev", rev.as_str())],
            );
        }
        Err(e) => {
            if let Some(staged) = staged {
                doc.remove_attachment(staged.name());
            }
            if e.is_conflict() {
                let reason = e.to_string();
                log_event_with_fields(
                    Event::SaveConflict,
                    &[("doc_id", doc.id()), ("reason", reason.as_str())],
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyBuilder;
    use crate::store::MemoryStore;

    fn saved(store: &MemoryStore, mut doc: Document) -> Document {
        let rev = store.save(&doc).unwrap();
        doc.set_rev(Some(rev));
        doc
    }

    #[test]
    fn test_new_document_stages_nothing() {
        let store = MemoryStore::new();
        let mut doc = Document::with_id("d");
        let staged = before_commit(&store, &Policy::default(), &mut doc).unwrap();
        assert!(staged.is_none());
        assert!(doc.attachments().is_empty());
    }

    #[test]
    fn test_captures_persisted_not_pending_state() {
        let store = MemoryStore::new();
        let mut doc = Document::with_id("d");
        doc.set("title", "persisted").unwrap();
        let mut doc = saved(&store, doc);
        doc.set("title", "pending").unwrap();

        let staged = before_commit(&store, &Policy::default(), &mut doc)
            .unwrap()
            .unwrap();
        let rev = doc.rev().unwrap().clone();
        assert_eq!(staged.name(), snapshot_name(&rev));

        let bytes = &doc.attachment(staged.name()).unwrap().data;
        let snapshot = Snapshot::decode(bytes).unwrap();
        assert_eq!(snapshot.properties.get("title").unwrap(), "persisted");
    }

    #[test]
    fn test_stale_base_conflicts_before_staging() {
        let store = MemoryStore::new();
        let doc = saved(&store, Document::with_id("d"));
        let mut other = doc.clone();
        other.set("x", 1).unwrap();
        let rev = store.save(&other).unwrap();
        assert_eq!(rev.ordinal().unwrap(), 2);

        let mut stale = doc;
        let err = before_commit(&store, &Policy::default(), &mut stale).unwrap_err();
        assert!(err.is_conflict());
        assert!(stale.attachments().is_empty());
    }

    #[test]
    fn test_attachment_memories() {
        let store = MemoryStore::new();
        let mut doc = Document::with_id("d");
        doc.create_attachment("static/app.js", "application/js", b"var v = 1;".to_vec())
            .unwrap();
        doc.create_attachment("notes.txt", "text/plain", b"n".to_vec()).unwrap();
        let doc = saved(&store, doc);

        let policy = PolicyBuilder::new()
            .remember_attachments(vec![crate::policy::AttachmentMatcher::exact(
                "static/app.js",
            )])
            .build();
        let snapshot = capture(&store, &policy, &store.get(doc.id()).unwrap());
        let memories = snapshot.attachment_memories.unwrap();

        assert_eq!(memories.versioned_attachments.len(), 1);
        let js = &memories.versioned_attachments["static/app.js"];
        assert_eq!(js.content_type, "application/js");
        assert_eq!(js.decode().unwrap(), b"var v = 1;");
        assert!(memories.knows("notes.txt"));
        assert!(memories.knows("static/app.js"));
    }

    #[test]
    fn test_after_commit_failure_unstages() {
        let store = MemoryStore::new();
        let mut doc = saved(&store, Document::with_id("d"));
        let staged = before_commit(&store, &Policy::default(), &mut doc).unwrap();
        assert_eq!(doc.attachments().len(), 1);

        let outcome = Err(StoreError::conflict("d", Some("1-a"), Some("2-b")));
        after_commit(&mut doc, staged, &outcome);
        assert!(doc.attachments().is_empty());
    }

    #[test]
    fn test_after_commit_success_adopts_revision() {
        let mut doc = Document::with_id("d");
        let rev = RevisionId::new(1, "abc");
        after_commit(&mut doc, None, &Ok(rev.clone()));
        assert_eq!(doc.rev(), Some(&rev));
    }
}
