//! # In-Memory Document Store
//!
//! Keeps every committed revision so `get_at` can serve history. A commit
//! happens entirely under the write lock, so a save is all-or-nothing.

use std::collections::HashMap;
use std::sync::RwLock;

use super::backend::{check_expected, next_revision, DocumentStore};
use super::document::Document;
use super::errors::{StoreError, StoreResult};
use crate::observability::{log_event_with_fields, Event};
use crate::revision::RevisionId;

/// In-memory store, revision history per document id
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed revisions of `id`
    pub fn revision_count(&self, id: &str) -> usize {
        self.documents
            .read()
            .map(|docs| docs.get(id).map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, id: &str) -> StoreResult<Document> {
        let documents = self
            .documents
            .read()
            .map_err(|_| StoreError::Internal("Lock poisoned".into()))?;
        documents
            .get(id)
            .and_then(|history| history.last())
            .cloned()
            .ok_or_else(|| StoreError::DocumentNotFound(id.to_string()))
    }

    fn get_at(&self, id: &str, rev: &RevisionId) -> StoreResult<Document> {
        let documents = self
            .documents
            .read()
            .map_err(|_| StoreError::Internal("Lock poisoned".into()))?;
        let history = documents
            .get(id)
            .ok_or_else(|| StoreError::DocumentNotFound(id.to_string()))?;
        history
            .iter()
            .find(|doc| doc.rev() == Some(rev))
            .cloned()
            .ok_or_else(|| StoreError::RevisionNotFound {
                id: id.to_string(),
                rev: rev.to_string(),
            })
    }

    fn save(&self, doc: &Document) -> StoreResult<RevisionId> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| StoreError::Internal("Lock poisoned".into()))?;

        let head = documents
            .get(doc.id())
            .and_then(|history| history.last())
            .and_then(Document::rev);
        let ordinal = check_expected(doc.id(), head, doc.rev())?;

        let rev = next_revision(doc, ordinal + 1)?;
        let mut committed = doc.clone();
        committed.set_rev(Some(rev.clone()));
        documents
            .entry(doc.id().to_string())
            .or_default()
            .push(committed);

        log_event_with_fields(
            Event::StoreWrite,
            &[("doc_id", doc.id()), ("rev", rev.as_str()), ("store", "memory")],
        );
        Ok(rev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_then_get() {
        let store = MemoryStore::new();
        let mut doc = Document::with_id("d");
        doc.set("title", "one").unwrap();

        let rev = store.save(&doc).unwrap();
        assert_eq!(rev.ordinal().unwrap(), 1);

        let fetched = store.get("d").unwrap();
        assert_eq!(fetched.rev(), Some(&rev));
        assert_eq!(fetched.get("title").unwrap(), "one");
    }

    #[test]
    fn test_update_increments_ordinal() {
        let store = MemoryStore::new();
        let mut doc = Document::with_id("d");
        let rev1 = store.save(&doc).unwrap();
        doc.set_rev(Some(rev1.clone()));
        doc.set("title", "two").unwrap();
        let rev2 = store.save(&doc).unwrap();

        assert_eq!(rev2.ordinal().unwrap(), 2);
        assert_eq!(store.revision_count("d"), 2);
        assert!(store.get_at("d", &rev1).unwrap().get("title").is_none());
    }

    #[test]
    fn test_stale_save_conflicts_and_changes_nothing() {
        let store = MemoryStore::new();
        let mut doc = Document::with_id("d");
        let rev1 = store.save(&doc).unwrap();
        doc.set_rev(Some(rev1));
        store.save(&doc).unwrap();

        // `doc` still carries rev 1
        let err = store.save(&doc).unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.revision_count("d"), 2);
    }

    #[test]
    fn test_duplicate_create_conflicts() {
        let store = MemoryStore::new();
        store.save(&Document::with_id("d")).unwrap();
        assert!(store.save(&Document::with_id("d")).unwrap_err().is_conflict());
    }

    #[test]
    fn test_missing_document() {
        let store = MemoryStore::new();
        assert!(matches!(store.get("nope"), Err(StoreError::DocumentNotFound(_))));
        assert!(matches!(
            store.get_at("nope", &RevisionId::new(1, "a")),
            Err(StoreError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn test_read_attachment() {
        let store = MemoryStore::new();
        let mut doc = Document::with_id("d");
        doc.create_attachment("a.txt", "text/plain", b"bytes".to_vec()).unwrap();
        store.save(&doc).unwrap();

        assert_eq!(store.read_attachment("d", "a.txt").unwrap(), b"bytes");
        assert!(matches!(
            store.read_attachment("d", "b.txt"),
            Err(StoreError::AttachmentNotFound(_))
        ));
    }
}
