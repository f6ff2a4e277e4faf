//! # Document Store Trait

use sha2::{Digest, Sha256};

use super::document::Document;
use super::errors::{StoreError, StoreResult};
use crate::revision::RevisionId;

/// Length of the opaque revision suffix, in hex characters
const REVISION_SUFFIX_LEN: usize = 32;

/// Collaborator surface the versioning engine is written against.
///
/// `save` commits the whole document (properties, milestones and every
/// attachment) as one atomic write, conditioned on `doc.rev()` being the
/// stored head revision. A stale `rev` must fail with
/// [`StoreError::Conflict`] and leave the stored document untouched.
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Fetch the head revision
    fn get(&self, id: &str) -> StoreResult<Document>;

    /// Fetch a specific committed revision
    fn get_at(&self, id: &str, rev: &RevisionId) -> StoreResult<Document>;

    /// Commit a document, returning its new revision
    fn save(&self, doc: &Document) -> StoreResult<RevisionId>;

    /// Read committed attachment bytes from the head revision
    fn read_attachment(&self, id: &str, name: &str) -> StoreResult<Vec<u8>> {
        self.get(id)?
            .attachment(name)
            .map(|a| a.data.clone())
            .ok_or_else(|| StoreError::AttachmentNotFound(name.to_string()))
    }
}

/// Check the optimistic-concurrency precondition of a save.
///
/// Returns the ordinal of the revision being replaced (0 for a create).
pub fn check_expected(
    id: &str,
    head: Option<&RevisionId>,
    expected: Option<&RevisionId>,
) -> StoreResult<u64> {
    match (head, expected) {
        (None, None) => Ok(0),
        (Some(head), Some(expected)) if head == expected => head
            .ordinal()
            .map_err(|_| StoreError::Corrupted(format!("unparseable revision {}", head))),
        (None, Some(_)) => Err(StoreError::DocumentNotFound(id.to_string())),
        (head, expected) => Err(StoreError::conflict(
            id,
            expected.map(RevisionId::as_str),
            head.map(RevisionId::as_str),
        )),
    }
}

/// Derive the next revision from the content being committed.
pub fn next_revision(doc: &Document, ordinal: u64) -> StoreResult<RevisionId> {
    let mut content = doc.clone();
    content.set_rev(None);
    let bytes =
        serde_json::to_vec(&content).map_err(|e| StoreError::Serialization(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(ordinal.to_be_bytes());
    hasher.update(&bytes);
    let digest = format!("{:x}", hasher.finalize());

    Ok(RevisionId::new(ordinal, &digest[..REVISION_SUFFIX_LEN]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_expects_no_head() {
        assert_eq!(check_expected("d", None, None).unwrap(), 0);
    }

    #[test]
    fn test_matching_head_returns_ordinal() {
        let rev = RevisionId::new(4, "abc");
        assert_eq!(check_expected("d", Some(&rev), Some(&rev)).unwrap(), 4);
    }

    #[test]
    fn test_stale_revision_conflicts() {
        let head = RevisionId::new(4, "abc");
        let stale = RevisionId::new(3, "def");
        assert!(check_expected("d", Some(&head), Some(&stale))
            .unwrap_err()
            .is_conflict());
        assert!(check_expected("d", Some(&head), None)
            .unwrap_err()
            .is_conflict());
    }

    #[test]
    fn test_update_of_missing_document() {
        let rev = RevisionId::new(1, "a");
        assert!(matches!(
            check_expected("d", None, Some(&rev)),
            Err(StoreError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn test_next_revision_shape() {
        let mut doc = Document::with_id("d");
        doc.set("title", "x").unwrap();
        let rev = next_revision(&doc, 7).unwrap();
        assert_eq!(rev.ordinal().unwrap(), 7);
        assert_eq!(rev.as_str().len(), 2 + REVISION_SUFFIX_LEN);

        doc.set("title", "y").unwrap();
        assert_ne!(next_revision(&doc, 7).unwrap(), rev);
    }
}
