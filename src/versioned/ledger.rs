//! Milestone ledger
//!
//! Tagging appends `{version: <current revision>, annotations}` to the
//! persisted `milestones` list and saves, so the tagged revision becomes
//! history in the same commit. Ledger membership is the only authority for
//! whether a version is a milestone.

use crate::errors::{VersioningError, VersioningResult};
use crate::milestone::{Annotations, Milestone};
use crate::observability::{log_event_with_fields, Event};
use crate::revision::RevisionId;
use crate::store::DocumentStore;

use super::{RevertMode, VersionedDocument};

impl VersionedDocument {
    /// Tag the current revision, annotating it through `annotate`, and save.
    ///
    /// ```ignore
    /// article.milestone(|notes| {
    ///     notes.set("name", "First publish");
    /// })?;
    /// ```
    pub fn milestone<F>(&mut self, annotate: F) -> VersioningResult<RevisionId>
    where
        F: FnOnce(&mut Annotations),
    {
        let mut annotations = Annotations::new();
        annotate(&mut annotations);
        self.tag(annotations)
    }

    /// Tag the current revision with prepared annotations and save.
    pub fn tag(&mut self, annotations: Annotations) -> VersioningResult<RevisionId> {
        let version = self.doc.rev().cloned().ok_or_else(|| {
            VersioningError::InvalidVersion("cannot tag a document that was never saved".into())
        })?;

        self.doc
            .push_milestone(Milestone::new(version.clone(), annotations));
        let rev = match self.commit(false) {
            Ok(rev) => rev,
            Err(e) => {
                self.doc.pop_milestone();
                return Err(e);
            }
        };

        let count = self.doc.milestones().len().to_string();
        log_event_with_fields(
            Event::MilestoneTagged,
            &[
                ("doc_id", self.doc.id()),
                ("milestone", count.as_str()),
                ("version", version.as_str()),
            ],
        );
        Ok(rev)
    }

    pub fn latest_milestone(&self) -> Option<&Milestone> {
        self.doc.milestones().last()
    }

    /// True iff some milestone was tagged at the logical version
    pub fn is_milestone(&self) -> bool {
        self.has_milestone_at(self.logical_version_number())
    }

    /// True iff the version right before the logical one is a milestone,
    /// i.e. this is the revision written by the tagging save.
    pub fn is_milestone_commit(&self) -> bool {
        match self.logical_version_number().checked_sub(1) {
            Some(previous) => self.has_milestone_at(previous),
            None => false,
        }
    }

    pub(crate) fn has_milestone_at(&self, version: u64) -> bool {
        self.doc
            .milestones()
            .iter()
            .any(|m| m.version().ordinal().ok() == Some(version))
    }

    /// Soft revert to milestone `n`, counting from 1
    pub fn revert_to_milestone(&mut self, n: usize) -> VersioningResult<&mut Self> {
        let version = self.milestone_version(n)?;
        self.revert(&version, RevertMode::Soft)
    }

    /// Hard revert to milestone `n`, counting from 1
    pub fn revert_to_milestone_and_save(&mut self, n: usize) -> VersioningResult<&mut Self> {
        let version = self.milestone_version(n)?;
        self.revert(&version, RevertMode::Hard)
    }

    pub fn rollback_to_latest_milestone(&mut self) -> VersioningResult<&mut Self> {
        let count = self.doc.milestones().len();
        self.revert_to_milestone(count)
    }

    pub fn rollback_to_latest_milestone_and_save(&mut self) -> VersioningResult<&mut Self> {
        let count = self.doc.milestones().len();
        self.revert_to_milestone_and_save(count)
    }

    fn milestone_version(&self, n: usize) -> VersioningResult<RevisionId> {
        let milestones = self.doc.milestones();
        if milestones.is_empty() {
            return Err(VersioningError::MilestoneNotFound(
                "document has no milestones".into(),
            ));
        }
        n.checked_sub(1)
            .and_then(|index| milestones.get(index))
            .map(|m| m.version().clone())
            .ok_or_else(|| {
                VersioningError::MilestoneNotFound(format!(
                    "milestone {} out of range 1..={}",
                    n,
                    milestones.len()
                ))
            })
    }

    /// Persisted attachments the policy versions
    pub fn attachments_to_remember(&self) -> VersioningResult<Vec<String>> {
        self.persisted_attachments(true)
    }

    /// Persisted attachments the policy leaves unversioned
    pub fn attachments_to_forget(&self) -> VersioningResult<Vec<String>> {
        self.persisted_attachments(false)
    }

    fn persisted_attachments(&self, versioned: bool) -> VersioningResult<Vec<String>> {
        let policy = self.doc_type.policy();
        if !policy.remembers_attachments() || self.doc.rev().is_none() {
            return Ok(Vec::new());
        }
        let persisted = self.store.get(self.doc.id())?;
        Ok(persisted
            .user_attachment_names()
            .into_iter()
            .filter(|name| policy.is_attachment_versioned(name) == versioned)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::errors::VersioningError;
    use crate::milestone::Annotations;
    use crate::policy::{AttachmentMatcher, DocumentType, Policy, PolicyBuilder};
    use crate::store::{DocumentStore, MemoryStore};
    use crate::versioned::VersionedDocument;

    fn article(policy: Policy) -> VersionedDocument {
        let doc_type = DocumentType::register("Article", policy);
        VersionedDocument::with_id(&doc_type, Arc::new(MemoryStore::new()), "article")
    }

    fn saved_versions(n: usize) -> VersionedDocument {
        let mut doc = article(Policy::default());
        for i in 1..=n {
            doc.set("title", format!("v{}", i)).unwrap();
            doc.save().unwrap();
        }
        doc
    }

    #[test]
    fn test_tag_records_current_revision_and_saves() {
        let mut doc = saved_versions(2);
        let tagged = doc.rev().cloned().unwrap();

        doc.milestone(|notes| {
            notes.set("name", "First publish").set("approved_by", "editor");
        })
        .unwrap();

        assert_eq!(doc.current_version(), 3);
        let latest = doc.latest_milestone().unwrap();
        assert_eq!(latest.version(), &tagged);
        assert_eq!(latest.annotations().get("name"), Some("First publish"));
        assert_eq!(latest.annotations().get("approved_by"), Some("editor"));

        let persisted = doc.store().get("article").unwrap();
        assert_eq!(persisted.milestones().len(), 1);
    }

    #[test]
    fn test_milestone_and_commit_checks() {
        let mut doc = saved_versions(2);
        doc.tag(Annotations::new()).unwrap();

        assert!(!doc.is_milestone());
        assert!(doc.is_milestone_commit());

        doc.revert_to(2).unwrap();
        assert!(doc.is_milestone());
        assert!(!doc.is_milestone_commit());

        doc.set("title", "v4").unwrap();
        doc.save().unwrap();
        assert!(!doc.is_milestone());
        assert!(!doc.is_milestone_commit());
    }

    #[test]
    fn test_tag_unsaved_document_fails() {
        let mut doc = article(Policy::default());
        let err = doc.tag(Annotations::new()).unwrap_err();
        assert!(matches!(err, VersioningError::InvalidVersion(_)));
        assert!(doc.latest_milestone().is_none());
    }

    #[test]
    fn test_failed_tag_is_not_recorded() {
        let store = Arc::new(MemoryStore::new());
        let doc_type = DocumentType::register("Article", Policy::default());
        let mut doc = VersionedDocument::with_id(&doc_type, store.clone(), "article");
        doc.save().unwrap();

        let mut other = VersionedDocument::load(&doc_type, store, "article").unwrap();
        other.set("title", "elsewhere").unwrap();
        other.save().unwrap();

        assert!(doc.tag(Annotations::new()).unwrap_err().is_conflict());
        assert!(doc.latest_milestone().is_none());
    }

    #[test]
    fn test_revert_to_milestone_matches_revert_to_version() {
        let mut doc = saved_versions(2);
        doc.tag(Annotations::new()).unwrap();
        doc.set("title", "v4").unwrap();
        doc.save().unwrap();

        let mut by_version = doc.clone();
        by_version.revert_to(2).unwrap();
        doc.revert_to_milestone_and_save(1).unwrap();

        assert_eq!(doc.current_version(), 5);
        assert_eq!(doc.get_str("title"), Some("v2"));
        assert_eq!(doc.get_str("title"), by_version.get_str("title"));
    }

    #[test]
    fn test_milestone_bounds() {
        let mut doc = saved_versions(2);
        assert!(matches!(
            doc.revert_to_milestone(1),
            Err(VersioningError::MilestoneNotFound(_))
        ));
        assert!(matches!(
            doc.rollback_to_latest_milestone(),
            Err(VersioningError::MilestoneNotFound(_))
        ));

        doc.tag(Annotations::new()).unwrap();
        for n in [0, 2] {
            assert!(matches!(
                doc.revert_to_milestone(n),
                Err(VersioningError::MilestoneNotFound(_))
            ));
        }
    }

    #[test]
    fn test_rollback_to_latest_milestone() {
        let mut doc = saved_versions(1);
        doc.tag(Annotations::new()).unwrap();
        doc.set("title", "v3").unwrap();
        doc.save().unwrap();
        doc.tag(Annotations::new().with("name", "second")).unwrap();
        doc.set("title", "v5").unwrap();
        doc.save().unwrap();

        doc.rollback_to_latest_milestone().unwrap();
        assert_eq!(doc.get_str("title"), Some("v3"));
        assert_eq!(doc.logical_version_number(), 3);

        doc.rollback_to_latest_milestone_and_save().unwrap();
        assert_eq!(doc.current_version(), 6);
        assert_eq!(doc.get_str("title"), Some("v3"));
    }

    #[test]
    fn test_attachment_listings() {
        let policy = PolicyBuilder::new()
            .remember_attachments(vec![AttachmentMatcher::pattern(r"\.css$").unwrap()])
            .build();
        let mut doc = article(policy);
        assert!(doc.attachments_to_remember().unwrap().is_empty());

        doc.create_attachment("screen.css", "text/css", b"h1 {}".to_vec())
            .unwrap();
        doc.create_attachment("notes.txt", "text/plain", b"n".to_vec())
            .unwrap();
        doc.save().unwrap();
        doc.save().unwrap();

        assert_eq!(doc.attachments_to_remember().unwrap(), vec!["screen.css"]);
        assert_eq!(doc.attachments_to_forget().unwrap(), vec!["notes.txt"]);
    }

    #[test]
    fn test_attachment_listings_when_attachments_unversioned() {
        let mut doc = saved_versions(1);
        doc.create_attachment("a.txt", "text/plain", b"a".to_vec())
            .unwrap();
        doc.save().unwrap();
        assert!(doc.attachments_to_remember().unwrap().is_empty());
        assert!(doc.attachments_to_forget().unwrap().is_empty());
    }
}
