//! # Versioned Documents
//!
//! [`VersionedDocument`] wraps one in-memory [`Document`] of a registered
//! [`DocumentType`] and routes every save through snapshot capture, so each
//! committed revision leaves the state it replaced behind as a snapshot.
//!
//! - addressing and saving live here
//! - `revert`: the revert engine and rollbacks
//! - `ledger`: the milestone ledger
//!
//! An instance is single-writer and not shareable across threads; the
//! version and milestone caches behind [`VersionedDocument::versions`] and
//! [`VersionedDocument::milestones`] belong to the instance.

mod ledger;
mod revert;

pub use revert::RevertMode;

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::errors::VersioningResult;
use crate::policy::{DocumentType, Policy};
use crate::proxy::{Milestones, ProxyCache, Versions};
use crate::revision::{parse_ordinal, snapshot_ordinal, RevisionId, SNAPSHOT_PREFIX};
use crate::snapshot::{after_commit, before_commit, TIMESTAMP_PROPERTY};
use crate::store::{Attachment, Document, DocumentStore};

/// State claimed by a soft-reverted instance until its next save
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogicalState {
    version: u64,
    revision: String,
}

/// A document with transparent version history
pub struct VersionedDocument {
    doc_type: DocumentType,
    store: Arc<dyn DocumentStore>,
    doc: Document,
    logical: Option<LogicalState>,
    proxies: RefCell<ProxyCache>,
}

impl VersionedDocument {
    /// A new, unsaved document with a random id
    pub fn new(doc_type: &DocumentType, store: Arc<dyn DocumentStore>) -> Self {
        Self::from_document(doc_type, store, Document::new())
    }

    /// A new, unsaved document with a caller-chosen id
    pub fn with_id(
        doc_type: &DocumentType,
        store: Arc<dyn DocumentStore>,
        id: impl Into<String>,
    ) -> Self {
        Self::from_document(doc_type, store, Document::with_id(id))
    }

    /// Fetch the head revision of `id` from the store
    pub fn load(
        doc_type: &DocumentType,
        store: Arc<dyn DocumentStore>,
        id: &str,
    ) -> VersioningResult<Self> {
        let doc = store.get(id)?;
        Ok(Self::from_document(doc_type, store, doc))
    }

    pub fn from_document(
        doc_type: &DocumentType,
        store: Arc<dyn DocumentStore>,
        mut doc: Document,
    ) -> Self {
        if doc.doc_type().is_none() {
            doc.set_doc_type(doc_type.name());
        }
        Self {
            doc_type: doc_type.clone(),
            store,
            doc,
            logical: None,
            proxies: RefCell::new(ProxyCache::default()),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn doc_type(&self) -> &DocumentType {
        &self.doc_type
    }

    pub fn policy(&self) -> &Policy {
        self.doc_type.policy()
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn id(&self) -> &str {
        self.doc.id()
    }

    pub fn rev(&self) -> Option<&RevisionId> {
        self.doc.rev()
    }

    pub(crate) fn proxy_cache(&self) -> &RefCell<ProxyCache> {
        &self.proxies
    }

    // Properties

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.doc.get(name)
    }

    /// String value of a property, if it is one
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.doc.get(name).and_then(Value::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> VersioningResult<()> {
        Ok(self.doc.set(name, value)?)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.doc.remove(name)
    }

    // Attachments, staged until the next save

    pub fn create_attachment(
        &mut self,
        name: &str,
        content_type: &str,
        data: impl Into<Vec<u8>>,
    ) -> VersioningResult<()> {
        Ok(self.doc.create_attachment(name, content_type, data)?)
    }

    pub fn update_attachment(
        &mut self,
        name: &str,
        content_type: &str,
        data: impl Into<Vec<u8>>,
    ) -> VersioningResult<()> {
        Ok(self.doc.update_attachment(name, content_type, data)?)
    }

    pub fn delete_attachment(&mut self, name: &str) -> VersioningResult<()> {
        Ok(self.doc.delete_attachment(name)?)
    }

    pub fn has_attachment(&self, name: &str) -> bool {
        self.doc.has_attachment(name)
    }

    pub fn attachment(&self, name: &str) -> Option<&Attachment> {
        self.doc.attachment(name)
    }

    /// Committed bytes of an attachment, read from the store
    pub fn read_attachment(&self, name: &str) -> VersioningResult<Vec<u8>> {
        Ok(self.store.read_attachment(self.doc.id(), name)?)
    }

    // Saving

    /// Commit the document, snapshotting the state it replaces.
    ///
    /// Clears any logical version left by a soft revert.
    pub fn save(&mut self) -> VersioningResult<RevisionId> {
        self.commit(false)
    }

    pub(crate) fn commit(&mut self, keep_timestamp: bool) -> VersioningResult<RevisionId> {
        let staged = before_commit(self.store.as_ref(), self.doc_type.policy(), &mut self.doc)?;

        if self.doc_type.policy().timestamps() && !keep_timestamp {
            self.doc.properties_mut().insert(
                TIMESTAMP_PROPERTY.to_string(),
                Value::String(Utc::now().to_rfc3339()),
            );
        }

        let outcome = self.store.save(&self.doc);
        after_commit(&mut self.doc, staged, &outcome);
        let rev = outcome?;
        self.logical = None;
        Ok(rev)
    }

    // Revision addressing

    /// Ordinal of the current revision; 0 before the first save
    pub fn current_version(&self) -> u64 {
        self.doc
            .rev()
            .and_then(|rev| rev.ordinal().ok())
            .unwrap_or(0)
    }

    pub fn previous_version(&self) -> u64 {
        self.current_version().saturating_sub(1)
    }

    /// Snapshot name holding version `n`, if one was captured
    pub fn version_id(&self, n: u64) -> Option<String> {
        self.doc
            .attachments()
            .keys()
            .find(|name| snapshot_ordinal(name) == Some(n))
            .cloned()
    }

    /// Version number of a bare or `rev-`-prefixed revision
    pub fn version_number(&self, revision: &str) -> VersioningResult<u64> {
        parse_ordinal(revision)
    }

    /// Versions below the current one that have no snapshot.
    ///
    /// Empty for an intact history.
    pub fn history_gaps(&self) -> Vec<u64> {
        (1..self.current_version())
            .filter(|n| self.version_id(*n).is_none())
            .collect()
    }

    /// Logical version after a soft revert, else the current version
    pub fn logical_version_number(&self) -> u64 {
        self.logical
            .as_ref()
            .map(|logical| logical.version)
            .unwrap_or_else(|| self.current_version())
    }

    /// Logical revision after a soft revert, else `rev-<current revision>`
    pub fn logical_revision(&self) -> Option<String> {
        match &self.logical {
            Some(logical) => Some(logical.revision.clone()),
            None => self
                .doc
                .rev()
                .map(|rev| format!("{}{}", SNAPSHOT_PREFIX, rev.as_str())),
        }
    }

    // Views

    /// Lazy, cached view over versions `1..=current_version`
    pub fn versions(&self) -> Versions<'_> {
        Versions::new(self)
    }

    /// Lazy, cached view over the milestone ledger
    pub fn milestones(&self) -> Milestones<'_> {
        Milestones::new(self)
    }
}

impl Clone for VersionedDocument {
    /// Deep copy. Proxy caches are not shared with the copy.
    fn clone(&self) -> Self {
        Self {
            doc_type: self.doc_type.clone(),
            store: Arc::clone(&self.store),
            doc: self.doc.clone(),
            logical: self.logical.clone(),
            proxies: RefCell::new(ProxyCache::default()),
        }
    }
}

impl fmt::Debug for VersionedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedDocument")
            .field("doc_type", &self.doc_type.name())
            .field("id", &self.doc.id())
            .field("rev", &self.doc.rev())
            .field("logical", &self.logical)
            .finish()
    }
}
