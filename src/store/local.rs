//! # Local Filesystem Document Store
//!
//! One directory per document, one file per committed revision:
//!
//! ```text
//! <root>/<id>/<ordinal>-<hash>.json
//! ```
//!
//! Each file holds a record `{"checksum": "crc32:XXXXXXXX", "document": "<json>"}`.
//! A commit is written to a temp file, fsynced, then renamed into place, so
//! the rename is the single commit point for properties and attachments
//! alike. The head is the file with the highest ordinal.
//!
//! Before writing, a commit claims its ordinal by creating `<ordinal>.claim`
//! with `create_new`. Only one writer can create a given claim, so two
//! handles on the same root (or two processes) racing from the same head
//! cannot both commit: the loser gets a conflict. Claims stay in place once
//! their record lands; a claim whose record failed to write is removed.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::backend::{check_expected, next_revision, DocumentStore};
use super::checksum::{compute_checksum, format_checksum, verify_formatted};
use super::document::Document;
use super::errors::{StoreError, StoreResult};
use crate::observability::{log_event_with_fields, Event};
use crate::revision::RevisionId;

const RECORD_EXTENSION: &str = "json";
const CLAIM_EXTENSION: &str = "claim";

#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    checksum: String,
    document: String,
}

/// Filesystem-backed store
#[derive(Debug)]
pub struct LocalStore {
    root: PathBuf,
    /// Serializes head check and rename within this handle; ordinal claims
    /// cover other handles
    commit_lock: Mutex<()>,
}

impl LocalStore {
    /// Open (or create) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::IoError(e.to_string()))?;
        Ok(Self {
            root,
            commit_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_dir(&self, id: &str) -> StoreResult<PathBuf> {
        if id.is_empty() || id.starts_with('.') || id.contains(['/', '\\']) {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.root.join(id))
    }

    fn revision_path(dir: &Path, rev: &RevisionId) -> PathBuf {
        dir.join(format!("{}.{}", rev.as_str(), RECORD_EXTENSION))
    }

    /// Committed revisions of a document, lowest ordinal first
    fn revisions(&self, id: &str) -> StoreResult<Vec<(u64, RevisionId)>> {
        let dir = self.document_dir(id)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut revisions = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| StoreError::IoError(e.to_string()))? {
            let entry = entry.map_err(|e| StoreError::IoError(e.to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            // Temp files and strays are not revisions
            if let Ok(rev) = RevisionId::parse(stem) {
                if let Ok(ordinal) = rev.ordinal() {
                    revisions.push((ordinal, rev));
                }
            }
        }
        revisions.sort();
        Ok(revisions)
    }

    fn claim_path(dir: &Path, ordinal: u64) -> PathBuf {
        dir.join(format!("{}.{}", ordinal, CLAIM_EXTENSION))
    }

    /// Atomically claim `ordinal` for one commit.
    ///
    /// Fails with a conflict when another writer already claimed it.
    fn claim_ordinal(dir: &Path, doc: &Document, ordinal: u64) -> StoreResult<PathBuf> {
        fs::create_dir_all(dir).map_err(|e| StoreError::IoError(e.to_string()))?;
        let path = Self::claim_path(dir, ordinal);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(path),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let claimed = format!("{} (claimed)", ordinal);
                Err(StoreError::conflict(
                    doc.id(),
                    doc.rev().map(RevisionId::as_str),
                    Some(claimed.as_str()),
                ))
            }
            Err(e) => Err(StoreError::IoError(e.to_string())),
        }
    }

    fn read_record(path: &Path) -> StoreResult<Document> {
        let bytes = fs::read(path).map_err(|e| StoreError::IoError(e.to_string()))?;
        let record: StoredRecord = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Corrupted(format!("{}: {}", path.display(), e)))?;
        if !verify_formatted(record.document.as_bytes(), &record.checksum) {
            return Err(StoreError::Corrupted(format!(
                "checksum mismatch in {}",
                path.display()
            )));
        }
        serde_json::from_str(&record.document)
            .map_err(|e| StoreError::Corrupted(format!("{}: {}", path.display(), e)))
    }

    fn write_record(dir: &Path, rev: &RevisionId, doc: &Document) -> StoreResult<()> {
        let document =
            serde_json::to_string(doc).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let record = StoredRecord {
            checksum: format_checksum(compute_checksum(document.as_bytes())),
            document,
        };
        let bytes =
            serde_json::to_vec(&record).map_err(|e| StoreError::Serialization(e.to_string()))?;

        fs::create_dir_all(dir).map_err(|e| StoreError::IoError(e.to_string()))?;
        let temp_path = dir.join(format!(".{}.tmp", rev.as_str()));
        let final_path = Self::revision_path(dir, rev);

        let mut file = File::create(&temp_path).map_err(|e| StoreError::IoError(e.to_string()))?;
        file.write_all(&bytes)
            .map_err(|e| StoreError::IoError(e.to_string()))?;
        file.sync_all()
            .map_err(|e| StoreError::IoError(e.to_string()))?;
        drop(file);

        fs::rename(&temp_path, &final_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StoreError::IoError(e.to_string())
        })?;

        // Directory fsync is best effort on platforms that refuse it
        if let Ok(dir_handle) = File::open(dir) {
            let _ = dir_handle.sync_all();
        }
        Ok(())
    }
}

impl DocumentStore for LocalStore {
    fn get(&self, id: &str) -> StoreResult<Document> {
        let dir = self.document_dir(id)?;
        let (_, head) = self
            .revisions(id)?
            .pop()
            .ok_or_else(|| StoreError::DocumentNotFound(id.to_string()))?;
        Self::read_record(&Self::revision_path(&dir, &head))
    }

    fn get_at(&self, id: &str, rev: &RevisionId) -> StoreResult<Document> {
        let dir = self.document_dir(id)?;
        let path = Self::revision_path(&dir, rev);
        if !path.is_file() {
            if self.revisions(id)?.is_empty() {
                return Err(StoreError::DocumentNotFound(id.to_string()));
            }
            return Err(StoreError::RevisionNotFound {
                id: id.to_string(),
                rev: rev.to_string(),
            });
        }
        Self::read_record(&path)
    }

    fn save(&self, doc: &Document) -> StoreResult<RevisionId> {
        let _guard = self
            .commit_lock
            .lock()
            .map_err(|_| StoreError::Internal("Lock poisoned".into()))?;

        let dir = self.document_dir(doc.id())?;
        let head = self.revisions(doc.id())?.pop().map(|(_, rev)| rev);
        let ordinal = check_expected(doc.id(), head.as_ref(), doc.rev())?;

        let rev = next_revision(doc, ordinal + 1)?;
        let claim = Self::claim_ordinal(&dir, doc, ordinal + 1)?;
        let mut committed = doc.clone();
        committed.set_rev(Some(rev.clone()));
        if let Err(e) = Self::write_record(&dir, &rev, &committed) {
            let _ = fs::remove_file(&claim);
            return Err(e);
        }

        log_event_with_fields(
            Event::StoreWrite,
            &[("doc_id", doc.id()), ("rev", rev.as_str()), ("store", "local")],
        );
        Ok(rev)
    }
}
