//! # Document Model
//!
//! Persisted layout (one JSON object):
//!
//! ```json
//! {
//!   "_id": "6f1c...",
//!   "_rev": "3-9a0f...",
//!   "_type": "Book",
//!   "milestones": [{"version": "2-77c1...", "annotations": {"name": "publish"}}],
//!   "_attachments": {"rev-2-77c1...": {"content_type": "application/json", "data": "eyJ..."}},
//!   "title": "2001"
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use crate::milestone::Milestone;
use crate::revision::{is_snapshot_name, RevisionId};

/// Keys owned by the document envelope or the snapshot layout, unavailable
/// as properties
pub const DOCUMENT_KEYS: &[&str] = &[
    "_id",
    "_rev",
    "_attachments",
    "_type",
    "milestones",
    "attachment_memories",
];

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// A named binary blob carried by a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub content_type: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(content_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: content_type.into(),
            data: data.into(),
        }
    }
}

/// A stored document: envelope, properties and attachments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    id: String,

    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    rev: Option<RevisionId>,

    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    doc_type: Option<String>,

    #[serde(default)]
    milestones: Vec<Milestone>,

    #[serde(rename = "_attachments", default)]
    attachments: BTreeMap<String, Attachment>,

    #[serde(flatten)]
    properties: Map<String, Value>,
}

impl Document {
    /// New, never-saved document with a random id
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rev: None,
            doc_type: None,
            milestones: Vec::new(),
            attachments: BTreeMap::new(),
            properties: Map::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// `None` until the first successful save
    pub fn rev(&self) -> Option<&RevisionId> {
        self.rev.as_ref()
    }

    /// Used by store backends when handing out committed documents
    pub fn set_rev(&mut self, rev: Option<RevisionId>) {
        self.rev = rev;
    }

    pub fn doc_type(&self) -> Option<&str> {
        self.doc_type.as_deref()
    }

    pub fn set_doc_type(&mut self, doc_type: impl Into<String>) {
        self.doc_type = Some(doc_type.into());
    }

    // Properties

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Set a caller-defined property. Envelope keys are refused.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> StoreResult<()> {
        let name = name.into();
        if DOCUMENT_KEYS.contains(&name.as_str()) {
            return Err(StoreError::ReservedProperty(name));
        }
        self.properties.insert(name, value.into());
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.properties.remove(name)
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    pub(crate) fn properties_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.properties
    }

    // Milestones

    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    pub(crate) fn push_milestone(&mut self, milestone: Milestone) {
        self.milestones.push(milestone);
    }

    pub(crate) fn pop_milestone(&mut self) -> Option<Milestone> {
        self.milestones.pop()
    }

    // Attachments

    pub fn attachments(&self) -> &BTreeMap<String, Attachment> {
        &self.attachments
    }

    pub fn attachment(&self, name: &str) -> Option<&Attachment> {
        self.attachments.get(name)
    }

    pub fn has_attachment(&self, name: &str) -> bool {
        self.attachments.contains_key(name)
    }

    /// Attachment names excluding snapshots, in name order
    pub fn user_attachment_names(&self) -> Vec<String> {
        self.attachments
            .keys()
            .filter(|name| !is_snapshot_name(name))
            .cloned()
            .collect()
    }

    pub fn create_attachment(
        &mut self,
        name: &str,
        content_type: &str,
        data: impl Into<Vec<u8>>,
    ) -> StoreResult<()> {
        if self.attachments.contains_key(name) {
            return Err(StoreError::AttachmentExists(name.to_string()));
        }
        self.attachments
            .insert(name.to_string(), Attachment::new(content_type, data));
        Ok(())
    }

    pub fn update_attachment(
        &mut self,
        name: &str,
        content_type: &str,
        data: impl Into<Vec<u8>>,
    ) -> StoreResult<()> {
        match self.attachments.get_mut(name) {
            Some(existing) => {
                *existing = Attachment::new(content_type, data);
                Ok(())
            }
            None => Err(StoreError::AttachmentNotFound(name.to_string())),
        }
    }

    pub fn delete_attachment(&mut self, name: &str) -> StoreResult<()> {
        self.attachments
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::AttachmentNotFound(name.to_string()))
    }

    /// Create-or-update
    pub(crate) fn put_attachment(&mut self, name: &str, attachment: Attachment) {
        self.attachments.insert(name.to_string(), attachment);
    }

    pub(crate) fn remove_attachment(&mut self, name: &str) -> Option<Attachment> {
        self.attachments.remove(name)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
