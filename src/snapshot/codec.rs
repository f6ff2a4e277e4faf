//! Snapshot codec
//!
//! A snapshot is one JSON object: the policy-filtered properties at top
//! level, plus an optional `attachment_memories` record:
//!
//! ```json
//! {
//!   "title": "2001",
//!   "attachment_memories": {
//!     "versioned_attachments": {"screen.css": {"content_type": "text/css", "data": "aDEg..."}},
//!     "known_attachments": ["screen.css", "unversioned.txt"]
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{VersioningError, VersioningResult};
use crate::policy::Policy;
use crate::store::Document;

/// Content type of snapshot attachments
pub const SNAPSHOT_CONTENT_TYPE: &str = "application/json";

/// Property carrying the capture-time timestamp, restored verbatim on revert
pub const TIMESTAMP_PROPERTY: &str = "updated_at";

/// One attachment copied into a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RememberedAttachment {
    pub content_type: String,
    /// Base64, no line breaks
    pub data: String,
}

impl RememberedAttachment {
    pub fn encode(content_type: &str, bytes: &[u8]) -> Self {
        Self {
            content_type: content_type.to_string(),
            data: STANDARD.encode(bytes),
        }
    }

    /// Decode the payload. Embedded whitespace is tolerated.
    pub fn decode(&self) -> VersioningResult<Vec<u8>> {
        let compact: String = self.data.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| VersioningError::AttachmentCodec(format!("invalid base64 payload: {}", e)))
    }
}

/// Attachment state at capture time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMemories {
    /// Copies of every attachment the policy versions
    #[serde(default)]
    pub versioned_attachments: BTreeMap<String, RememberedAttachment>,
    /// Every non-snapshot attachment name present
    #[serde(default)]
    pub known_attachments: Vec<String>,
}

impl AttachmentMemories {
    pub fn knows(&self, name: &str) -> bool {
        self.known_attachments.iter().any(|known| known == name)
    }
}

/// Decoded snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_memories: Option<AttachmentMemories>,

    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl Snapshot {
    /// Project `doc`'s properties through the policy. Attachments are not touched.
    pub fn project(doc: &Document, policy: &Policy) -> Self {
        let properties = doc
            .properties()
            .iter()
            .filter(|(name, _)| policy.is_property_versioned(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Self {
            attachment_memories: None,
            properties,
        }
    }

    pub fn timestamp(&self) -> Option<&Value> {
        self.properties.get(TIMESTAMP_PROPERTY)
    }

    pub fn encode(&self) -> VersioningResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| {
            VersioningError::AttachmentCodec(format!("Failed to encode snapshot: {}", e))
        })
    }

    pub fn decode(bytes: &[u8]) -> VersioningResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            VersioningError::AttachmentCodec(format!("Failed to decode snapshot: {}", e))
        })
    }
}
