//! Serializable policy configuration
//!
//! ```json
//! {
//!   "remember": ["title", "body"],
//!   "attachments": {
//!     "enabled": true,
//!     "matchers": [{"exact": "README.txt"}, {"pattern": "^static/.*\\.js$"}]
//!   },
//!   "timestamps": true
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::rules::{AttachmentMatcher, Policy, PolicyBuilder};
use crate::errors::{VersioningError, VersioningResult};

/// One attachment matcher as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherConfig {
    Exact(String),
    Pattern(String),
}

/// Attachment versioning section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentsConfig {
    /// Version attachments at all (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Empty = every attachment
    #[serde(default)]
    pub matchers: Vec<MatcherConfig>,
}

/// Policy configuration for a document type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Allow-list of versioned properties
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remember: Option<Vec<String>>,

    /// Deny-list, added to the reserved properties
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forget: Option<Vec<String>>,

    #[serde(default)]
    pub attachments: AttachmentsConfig,

    /// Stamp `updated_at` on every save (default: false)
    #[serde(default)]
    pub timestamps: bool,
}

impl PolicyConfig {
    pub fn from_json(json: &str) -> VersioningResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            VersioningError::Configuration(format!("Failed to parse policy config: {}", e))
        })
    }

    pub fn load(path: &Path) -> VersioningResult<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            VersioningError::Configuration(format!(
                "Failed to read policy config {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&json)
    }
}

impl Policy {
    /// Compile a configuration into an immutable policy.
    pub fn from_config(config: &PolicyConfig) -> VersioningResult<Policy> {
        let mut builder = PolicyBuilder::new().timestamps(config.timestamps);
        if let Some(names) = &config.remember {
            builder = builder.remember(names.iter().cloned())?;
        }
        if let Some(names) = &config.forget {
            builder = builder.forget(names.iter().cloned())?;
        }
        if config.attachments.enabled {
            let matchers = config
                .attachments
                .matchers
                .iter()
                .map(|m| match m {
                    MatcherConfig::Exact(name) => Ok(AttachmentMatcher::exact(name.clone())),
                    MatcherConfig::Pattern(pattern) => AttachmentMatcher::pattern(pattern),
                })
                .collect::<VersioningResult<Vec<_>>>()?;
            builder = builder.remember_attachments(matchers);
        }
        Ok(builder.build())
    }
}
