//! Property and attachment rules
//!
//! A [`Policy`] is immutable once built. Mixing `remember` and `forget` is
//! rejected by [`PolicyBuilder`] at the call that mixes them.

use std::collections::BTreeSet;

use regex::Regex;

use crate::errors::{VersioningError, VersioningResult};
use crate::revision::is_snapshot_name;

/// Property names never versioned by the default deny-list
pub const RESERVED_PROPERTIES: &[&str] = &[
    "_id",
    "_rev",
    "_attachments",
    "_type",
    "milestones",
    "attachment_memories",
];

/// Key the snapshot codec uses for embedded attachments
pub(crate) const ATTACHMENT_MEMORIES_KEY: &str = "attachment_memories";

/// Selects attachments by exact name or by regular expression
#[derive(Debug, Clone)]
pub enum AttachmentMatcher {
    Exact(String),
    Pattern(Regex),
}

impl AttachmentMatcher {
    pub fn exact(name: impl Into<String>) -> Self {
        AttachmentMatcher::Exact(name.into())
    }

    /// Compile a pattern matcher. Patterns are unanchored.
    pub fn pattern(pattern: &str) -> VersioningResult<Self> {
        Regex::new(pattern)
            .map(AttachmentMatcher::Pattern)
            .map_err(|e| {
                VersioningError::Configuration(format!(
                    "invalid attachment pattern {:?}: {}",
                    pattern, e
                ))
            })
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            AttachmentMatcher::Exact(exact) => exact == name,
            AttachmentMatcher::Pattern(re) => re.is_match(name),
        }
    }
}

/// Which properties go into a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyFilter {
    /// Only these properties
    Remember(BTreeSet<String>),
    /// Everything except these properties
    Forget(BTreeSet<String>),
}

impl Default for PropertyFilter {
    fn default() -> Self {
        PropertyFilter::Forget(RESERVED_PROPERTIES.iter().map(|s| s.to_string()).collect())
    }
}

/// Versioning policy of one document type
#[derive(Debug, Clone, Default)]
pub struct Policy {
    properties: PropertyFilter,
    /// `None` = attachment versioning disabled
    attachments: Option<Vec<AttachmentMatcher>>,
    timestamps: bool,
}

impl Policy {
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::new()
    }

    pub fn property_filter(&self) -> &PropertyFilter {
        &self.properties
    }

    /// Allow-list: membership. Deny-list: non-membership.
    pub fn is_property_versioned(&self, name: &str) -> bool {
        if name == ATTACHMENT_MEMORIES_KEY {
            return false;
        }
        match &self.properties {
            PropertyFilter::Remember(names) => names.contains(name),
            PropertyFilter::Forget(names) => !names.contains(name),
        }
    }

    pub fn remembers_attachments(&self) -> bool {
        self.attachments.is_some()
    }

    /// Snapshot attachments are never versioned themselves.
    pub fn is_attachment_versioned(&self, name: &str) -> bool {
        if is_snapshot_name(name) {
            return false;
        }
        match &self.attachments {
            None => false,
            Some(matchers) if matchers.is_empty() => true,
            Some(matchers) => matchers.iter().any(|m| m.matches(name)),
        }
    }

    /// Whether saves stamp `updated_at`
    pub fn timestamps(&self) -> bool {
        self.timestamps
    }
}

/// Builds a [`Policy`], rejecting ambiguous property rules.
#[derive(Debug, Default)]
pub struct PolicyBuilder {
    remember: Option<BTreeSet<String>>,
    forget: Option<BTreeSet<String>>,
    attachments: Option<Vec<AttachmentMatcher>>,
    timestamps: bool,
}

impl PolicyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Version only the given properties.
    pub fn remember<I, S>(mut self, names: I) -> VersioningResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.forget.is_some() {
            return Err(VersioningError::Configuration(
                "Ambiguous use of both remember and forget".to_string(),
            ));
        }
        self.remember
            .get_or_insert_with(BTreeSet::new)
            .extend(names.into_iter().map(Into::into));
        Ok(self)
    }

    /// Exclude the given properties, on top of the reserved ones.
    pub fn forget<I, S>(mut self, names: I) -> VersioningResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.remember.is_some() {
            return Err(VersioningError::Configuration(
                "Ambiguous use of both remember and forget".to_string(),
            ));
        }
        self.forget
            .get_or_insert_with(|| RESERVED_PROPERTIES.iter().map(|s| s.to_string()).collect())
            .extend(names.into_iter().map(Into::into));
        Ok(self)
    }

    /// Version attachments. An empty matcher list versions all of them.
    pub fn remember_attachments(mut self, matchers: Vec<AttachmentMatcher>) -> Self {
        self.attachments = Some(matchers);
        self
    }

    pub fn timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    pub fn build(self) -> Policy {
        let properties = match (self.remember, self.forget) {
            (Some(names), _) => PropertyFilter::Remember(names),
            (None, Some(names)) => PropertyFilter::Forget(names),
            (None, None) => PropertyFilter::default(),
        };
        Policy {
            properties,
            attachments: self.attachments,
            timestamps: self.timestamps,
        }
    }
}
