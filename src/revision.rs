//! Revision addressing
//!
//! Store revisions look like `<ordinal>-<opaque>`; snapshot attachments are
//! named `rev-<ordinal>-<opaque>`. The ordinal is the caller-facing version
//! number.
//!
//! Grammar accepted by [`parse_ordinal`]:
//!
//! ```text
//! revision := [ "rev-" ] digits "-" alnum+
//! ```

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{VersioningError, VersioningResult};

/// Prefix of every snapshot attachment name
pub const SNAPSHOT_PREFIX: &str = "rev-";

fn revision_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:rev-)?(\d+)-[A-Za-z0-9]+$").expect("revision pattern is valid")
    })
}

fn snapshot_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^rev-(\d+)-[A-Za-z0-9]+$").expect("snapshot pattern is valid")
    })
}

/// Extract the ordinal from a bare or `rev-`-prefixed revision.
pub fn parse_ordinal(revision: &str) -> VersioningResult<u64> {
    let captures = revision_pattern()
        .captures(revision)
        .ok_or_else(|| VersioningError::InvalidVersion(revision.to_string()))?;
    captures[1]
        .parse::<u64>()
        .map_err(|_| VersioningError::InvalidVersion(revision.to_string()))
}

/// True for attachment names reserved for snapshots.
pub fn is_snapshot_name(name: &str) -> bool {
    snapshot_pattern().is_match(name)
}

/// Ordinal of a snapshot attachment name, if it is one.
pub fn snapshot_ordinal(name: &str) -> Option<u64> {
    snapshot_pattern()
        .captures(name)
        .and_then(|c| c[1].parse::<u64>().ok())
}

/// Attachment name of the snapshot superseded by `revision`.
pub fn snapshot_name(revision: &RevisionId) -> String {
    format!("{}{}", SNAPSHOT_PREFIX, revision.as_str())
}

/// Store-assigned revision identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(String);

impl RevisionId {
    /// Build a revision from its ordinal and opaque suffix
    pub fn new(ordinal: u64, suffix: &str) -> Self {
        Self(format!("{}-{}", ordinal, suffix))
    }

    /// Validate and wrap a raw revision string
    pub fn parse(raw: &str) -> VersioningResult<Self> {
        parse_ordinal(raw)?;
        Ok(Self(raw.trim_start_matches(SNAPSHOT_PREFIX).to_string()))
    }

    /// The leading ordinal
    pub fn ordinal(&self) -> VersioningResult<u64> {
        parse_ordinal(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A caller-supplied reference to a version: a number or a revision string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRef {
    Number(i64),
    Revision(String),
}

impl VersionRef {
    /// Normalize to a version number.
    ///
    /// Revision-shaped strings yield their ordinal, other strings must be a
    /// plain non-negative integer. Range checks are the caller's job.
    pub fn resolve(&self) -> VersioningResult<i64> {
        match self {
            VersionRef::Number(n) => Ok(*n),
            VersionRef::Revision(raw) => {
                if let Ok(ordinal) = parse_ordinal(raw) {
                    return i64::try_from(ordinal)
                        .map_err(|_| VersioningError::InvalidVersion(raw.clone()));
                }
                if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(VersioningError::InvalidVersion(raw.clone()));
                }
                raw.parse::<u64>()
                    .ok()
                    .and_then(|n| i64::try_from(n).ok())
                    .ok_or_else(|| VersioningError::InvalidVersion(raw.clone()))
            }
        }
    }
}

impl From<i64> for VersionRef {
    fn from(n: i64) -> Self {
        VersionRef::Number(n)
    }
}

impl From<i32> for VersionRef {
    fn from(n: i32) -> Self {
        VersionRef::Number(i64::from(n))
    }
}

impl From<u64> for VersionRef {
    fn from(n: u64) -> Self {
        VersionRef::Number(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<usize> for VersionRef {
    fn from(n: usize) -> Self {
        VersionRef::Number(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<&str> for VersionRef {
    fn from(s: &str) -> Self {
        VersionRef::Revision(s.to_string())
    }
}

impl From<String> for VersionRef {
    fn from(s: String) -> Self {
        VersionRef::Revision(s)
    }
}

impl From<&RevisionId> for VersionRef {
    fn from(rev: &RevisionId) -> Self {
        VersionRef::Revision(rev.as_str().to_string())
    }
}
