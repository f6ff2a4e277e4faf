//! Milestones and their free-form annotations

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::revision::RevisionId;

/// Free-form key/value notes attached to a milestone.
///
/// ```ignore
/// doc.milestone(|a| {
///     a.set("name", "First publish");
///     a.set("approved_by", "Joe the editor");
/// })?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Annotations(BTreeMap<String, String>);

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key`, replacing any earlier value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Chaining form of [`Annotations::set`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A tagged revision. Immutable once appended to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    version: RevisionId,
    #[serde(default)]
    annotations: Annotations,
}

impl Milestone {
    pub fn new(version: RevisionId, annotations: Annotations) -> Self {
        Self {
            version,
            annotations,
        }
    }

    /// Revision that was current when the milestone was tagged
    pub fn version(&self) -> &RevisionId {
        &self.version
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotations_accept_arbitrary_keys() {
        let mut a = Annotations::new();
        a.set("name", "First Milestone!").set("notes", "signed off");
        assert_eq!(a.get("name"), Some("First Milestone!"));
        assert_eq!(a.get("notes"), Some("signed off"));
        assert_eq!(a.get("missing"), None);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_annotations_later_value_wins() {
        let a = Annotations::new().with("k", "1").with("k", "2");
        assert_eq!(a.get("k"), Some("2"));
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn test_milestone_persisted_layout() {
        let milestone = Milestone::new(
            RevisionId::new(2, "abc"),
            Annotations::new().with("name", "publish"),
        );
        let json = serde_json::to_value(&milestone).unwrap();
        assert_eq!(json["version"], "2-abc");
        assert_eq!(json["annotations"]["name"], "publish");

        let back: Milestone = serde_json::from_value(json).unwrap();
        assert_eq!(back, milestone);
    }

    #[test]
    fn test_milestone_without_annotations_deserializes() {
        let m: Milestone = serde_json::from_str(r#"{"version": "1-a"}"#).unwrap();
        assert!(m.annotations().is_empty());
    }
}
