//! # Versioning Policy
//!
//! Per-document-type rules deciding which properties and attachments take
//! part in versioning. A policy is fixed when its [`DocumentType`] is
//! registered and shared read-only by every document of that type.

mod config;
mod rules;

pub use config::{AttachmentsConfig, MatcherConfig, PolicyConfig};
pub use rules::{AttachmentMatcher, Policy, PolicyBuilder, PropertyFilter, RESERVED_PROPERTIES};

use std::sync::Arc;

use crate::observability::{log_event_with_fields, Event};

/// A named document type bound to its policy
#[derive(Debug, Clone)]
pub struct DocumentType {
    name: String,
    policy: Arc<Policy>,
}

impl DocumentType {
    /// Register a document type. The policy cannot change afterwards.
    pub fn register(name: impl Into<String>, policy: Policy) -> Self {
        let name = name.into();
        let mode = match policy.property_filter() {
            PropertyFilter::Remember(_) => "remember",
            PropertyFilter::Forget(_) => "forget",
        };
        log_event_with_fields(
            Event::PolicyConfigured,
            &[
                ("attachments", if policy.remembers_attachments() { "on" } else { "off" }),
                ("mode", mode),
                ("type", name.as_str()),
            ],
        );
        Self {
            name,
            policy: Arc::new(policy),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &Arc<Policy> {
        &self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_shares_policy() {
        let book = DocumentType::register("Book", Policy::default());
        let copy = book.clone();
        assert_eq!(book.name(), "Book");
        assert!(Arc::ptr_eq(book.policy(), copy.policy()));
    }
}
