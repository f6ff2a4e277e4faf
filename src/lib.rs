//! memories - transparent version history for stored documents
//!
//! Every save snapshots the state it replaces, so earlier states can be
//! inspected, enumerated, tagged as milestones, or restored.
//!
//! ```ignore
//! use std::sync::Arc;
//! use memories::{DocumentType, MemoryStore, Policy, VersionedDocument};
//!
//! let book = DocumentType::register("Book", Policy::default());
//! let mut doc = VersionedDocument::new(&book, Arc::new(MemoryStore::new()));
//! doc.set("title", "first")?;
//! doc.save()?;
//! doc.set("title", "second")?;
//! doc.save()?;
//! doc.revert_to(1)?;
//! assert_eq!(doc.get_str("title"), Some("first"));
//! ```

pub mod errors;
pub mod milestone;
pub mod observability;
pub mod policy;
pub mod proxy;
pub mod revision;
pub mod snapshot;
pub mod store;
pub mod versioned;

pub use errors::{VersioningError, VersioningResult};
pub use milestone::{Annotations, Milestone};
pub use policy::{AttachmentMatcher, DocumentType, Policy, PolicyBuilder, PolicyConfig};
pub use proxy::{MilestoneProxy, Milestones, VersionProxy, Versions};
pub use revision::{RevisionId, VersionRef};
pub use store::{Attachment, Document, DocumentStore, LocalStore, MemoryStore, StoreError};
pub use versioned::{RevertMode, VersionedDocument};
