//! # Document Store
//!
//! The collaborator surface the versioning engine runs against, plus two
//! backends: an in-memory store and a checksummed filesystem store.

pub mod errors;
pub mod backend;
pub mod checksum;
pub mod document;
pub mod memory;
pub mod local;

pub use errors::{StoreError, StoreResult};
pub use backend::DocumentStore;
pub use document::{Attachment, Document, DOCUMENT_KEYS};
pub use memory::MemoryStore;
pub use local::LocalStore;
