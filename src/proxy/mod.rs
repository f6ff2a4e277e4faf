//! # Version and Milestone Views
//!
//! Read-only, lazily populated views over a document's version range and its
//! milestone ledger.
//!
//! - `versions`: [`Versions`] and [`VersionProxy`], indexed `1..=current_version`
//! - `milestones`: [`Milestones`] and [`MilestoneProxy`], indexed from 1
//!
//! Proxy entries are created on first access and cached on the document
//! that owns them. The cache only grows: requesting a higher index extends
//! it, lower indices are reused. Historic instances are materialized once
//! per entry; the current version's instance is always a fresh copy of the
//! live document.

mod milestones;
mod versions;

pub use milestones::{MilestoneProxy, Milestones};
pub use versions::{VersionProxy, Versions};

use std::rc::Rc;

use milestones::MilestoneEntry;
use versions::VersionEntry;

/// Proxy entries owned by one [`crate::VersionedDocument`]
#[derive(Debug, Default)]
pub(crate) struct ProxyCache {
    versions: Vec<Rc<VersionEntry>>,
    milestones: Vec<Rc<MilestoneEntry>>,
}
