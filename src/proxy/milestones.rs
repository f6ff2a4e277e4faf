//! Milestone views

use std::cell::OnceCell;
use std::rc::Rc;

use crate::errors::{VersioningError, VersioningResult};
use crate::milestone::{Annotations, Milestone};
use crate::revision::RevisionId;
use crate::versioned::VersionedDocument;

#[derive(Debug)]
pub(super) struct MilestoneEntry {
    index: usize,
    instance: OnceCell<Rc<VersionedDocument>>,
}

/// The milestone ledger of a document, indexed from 1
#[derive(Debug, Clone, Copy)]
pub struct Milestones<'a> {
    doc: &'a VersionedDocument,
}

impl<'a> Milestones<'a> {
    pub(crate) fn new(doc: &'a VersionedDocument) -> Self {
        Self { doc }
    }

    pub fn count(&self) -> usize {
        self.doc.document().milestones().len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Milestone `n`, or `None` outside `1..=count`
    pub fn get(&self, n: usize) -> Option<MilestoneProxy<'a>> {
        if n == 0 || n > self.count() {
            return None;
        }
        let mut cache = self.doc.proxy_cache().borrow_mut();
        while cache.milestones.len() < n {
            let index = cache.milestones.len();
            cache.milestones.push(Rc::new(MilestoneEntry {
                index,
                instance: OnceCell::new(),
            }));
        }
        Some(MilestoneProxy {
            doc: self.doc,
            entry: Rc::clone(&cache.milestones[n - 1]),
        })
    }

    pub fn first(&self) -> Option<MilestoneProxy<'a>> {
        self.get(1)
    }

    pub fn last(&self) -> Option<MilestoneProxy<'a>> {
        self.get(self.count())
    }

    pub fn iter(&self) -> impl Iterator<Item = MilestoneProxy<'a>> {
        let milestones = *self;
        (1..=milestones.count()).filter_map(move |n| milestones.get(n))
    }
}

/// One ledger entry
#[derive(Debug, Clone)]
pub struct MilestoneProxy<'a> {
    doc: &'a VersionedDocument,
    entry: Rc<MilestoneEntry>,
}

impl<'a> MilestoneProxy<'a> {
    pub fn milestone(&self) -> &'a Milestone {
        &self.doc.document().milestones()[self.entry.index]
    }

    pub fn version(&self) -> &'a RevisionId {
        self.milestone().version()
    }

    pub fn version_number(&self) -> VersioningResult<u64> {
        self.version().ordinal()
    }

    pub fn annotations(&self) -> &'a Annotations {
        self.milestone().annotations()
    }

    /// The document as of this milestone, shared with the version view
    pub fn instance(&self) -> VersioningResult<Rc<VersionedDocument>> {
        if let Some(instance) = self.entry.instance.get() {
            return Ok(Rc::clone(instance));
        }
        let n = self.version_number()?;
        let version = self.doc.versions().get(n).ok_or_else(|| {
            VersioningError::VersionNotFound(i64::try_from(n).unwrap_or(i64::MAX))
        })?;
        let instance = version.instance()?;
        Ok(Rc::clone(self.entry.instance.get_or_init(|| instance)))
    }
}
