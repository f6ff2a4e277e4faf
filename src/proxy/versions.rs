//! Version views

use std::cell::OnceCell;
use std::ops::{Bound, RangeBounds};
use std::rc::Rc;

use crate::errors::VersioningResult;
use crate::revision::{parse_ordinal, SNAPSHOT_PREFIX};
use crate::versioned::VersionedDocument;

/// Cached state for one version number
#[derive(Debug)]
pub(super) struct VersionEntry {
    number: u64,
    revision: OnceCell<String>,
    instance: OnceCell<Rc<VersionedDocument>>,
}

impl VersionEntry {
    fn new(number: u64) -> Self {
        Self {
            number,
            revision: OnceCell::new(),
            instance: OnceCell::new(),
        }
    }
}

/// Versions `1..=current_version` of a document
#[derive(Debug, Clone, Copy)]
pub struct Versions<'a> {
    doc: &'a VersionedDocument,
}

impl<'a> Versions<'a> {
    pub(crate) fn new(doc: &'a VersionedDocument) -> Self {
        Self { doc }
    }

    pub fn count(&self) -> u64 {
        self.doc.current_version()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Version `n`, or `None` outside `1..=count`
    pub fn get(&self, n: u64) -> Option<VersionProxy<'a>> {
        if n == 0 || n > self.count() {
            return None;
        }
        let entry = self.populate(n);
        Some(VersionProxy {
            doc: self.doc,
            entry,
        })
    }

    /// Version addressed by a bare or `rev-`-prefixed revision
    pub fn get_revision(&self, revision: &str) -> VersioningResult<Option<VersionProxy<'a>>> {
        let n = parse_ordinal(revision)?;
        Ok(self.get(n))
    }

    /// Versions in `range`, clipped to `1..=count`
    pub fn range<R: RangeBounds<u64>>(&self, range: R) -> Vec<VersionProxy<'a>> {
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 1,
        }
        .max(1);
        let end = match range.end_bound() {
            Bound::Included(&e) => e,
            Bound::Excluded(&e) => e.saturating_sub(1),
            Bound::Unbounded => u64::MAX,
        }
        .min(self.count());

        if start > end {
            return Vec::new();
        }
        (start..=end).filter_map(|n| self.get(n)).collect()
    }

    pub fn first(&self) -> Option<VersionProxy<'a>> {
        self.get(1)
    }

    pub fn last(&self) -> Option<VersionProxy<'a>> {
        self.get(self.count())
    }

    pub fn iter(&self) -> impl Iterator<Item = VersionProxy<'a>> {
        let versions = *self;
        (1..=versions.count()).filter_map(move |n| versions.get(n))
    }

    /// Extend the cache to cover `n` and return its entry
    fn populate(&self, n: u64) -> Rc<VersionEntry> {
        let mut cache = self.doc.proxy_cache().borrow_mut();
        while (cache.versions.len() as u64) < n {
            let next = cache.versions.len() as u64 + 1;
            cache.versions.push(Rc::new(VersionEntry::new(next)));
        }
        Rc::clone(&cache.versions[(n - 1) as usize])
    }
}

/// One version of a document
#[derive(Debug, Clone)]
pub struct VersionProxy<'a> {
    doc: &'a VersionedDocument,
    entry: Rc<VersionEntry>,
}

impl<'a> VersionProxy<'a> {
    pub fn version_number(&self) -> u64 {
        self.entry.number
    }

    pub fn is_current(&self) -> bool {
        self.entry.number == self.doc.current_version()
    }

    /// `rev-<revision>` naming this version; `None` for a missing snapshot
    pub fn revision(&self) -> Option<String> {
        if self.is_current() {
            return self
                .doc
                .rev()
                .map(|rev| format!("{}{}", SNAPSHOT_PREFIX, rev.as_str()));
        }
        if let Some(name) = self.entry.revision.get() {
            return Some(name.clone());
        }
        let name = self.doc.version_id(self.entry.number)?;
        Some(self.entry.revision.get_or_init(|| name).clone())
    }

    pub fn is_milestone(&self) -> bool {
        self.doc.has_milestone_at(self.entry.number)
    }

    /// A detached copy of the document as of this version.
    ///
    /// The live document is never modified. Historic copies are soft
    /// reverted once and reused.
    pub fn instance(&self) -> VersioningResult<Rc<VersionedDocument>> {
        if self.is_current() {
            return Ok(Rc::new(self.doc.clone()));
        }
        if let Some(instance) = self.entry.instance.get() {
            return Ok(Rc::clone(instance));
        }

        let mut copy = self.doc.clone();
        copy.revert_to(self.entry.number)?;
        Ok(Rc::clone(self.entry.instance.get_or_init(|| Rc::new(copy))))
    }
}
