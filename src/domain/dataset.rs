//! Run-scoped dataset and deduplicating accumulator
//!
//! The accumulator owns both the growing dataset and the set of identities
//! seen during one run. It is moved through the pipeline, never shared, so
//! every `offer` is serialized by construction.

use std::collections::HashSet;

use tracing::debug;

use super::identity::{IdentityResolver, RecordId};
use super::record::{Record, RecordDraft};

/// Records in acceptance order; no two share an `id`
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Identities already accepted in the current run
pub type SeenIdentities = HashSet<RecordId>;

/// Grows a [`Dataset`], rejecting drafts whose identity was already seen
#[derive(Debug, Default)]
pub struct DedupAccumulator {
    dataset: Dataset,
    seen: SeenIdentities,
    duplicates: usize,
}

impl DedupAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a draft. Returns the finalized record, or `None` for a duplicate.
    pub fn offer(&mut self, draft: RecordDraft) -> Option<&Record> {
        let id = IdentityResolver::resolve(&draft);
        if self.seen.contains(&id) {
            self.duplicates += 1;
            debug!(identity = %id, filer = %draft.filer, "Duplicate record skipped");
            return None;
        }

        self.seen.insert(id.clone());
        self.dataset.records.push(Record::from_draft(id, draft));
        self.dataset.records.last()
    }

    pub fn accepted(&self) -> usize {
        self.dataset.len()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn into_dataset(self) -> Dataset {
        self.dataset
    }
}
