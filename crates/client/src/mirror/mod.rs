//! In-memory mirror of the authoritative result set.
//!
//! The mirror is reconciled against every authoritative answer rather than
//! replaced: incoming documents are upserted by canonical id and residents
//! missing from the answer are removed. Unsorted reads return documents in
//! the order of the last reconciliation.

pub mod selector;

use std::collections::{HashMap, HashSet};

use searchsync_core::Document;

pub use selector::{DocTransform, FindOptions, Selector, compare_documents};

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
}

/// Document set keyed by canonical id.
#[derive(Debug, Default)]
pub struct MirrorStore {
    docs: HashMap<String, Document>,
    order: Vec<String>,
}

impl MirrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.docs.get(id)
    }

    /// Canonical ids currently resident.
    pub fn ids(&self) -> HashSet<String> {
        self.docs.keys().cloned().collect()
    }

    /// Make the mirror hold exactly `documents`.
    ///
    /// Every incoming document is upserted by id; every resident whose id is
    /// absent from the incoming set is deleted. When an id repeats, the last
    /// body wins and the first position is kept.
    pub fn reconcile(&mut self, documents: Vec<Document>) -> ReconcileStats {
        let mut stats = ReconcileStats::default();
        let mut incoming: HashSet<String> = HashSet::with_capacity(documents.len());
        let mut order = Vec::with_capacity(documents.len());

        for doc in documents {
            let key = doc.key();
            if incoming.insert(key.clone()) {
                order.push(key.clone());
            }
            match self.docs.insert(key, doc) {
                Some(_) => stats.updated += 1,
                None => stats.inserted += 1,
            }
        }

        let before = self.docs.len();
        self.docs.retain(|key, _| incoming.contains(key));
        stats.removed = before - self.docs.len();
        self.order = order;

        tracing::debug!(
            inserted = stats.inserted,
            updated = stats.updated,
            removed = stats.removed,
            resident = self.docs.len(),
            "mirror reconciled"
        );

        stats
    }

    /// Read documents matching `selector`, then sort, limit and transform.
    pub fn find(&self, selector: &Selector, options: &FindOptions) -> Vec<Document> {
        let mut matched: Vec<&Document> = self
            .order
            .iter()
            .filter_map(|key| self.docs.get(key))
            .filter(|doc| selector.matches(doc))
            .collect();

        if !options.sort.is_empty() {
            matched.sort_by(|a, b| compare_documents(a, b, &options.sort));
        }

        let limit = options.limit.unwrap_or(usize::MAX);
        matched
            .into_iter()
            .take(limit)
            .cloned()
            .map(|doc| match &options.transform {
                Some(transform) => transform(doc),
                None => doc,
            })
            .collect()
    }
}
