//! Range-aware, TTL-bounded memo of prior answers.
//!
//! Each key owns one entry. Fetches for the same key merge into it while it
//! is fresh: the covered range grows to the bounding union and documents are
//! unioned by id. An expired entry is replaced outright by the next fetch.
//! Entries are only dropped by [`HistoryCache::clear`].

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use searchsync_core::{CacheKey, Document, Window};
use serde_json::{Map, Value};

/// Row range `[start, end)` an entry is known to cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Range covered by a fetch made with `window` that returned `received` rows.
    ///
    /// Without a limit the received length stands in for it.
    pub fn fetched(window: Window, received: usize) -> Self {
        let start = window.start();
        Self { start, end: start.saturating_add(window.limit.unwrap_or(received)) }
    }

    /// Bounding union of two ranges.
    pub fn union(self, other: Range) -> Range {
        Range { start: self.start.min(other.start), end: self.end.max(other.end) }
    }

    pub fn contains(&self, other: &Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// One memoized answer.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Documents in range order, unique by canonical id.
    pub documents: Vec<Document>,
    pub range: Range,
    pub loaded_at: Instant,
    pub metadata: Map<String, Value>,
}

impl CacheEntry {
    pub fn new(documents: Vec<Document>, range: Range, loaded_at: Instant, metadata: Map<String, Value>) -> Self {
        Self { documents: dedupe(documents), range, loaded_at, metadata }
    }

    /// Whether the entry is still young enough to reuse.
    pub fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.loaded_at) < ttl
    }

    fn absorb(&mut self, newer: CacheEntry) {
        let (first, second) = if newer.range.start < self.range.start {
            (newer.documents, std::mem::take(&mut self.documents))
        } else {
            (std::mem::take(&mut self.documents), newer.documents)
        };
        self.documents = union_by_id(first, second);
        self.range = self.range.union(newer.range);
        self.loaded_at = self.loaded_at.min(newer.loaded_at);
        if !newer.metadata.is_empty() {
            self.metadata = newer.metadata;
        }
    }
}

/// Keyed history of prior answers, exclusively owned by one search source.
#[derive(Debug, Default)]
pub struct HistoryCache {
    entries: HashMap<CacheKey, CacheEntry>,
}

impl HistoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the entry for `key` can answer a request for `window`.
    ///
    /// True iff an entry exists, is younger than `ttl`, and (when a sub-range
    /// was requested) fully covers `[skip, skip + limit)`. A request with a
    /// skip but no limit asks for an open-ended range and is never covered.
    pub fn is_eligible(&self, key: &CacheKey, window: Window, ttl: Duration, now: Instant) -> bool {
        let Some(entry) = self.entries.get(key) else {
            return false;
        };
        if !entry.is_fresh(ttl, now) {
            return false;
        }
        if !window.is_bounded() {
            return true;
        }
        match window.end() {
            Some(end) => entry.range.contains(&Range::new(window.start(), end)),
            None => false,
        }
    }

    /// Narrow `window` to the rows the entry for `key` does not already cover.
    ///
    /// Only a covered prefix of a fresh entry is subtracted: when the request
    /// starts inside the covered range and runs past its end, the fetch is
    /// moved to start at the covered end. Anything else, including any request
    /// against an expired entry, is returned unchanged.
    pub fn trim(&self, key: &CacheKey, window: Window, ttl: Duration, now: Instant) -> Window {
        let Some(entry) = self.entries.get(key).filter(|entry| entry.is_fresh(ttl, now)) else {
            return window;
        };
        let covered = entry.range;
        let start = window.start();
        if start < covered.start || start >= covered.end {
            return window;
        }
        match window.end() {
            Some(end) if end > covered.end => Window::new(Some(covered.end), Some(end - covered.end)),
            Some(_) => window,
            None => Window::new(Some(covered.end), None),
        }
    }

    /// Merge a new answer into the entry for `key`, returning the result.
    ///
    /// While the stored entry is younger than `ttl` (measured at the new
    /// answer's load time) ranges grow to their bounding union and documents
    /// to their id union, and documents seen again take their newer body. The
    /// merged entry keeps the older load time, so no row outlives its TTL.
    /// An expired entry is replaced by the new answer.
    pub fn merge(&mut self, key: CacheKey, entry: CacheEntry, ttl: Duration) -> &CacheEntry {
        match self.entries.entry(key) {
            std::collections::hash_map::Entry::Occupied(mut slot) => {
                if slot.get().is_fresh(ttl, entry.loaded_at) {
                    slot.get_mut().absorb(entry);
                } else {
                    slot.insert(entry);
                }
                slot.into_mut()
            }
            std::collections::hash_map::Entry::Vacant(slot) => slot.insert(entry),
        }
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn dedupe(documents: Vec<Document>) -> Vec<Document> {
    union_by_id(documents, Vec::new())
}

/// Concatenate two sequences keeping the first position of every id and the
/// last body seen for it.
fn union_by_id(first: Vec<Document>, second: Vec<Document>) -> Vec<Document> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<Document> = Vec::with_capacity(first.len() + second.len());
    for doc in first.into_iter().chain(second) {
        match positions.get(&doc.key()) {
            Some(&idx) => merged[idx] = doc,
            None => {
                positions.insert(doc.key(), merged.len());
                merged.push(doc);
            }
        }
    }
    merged
}

/// Canonical ids of a document sequence.
pub fn id_set(documents: &[Document]) -> HashSet<String> {
    documents.iter().map(Document::key).collect()
}
