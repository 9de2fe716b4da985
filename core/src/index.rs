use crate::tokenizer::analyze;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Document identifier: the file basename. Files sharing a basename in
/// different corpus sub-directories collide in the index; the corpus layout
/// is expected to keep basenames unique per build.
pub type DocId = String;

/// Term frequencies for a single document.
pub type TermCounts = BTreeMap<String, u32>;

/// Term -> document -> occurrence count.
///
/// Partial and full indexes share this shape; a partial index is simply one
/// built from a subset of the corpus, pending [`InvertedIndex::merge`].
/// Ordered maps keep serialization deterministic, so indexes built by
/// different merge orders can be compared byte-for-byte.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvertedIndex {
    postings: BTreeMap<String, BTreeMap<DocId, u32>>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Number of distinct terms.
    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }

    /// Postings map for one term, if indexed.
    pub fn postings(&self, term: &str) -> Option<&BTreeMap<DocId, u32>> {
        self.postings.get(term)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<DocId, u32>)> {
        self.postings.iter()
    }

    /// Record one posting, summing with any existing count for (term, doc).
    pub fn add(&mut self, term: String, doc: DocId, count: u32) {
        let slot = self
            .postings
            .entry(term)
            .or_default()
            .entry(doc)
            .or_insert(0);
        *slot = slot.saturating_add(count);
    }

    /// Fold one document's term frequencies into the index.
    pub fn insert_document(&mut self, doc: &str, counts: TermCounts) {
        for (term, count) in counts {
            self.add(term, doc.to_string(), count);
        }
    }

    /// Merge another (partial) index into this one, summing counts per
    /// (term, document) pair.
    ///
    /// Associative and commutative, which is what lets a hierarchical
    /// map/combine/reduce build and a flat sequential build produce identical
    /// output. Inputs must come from disjoint document sets; merging overlapping
    /// partials double-counts.
    pub fn merge(&mut self, other: InvertedIndex) {
        for (term, docs) in other.postings {
            for (doc, count) in docs {
                self.add(term.clone(), doc, count);
            }
        }
    }
}

/// Merge any number of partial indexes into one.
pub fn aggregate<I>(parts: I) -> InvertedIndex
where
    I: IntoIterator<Item = InvertedIndex>,
{
    let mut out = InvertedIndex::new();
    for part in parts {
        out.merge(part);
    }
    out
}

/// Turn one document's raw bytes into its term -> frequency map.
///
/// Unreadable or empty documents yield an empty map with a warning; a build
/// carries on past them.
pub fn process_document(path: &Path) -> TermCounts {
    let text = match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "failed to read document");
            return TermCounts::new();
        }
    };
    if text.is_empty() {
        tracing::warn!(path = %path.display(), "empty document");
        return TermCounts::new();
    }
    let mut counts = TermCounts::new();
    for term in analyze(&text) {
        *counts.entry(term).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(entries: &[(&str, &str, u32)]) -> InvertedIndex {
        let mut out = InvertedIndex::new();
        for (term, doc, count) in entries {
            out.add(term.to_string(), doc.to_string(), *count);
        }
        out
    }

    #[test]
    fn merge_sums_counts() {
        let mut a = idx(&[("cloud", "doc1.txt", 3), ("cloud", "doc2.txt", 1)]);
        let b = idx(&[("cloud", "doc1.txt", 2), ("rain", "doc3.txt", 4)]);
        a.merge(b);
        assert_eq!(a.postings("cloud").unwrap()["doc1.txt"], 5);
        assert_eq!(a.postings("cloud").unwrap()["doc2.txt"], 1);
        assert_eq!(a.postings("rain").unwrap()["doc3.txt"], 4);
    }

    #[test]
    fn merge_is_commutative() {
        let a = idx(&[("sun", "a.txt", 1), ("moon", "a.txt", 2)]);
        let b = idx(&[("sun", "b.txt", 7)]);
        let ab = aggregate([a.clone(), b.clone()]);
        let ba = aggregate([b, a]);
        assert_eq!(ab, ba);
    }

    #[test]
    fn merge_is_associative() {
        let a = idx(&[("x", "a.txt", 1)]);
        let b = idx(&[("x", "b.txt", 2)]);
        let c = idx(&[("y", "c.txt", 3)]);
        let left = aggregate([aggregate([a.clone(), b.clone()]), c.clone()]);
        let right = aggregate([a, aggregate([b, c])]);
        assert_eq!(left, right);
    }
}
