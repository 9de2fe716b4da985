use crate::corpus::CorpusStore;
use crate::index::{DocId, InvertedIndex};
use crate::query::Query;
use std::collections::{BTreeMap, BTreeSet};

/// Added once when a document's postings cover every query term.
pub const ALL_TERMS_BONUS: u64 = 5;
/// Added once when the raw document text contains the literal query phrase.
pub const EXACT_PHRASE_BONUS: u64 = 10;

/// Score every document that overlaps the query.
///
/// Three additive signals: per-term occurrence counts, a flat bonus for
/// documents containing every query term, and a flat bonus for documents
/// whose raw text contains the literal phrase (those are also returned as
/// the exact-match set). Documents with no overlap get no entry at all.
pub fn score_documents(
    index: &InvertedIndex,
    query: &Query,
    corpus: &CorpusStore,
) -> (BTreeMap<DocId, u64>, Vec<DocId>) {
    let mut scores: BTreeMap<DocId, u64> = BTreeMap::new();
    for term in query.terms() {
        if let Some(postings) = index.postings(term) {
            for (doc, count) in postings {
                *scores.entry(doc.clone()).or_insert(0) += u64::from(*count);
            }
        }
    }
    if scores.is_empty() {
        return (scores, Vec::new());
    }

    let mut exact_matches = Vec::new();
    let docs: Vec<DocId> = scores.keys().cloned().collect();
    for doc in docs {
        let mut bonus = 0;
        let has_all = query
            .terms()
            .iter()
            .all(|t| index.postings(t).is_some_and(|p| p.contains_key(&doc)));
        if has_all {
            bonus += ALL_TERMS_BONUS;
        }

        // A document missing from the corpus at query time loses only the
        // phrase signal; the index-derived signals still stand.
        match corpus.read(&doc) {
            Ok(text) => {
                if text.to_lowercase().contains(query.phrase()) {
                    bonus += EXACT_PHRASE_BONUS;
                    exact_matches.push(doc.clone());
                }
            }
            Err(err) => {
                tracing::debug!(doc = %doc, %err, "skipping phrase check");
            }
        }
        if bonus > 0 {
            if let Some(score) = scores.get_mut(&doc) {
                *score += bonus;
            }
        }
    }
    (scores, exact_matches)
}

/// Documents containing every query term: the intersection of the terms'
/// posting sets. Short-circuits to empty on the first term with no postings
/// or the first empty intersection; a query with no valid terms yields the
/// empty set.
pub fn docs_with_all_terms(index: &InvertedIndex, query: &Query) -> BTreeSet<DocId> {
    let mut result: Option<BTreeSet<DocId>> = None;
    for term in query.terms() {
        let docs: BTreeSet<DocId> = match index.postings(term) {
            Some(postings) => postings.keys().cloned().collect(),
            None => return BTreeSet::new(),
        };
        let next = match result {
            None => docs,
            Some(acc) => acc.intersection(&docs).cloned().collect(),
        };
        if next.is_empty() {
            return BTreeSet::new();
        }
        result = Some(next);
    }
    result.unwrap_or_default()
}

/// Order (doc, score) pairs by descending score, document id breaking ties.
pub fn rank(scores: &BTreeMap<DocId, u64>) -> Vec<(DocId, u64)> {
    let mut ranked: Vec<(DocId, u64)> =
        scores.iter().map(|(d, s)| (d.clone(), *s)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}
