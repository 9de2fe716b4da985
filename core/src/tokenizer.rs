use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"(?u)[\p{L}\p{N}]+").expect("valid regex");
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "could","did","do","does","doing","down","during","each","few","for","from","further",
            "had","has","have","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","it","its","itself","just",
            "me","more","most","my","myself","no","nor","not","now",
            "of","off","on","once","only","or","other","our","ours","ourselves","out","over","own",
            "same","she","should","so","some","such",
            "than","that","the","their","theirs","them","themselves","then","there","these","they",
            "this","those","through","to","too","under","until","up","very","was","we","were",
            "what","when","where","which","while","who","whom","why","with",
            "you","your","yours","yourself","yourselves",
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Split text into lowercase alphanumeric tokens. Every non-alphanumeric
/// character acts as a delimiter; empty tokens are never produced.
pub fn normalize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Reduce a word to its canonical term, or `None` for stop-words.
///
/// The suffix rules are deliberately small and idempotent. The same table
/// serves both the build path and the query path; a token indexed under a
/// stem must be queryable under that exact stem.
pub fn stem(word: &str) -> Option<String> {
    let w = word.to_lowercase();
    if is_stopword(&w) {
        return None;
    }
    if w.chars().count() <= 2 {
        return Some(w);
    }
    if let Some(base) = w.strip_suffix("sses") {
        return Some(format!("{base}ss"));
    }
    if let Some(base) = w.strip_suffix("ies") {
        return Some(format!("{base}y"));
    }
    if w.ends_with("ss") {
        return Some(w);
    }
    if let Some(base) = w.strip_suffix('s') {
        return Some(base.to_string());
    }
    Some(w)
}

/// Run the full pipeline over raw text: normalize, stem, drop filtered tokens.
pub fn analyze(text: &str) -> Vec<String> {
    normalize(text).iter().filter_map(|t| stem(t)).collect()
}
