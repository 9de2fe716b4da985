use crate::tokenizer::stem;

/// A parsed user query: the distinct stemmed terms (first-occurrence order)
/// and the literal lowercase phrase used only for the exact-phrase bonus.
#[derive(Debug, Clone)]
pub struct Query {
    terms: Vec<String>,
    phrase: String,
}

impl Query {
    pub fn parse(raw: &str) -> Self {
        let words: Vec<&str> = raw.split_whitespace().collect();
        let mut terms: Vec<String> = Vec::new();
        for word in &words {
            if let Some(term) = stem(word) {
                if !terms.contains(&term) {
                    terms.push(term);
                }
            }
        }
        let phrase = words.join(" ").to_lowercase();
        Self { terms, phrase }
    }

    /// Distinct stemmed query terms; empty for an all-stop-word query.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Lowercased raw query joined by single spaces.
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
