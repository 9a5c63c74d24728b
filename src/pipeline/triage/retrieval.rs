use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::types::{InformationIndex, QuestionIndex};
use super::TriageError;
use crate::models::{canonical_disease_name, Document};

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\w+").expect("word pattern is valid")
});

fn tokens(text: &str) -> HashSet<String> {
    WORD_RE
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

/// In-memory document index ranked by shared word count.
///
/// Serves both as question index and information index for tests and for
/// running the dialogue against a fixed corpus without external services.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIndex {
    documents: Vec<Document>,
}

impl InMemoryIndex {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn add(&mut self, document: Document) {
        self.documents.push(document);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl QuestionIndex for InMemoryIndex {
    fn top_k(&self, query: &str, k: usize) -> Result<Vec<Document>, TriageError> {
        let query_tokens = tokens(query);
        let mut scored: Vec<(usize, &Document)> = self
            .documents
            .iter()
            .map(|doc| (tokens(&doc.text).intersection(&query_tokens).count(), doc))
            .filter(|(shared, _)| *shared > 0)
            .collect();

        // Stable: equal overlap keeps insertion order
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, doc)| doc.clone())
            .collect())
    }
}

impl InformationIndex for InMemoryIndex {
    fn filter_by_disease(&self, disease: &str, k: usize) -> Result<Vec<Document>, TriageError> {
        let wanted = canonical_disease_name(disease);
        Ok(self
            .documents
            .iter()
            .filter(|doc| doc.disease().as_deref() == Some(wanted.as_str()))
            .take(k)
            .cloned()
            .collect())
    }

    fn diseases(&self, limit: usize) -> Result<Vec<String>, TriageError> {
        Ok(self
            .documents
            .iter()
            .take(limit)
            .filter_map(|doc| doc.metadata.disease.clone())
            .collect())
    }
}
