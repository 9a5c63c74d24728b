use serde::{Deserialize, Serialize};

use super::document::Document;

/// Trim, collapse inner whitespace and capitalize each word
/// ("  sốt   xuất HUYẾT " → "Sốt Xuất Huyết").
pub fn canonical_disease_name(name: &str) -> String {
    name.split_whitespace()
        .map(capitalize_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// A disease with the summed reranker evidence for the current turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseCandidate {
    pub name: String,
    pub aggregate_score: f64,
}

/// Why resolution produced no disease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoMatchReason {
    /// The question index returned nothing for the query.
    NoCandidates,
    /// Candidates came back but none carried a disease tag.
    NoDiseaseTagged,
}

/// Terminal result of resolving one turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionOutcome {
    Confirmed {
        disease: String,
        documents: Vec<Document>,
        /// Document texts joined by blank lines, for answer generation.
        context: String,
    },
    Ambiguous {
        candidates: Vec<DiseaseCandidate>,
    },
    NoMatch {
        reason: NoMatchReason,
    },
    ConfirmationRequested,
}

impl ResolutionOutcome {
    /// Disease names worth showing the user for this outcome.
    pub fn possible_diseases(&self) -> Vec<String> {
        match self {
            Self::Confirmed { disease, .. } => vec![disease.clone()],
            Self::Ambiguous { candidates } => candidates.iter().map(|c| c.name.clone()).collect(),
            Self::NoMatch { .. } | Self::ConfirmationRequested => Vec::new(),
        }
    }
}
