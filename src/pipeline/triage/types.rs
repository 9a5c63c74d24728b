use super::TriageError;
use crate::models::Document;

/// Relevance scorer (cross-encoder style): higher means more similar.
pub trait SimilarityScorer: Send + Sync {
    fn score(&self, query: &str, candidate: &str) -> Result<f64, TriageError>;

    /// Score many candidates against one query, preserving input order.
    fn score_batch(&self, query: &str, candidates: &[&str]) -> Result<Vec<f64>, TriageError> {
        candidates
            .iter()
            .map(|candidate| self.score(query, candidate))
            .collect()
    }
}

/// Index of reference questions, each tagged with the disease it belongs to.
pub trait QuestionIndex: Send + Sync {
    fn top_k(&self, query: &str, k: usize) -> Result<Vec<Document>, TriageError>;
}

/// Index of information passages about diseases.
pub trait InformationIndex: Send + Sync {
    /// Passages whose disease tag equals `disease` exactly.
    fn filter_by_disease(&self, disease: &str, k: usize) -> Result<Vec<Document>, TriageError>;

    /// Disease tags present in the index (raw, not canonicalized), up to `limit` documents scanned.
    fn diseases(&self, limit: usize) -> Result<Vec<String>, TriageError>;
}

/// Natural-language answer generation from retrieved context.
pub trait AnswerGenerator: Send + Sync {
    fn generate(
        &self,
        context: &str,
        question: &str,
        previous_symptoms: &str,
    ) -> Result<String, TriageError>;
}

/// Fuzzy substring similarity on a 0–100 scale.
pub trait FuzzyMatcher: Send + Sync {
    fn partial_ratio(&self, a: &str, b: &str) -> u8;
}
