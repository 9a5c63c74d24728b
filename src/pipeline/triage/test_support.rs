//! Collaborator doubles shared by the triage tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::types::{AnswerGenerator, InformationIndex, QuestionIndex, SimilarityScorer};
use super::TriageError;
use crate::models::Document;

/// Scores a candidate by the first rule whose needle it contains.
pub struct ScriptedScorer {
    rules: Vec<(String, f64)>,
    default: f64,
}

impl ScriptedScorer {
    pub fn new(default: f64) -> Self {
        Self {
            rules: Vec::new(),
            default,
        }
    }

    pub fn with_rule(mut self, needle: &str, score: f64) -> Self {
        self.rules.push((needle.to_string(), score));
        self
    }
}

impl SimilarityScorer for ScriptedScorer {
    fn score(&self, _query: &str, candidate: &str) -> Result<f64, TriageError> {
        Ok(self
            .rules
            .iter()
            .find(|(needle, _)| candidate.contains(needle.as_str()))
            .map_or(self.default, |(_, score)| *score))
    }
}

pub struct FailingScorer;

impl SimilarityScorer for FailingScorer {
    fn score(&self, _query: &str, _candidate: &str) -> Result<f64, TriageError> {
        Err(TriageError::Scorer("reranker unavailable".into()))
    }
}

pub struct FailingIndex;

impl QuestionIndex for FailingIndex {
    fn top_k(&self, _query: &str, _k: usize) -> Result<Vec<Document>, TriageError> {
        Err(TriageError::Retrieval("index unavailable".into()))
    }
}

impl InformationIndex for FailingIndex {
    fn filter_by_disease(&self, _disease: &str, _k: usize) -> Result<Vec<Document>, TriageError> {
        Err(TriageError::Retrieval("index unavailable".into()))
    }

    fn diseases(&self, _limit: usize) -> Result<Vec<String>, TriageError> {
        Err(TriageError::Retrieval("index unavailable".into()))
    }
}

/// Echoes its inputs so tests can see what reached generation.
#[derive(Default)]
pub struct MockGenerator {
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AnswerGenerator for MockGenerator {
    fn generate(
        &self,
        context: &str,
        question: &str,
        previous_symptoms: &str,
    ) -> Result<String, TriageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "context=[{context}] question=[{question}] symptoms=[{previous_symptoms}]"
        ))
    }
}

pub struct FailingGenerator;

impl AnswerGenerator for FailingGenerator {
    fn generate(&self, _: &str, _: &str, _: &str) -> Result<String, TriageError> {
        Err(TriageError::Connection {
            service: "Ollama",
            url: "http://localhost:11434".into(),
        })
    }
}
