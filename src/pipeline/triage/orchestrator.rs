use std::sync::Arc;

use super::intent::IntentClassifier;
use super::name_match::DiseaseCatalog;
use super::prompt::{candidate_context, outcome_message};
use super::resolution::{DiseaseResolver, Resolution};
use super::rewrite::rewrite_context;
use super::types::{
    AnswerGenerator, FuzzyMatcher, InformationIndex, QuestionIndex, SimilarityScorer,
};
use super::TriageError;
use crate::config::ResolutionPolicy;
use crate::models::{ClassificationResult, QueryContext, ResolutionOutcome, SymptomSet};

/// External capabilities one turn depends on.
#[derive(Clone)]
pub struct Collaborators {
    /// Scores utterances against intent exemplars.
    pub intent_scorer: Arc<dyn SimilarityScorer>,
    /// Scores the query against retrieved reference questions.
    pub reranker: Arc<dyn SimilarityScorer>,
    pub questions: Arc<dyn QuestionIndex>,
    pub information: Arc<dyn InformationIndex>,
    pub generator: Arc<dyn AnswerGenerator>,
    pub matcher: Arc<dyn FuzzyMatcher>,
}

/// Everything one turn produced. Nothing here has been committed to a
/// session yet.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnResult {
    pub classification: ClassificationResult,
    pub query: QueryContext,
    pub outcome: ResolutionOutcome,
    pub response: String,
    pub possible_diseases: Vec<String>,
    /// Symptom state to store; empty leaves the session untouched.
    pub symptoms: SymptomSet,
    pub ask_confirmation: bool,
}

/// Full triage pipeline for one utterance.
///
/// Coordinates: classify → rewrite → resolve → generate.
pub struct TriagePipeline {
    classifier: IntentClassifier,
    resolver: DiseaseResolver,
    generator: Arc<dyn AnswerGenerator>,
    catalog: DiseaseCatalog,
}

impl TriagePipeline {
    /// Build the pipeline and load the disease catalog from the
    /// information index.
    pub fn new(collaborators: Collaborators, policy: ResolutionPolicy) -> Self {
        let catalog = DiseaseCatalog::load(collaborators.information.as_ref());
        Self::with_catalog(collaborators, policy, catalog)
    }

    pub fn with_catalog(
        collaborators: Collaborators,
        policy: ResolutionPolicy,
        catalog: DiseaseCatalog,
    ) -> Self {
        let classifier = IntentClassifier::new(collaborators.intent_scorer, &policy);
        let resolver = DiseaseResolver::new(
            collaborators.questions,
            collaborators.information,
            collaborators.reranker,
            collaborators.matcher,
            policy,
        );
        Self {
            classifier,
            resolver,
            generator: collaborators.generator,
            catalog,
        }
    }

    pub fn catalog(&self) -> &DiseaseCatalog {
        &self.catalog
    }

    /// Run one turn against the symptoms carried by the session.
    pub fn run_turn(
        &self,
        utterance: &str,
        previous_symptoms: &SymptomSet,
    ) -> Result<TurnResult, TriageError> {
        // Step 1: Classify
        let classification = self.classifier.classify(utterance, previous_symptoms)?;

        // Step 2: Rewrite into a resolver query
        let query = rewrite_context(&classification, utterance, previous_symptoms);

        // Step 3: Resolve
        let resolution = self.resolver.resolve(&query, &self.catalog)?;
        let possible_diseases = resolution.outcome.possible_diseases();

        // Step 4: Generate for outcomes that name diseases
        let response = match &resolution.outcome {
            ResolutionOutcome::Confirmed { context, .. } => {
                self.answer(context, utterance, &resolution, &possible_diseases)?
            }
            ResolutionOutcome::Ambiguous { .. } => {
                self.answer("", utterance, &resolution, &possible_diseases)?
            }
            ResolutionOutcome::NoMatch { .. } | ResolutionOutcome::ConfirmationRequested => {
                outcome_message(&resolution.outcome)
            }
        };

        Ok(TurnResult {
            ask_confirmation: query.ask_confirmation,
            classification,
            query,
            outcome: resolution.outcome,
            response,
            possible_diseases,
            symptoms: resolution.symptoms,
        })
    }

    fn answer(
        &self,
        context: &str,
        utterance: &str,
        resolution: &Resolution,
        possible_diseases: &[String],
    ) -> Result<String, TriageError> {
        let context = if context.is_empty() && !possible_diseases.is_empty() {
            candidate_context(possible_diseases)
        } else {
            context.to_string()
        };

        let generated = self
            .generator
            .generate(&context, utterance, resolution.symptoms.as_str())?;
        if generated.trim().is_empty() {
            tracing::warn!("Generator returned empty answer, using fixed reply");
            return Ok(outcome_message(&resolution.outcome));
        }
        Ok(generated.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, IntentLabel, NoMatchReason};
    use crate::pipeline::triage::name_match::PartialRatioMatcher;
    use crate::pipeline::triage::prompt::CONFIRMATION_MESSAGE;
    use crate::pipeline::triage::retrieval::InMemoryIndex;
    use crate::pipeline::triage::test_support::{
        FailingGenerator, MockGenerator, ScriptedScorer,
    };

    const DIAGNOSE_MARKER: &str = "tôi có thể bị bệnh gì";

    fn questions() -> InMemoryIndex {
        InMemoryIndex::new(vec![
            Document::tagged("đau đầu mẫu một", "Bệnh A"),
            Document::tagged("đau đầu mẫu hai", "Bệnh B"),
        ])
    }

    fn information() -> InMemoryIndex {
        InMemoryIndex::new(vec![
            Document::tagged("Bệnh A gây đau đầu.", "Bệnh A"),
            Document::tagged("Bệnh B gây chóng mặt.", "Bệnh B"),
        ])
    }

    fn pipeline(a: f64, b: f64, generator: Arc<dyn AnswerGenerator>) -> TriagePipeline {
        let collaborators = Collaborators {
            intent_scorer: Arc::new(ScriptedScorer::new(0.1).with_rule(DIAGNOSE_MARKER, 0.9)),
            reranker: Arc::new(
                ScriptedScorer::new(0.0)
                    .with_rule("mẫu một", a)
                    .with_rule("mẫu hai", b),
            ),
            questions: Arc::new(questions()),
            information: Arc::new(information()),
            generator,
            matcher: Arc::new(PartialRatioMatcher),
        };
        TriagePipeline::new(collaborators, ResolutionPolicy::default())
    }

    #[test]
    fn clear_winner_is_confirmed_and_answered() {
        let generator = Arc::new(MockGenerator::default());
        let result = pipeline(1.0, 0.6, generator.clone())
            .run_turn("đau đầu", &SymptomSet::empty())
            .unwrap();

        match &result.outcome {
            ResolutionOutcome::Confirmed { disease, .. } => assert_eq!(disease, "Bệnh A"),
            other => panic!("Expected Confirmed, got: {other:?}"),
        }
        assert_eq!(result.possible_diseases, vec!["Bệnh A"]);
        assert!(result.response.contains("context=[Bệnh A gây đau đầu.]"));
        assert!(result.response.contains("question=[đau đầu]"));
        assert_eq!(generator.calls(), 1);
    }

    #[test]
    fn close_scores_are_ambiguous_with_candidate_context() {
        let generator = Arc::new(MockGenerator::default());
        let result = pipeline(0.95, 0.90, generator.clone())
            .run_turn("đau đầu", &SymptomSet::empty())
            .unwrap();

        assert!(matches!(result.outcome, ResolutionOutcome::Ambiguous { .. }));
        assert_eq!(result.possible_diseases, vec!["Bệnh A", "Bệnh B"]);
        assert!(result
            .response
            .contains("context=[Các bệnh có thể liên quan: Bệnh A, Bệnh B]"));
    }

    #[test]
    fn reference_turn_asks_without_generation() {
        let generator = Arc::new(MockGenerator::default());
        let result = pipeline(1.0, 0.6, generator.clone())
            .run_turn("Bệnh này có nguy hiểm không", &SymptomSet::from("sốt"))
            .unwrap();

        assert_eq!(result.classification.label, IntentLabel::ReferenceLast);
        assert_eq!(result.outcome, ResolutionOutcome::ConfirmationRequested);
        assert_eq!(result.response, CONFIRMATION_MESSAGE);
        assert!(result.ask_confirmation);
        assert_eq!(result.symptoms.as_str(), "sốt");
        assert_eq!(generator.calls(), 0);
    }

    #[test]
    fn no_candidates_returns_guidance_without_generation() {
        let generator = Arc::new(MockGenerator::default());
        let result = pipeline(1.0, 0.6, generator.clone())
            .run_turn("khó thở", &SymptomSet::empty())
            .unwrap();

        assert_eq!(
            result.outcome,
            ResolutionOutcome::NoMatch { reason: NoMatchReason::NoCandidates }
        );
        assert_eq!(generator.calls(), 0);
        assert!(result.possible_diseases.is_empty());
    }

    #[test]
    fn generation_failure_fails_the_turn() {
        let err = pipeline(1.0, 0.6, Arc::new(FailingGenerator))
            .run_turn("đau đầu", &SymptomSet::empty())
            .unwrap_err();
        assert!(matches!(err, TriageError::Connection { .. }));
    }

    #[test]
    fn catalog_is_loaded_from_information_index() {
        let pipeline = pipeline(1.0, 0.6, Arc::new(MockGenerator::default()));
        assert_eq!(pipeline.catalog().len(), 2);
    }
}
