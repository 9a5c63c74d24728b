use std::sync::Arc;

use super::name_match::{match_disease_name, DiseaseCatalog};
use super::types::{FuzzyMatcher, InformationIndex, QuestionIndex, SimilarityScorer};
use super::TriageError;
use crate::config::ResolutionPolicy;
use crate::models::{
    DiseaseCandidate, Document, NoMatchReason, QueryContext, ResolutionOutcome, ScoredDocument,
    SymptomSet,
};

/// Result of resolving one query: the outcome plus the working symptoms
/// the turn should leave behind.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub outcome: ResolutionOutcome,
    pub symptoms: SymptomSet,
}

/// Maps a normalized query to a disease, a shortlist, or nothing.
pub struct DiseaseResolver {
    questions: Arc<dyn QuestionIndex>,
    information: Arc<dyn InformationIndex>,
    reranker: Arc<dyn SimilarityScorer>,
    matcher: Arc<dyn FuzzyMatcher>,
    policy: ResolutionPolicy,
}

impl DiseaseResolver {
    pub fn new(
        questions: Arc<dyn QuestionIndex>,
        information: Arc<dyn InformationIndex>,
        reranker: Arc<dyn SimilarityScorer>,
        matcher: Arc<dyn FuzzyMatcher>,
        policy: ResolutionPolicy,
    ) -> Self {
        Self {
            questions,
            information,
            reranker,
            matcher,
            policy,
        }
    }

    pub fn resolve(
        &self,
        ctx: &QueryContext,
        catalog: &DiseaseCatalog,
    ) -> Result<Resolution, TriageError> {
        // Step 1: Unnamed back-reference, nothing to retrieve
        if ctx.ask_confirmation {
            return Ok(Resolution {
                outcome: ResolutionOutcome::ConfirmationRequested,
                symptoms: ctx.symptoms.clone(),
            });
        }

        // Step 2: Working symptoms for this computation
        let symptoms = if ctx.reset {
            SymptomSet::empty()
        } else {
            ctx.symptoms.clone()
        };

        // Step 3: Disease named in the query
        if let Some(disease) =
            match_disease_name(&ctx.processed_query, catalog, self.matcher.as_ref())
        {
            let outcome = self.confirm(disease)?;
            return Ok(Resolution { outcome, symptoms });
        }

        // Step 4: Retrieve reference questions
        let candidates = self
            .questions
            .top_k(&ctx.processed_query, self.policy.question_top_k)?;
        if candidates.is_empty() {
            tracing::info!(query = %ctx.processed_query, "No candidate questions retrieved");
            return Ok(Resolution {
                outcome: ResolutionOutcome::NoMatch {
                    reason: NoMatchReason::NoCandidates,
                },
                symptoms,
            });
        }

        // Step 5: Rerank
        let ranked = self.rerank(&ctx.processed_query, candidates)?;

        // Step 6: Sum evidence per disease
        let totals = aggregate_by_disease(&ranked);
        if totals.is_empty() {
            tracing::info!(candidates = ranked.len(), "No candidate carries a disease tag");
            return Ok(Resolution {
                outcome: ResolutionOutcome::NoMatch {
                    reason: NoMatchReason::NoDiseaseTagged,
                },
                symptoms,
            });
        }

        // Step 7: Margin test
        let outcome = match self.accept(&totals) {
            Some(disease) => self.confirm(disease)?,
            None => ResolutionOutcome::Ambiguous {
                candidates: totals
                    .into_iter()
                    .take(self.policy.shortlist_len)
                    .collect(),
            },
        };
        Ok(Resolution { outcome, symptoms })
    }

    fn rerank(
        &self,
        query: &str,
        documents: Vec<Document>,
    ) -> Result<Vec<ScoredDocument>, TriageError> {
        let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
        let scores = self.reranker.score_batch(query, &texts)?;
        if scores.len() != documents.len() {
            return Err(TriageError::Scorer(format!(
                "expected {} scores, got {}",
                documents.len(),
                scores.len()
            )));
        }

        let mut ranked: Vec<ScoredDocument> = documents
            .into_iter()
            .zip(scores)
            .map(|(document, score)| ScoredDocument { document, score })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(ranked)
    }

    /// Winner's name if it clears both the relative margin and the floor.
    fn accept(&self, totals: &[DiseaseCandidate]) -> Option<String> {
        let top1 = totals.first()?;
        let top2 = totals.get(1).map_or(0.0, |c| c.aggregate_score);
        let accepted = top1.aggregate_score > self.policy.margin_multiplier * top2
            && top1.aggregate_score >= self.policy.absolute_floor;

        tracing::info!(
            top1 = %top1.name,
            top1_score = top1.aggregate_score,
            top2_score = top2,
            accepted,
            "Margin test"
        );
        accepted.then(|| top1.name.clone())
    }

    fn confirm(&self, disease: String) -> Result<ResolutionOutcome, TriageError> {
        let documents = self
            .information
            .filter_by_disease(&disease, self.policy.information_top_k)?;
        if documents.is_empty() {
            tracing::warn!(disease = %disease, "Disease resolved but no information documents");
        }
        let context = documents
            .iter()
            .map(|d| d.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(ResolutionOutcome::Confirmed {
            disease,
            documents,
            context,
        })
    }
}

/// Sum scores per canonical disease, then order totals descending.
/// Equal totals keep first-seen order.
pub fn aggregate_by_disease(ranked: &[ScoredDocument]) -> Vec<DiseaseCandidate> {
    let mut totals: Vec<DiseaseCandidate> = Vec::new();
    for scored in ranked {
        let Some(disease) = scored.document.disease() else {
            continue;
        };
        match totals.iter_mut().find(|c| c.name == disease) {
            Some(candidate) => candidate.aggregate_score += scored.score,
            None => totals.push(DiseaseCandidate {
                name: disease,
                aggregate_score: scored.score,
            }),
        }
    }
    totals.sort_by(|a, b| b.aggregate_score.total_cmp(&a.aggregate_score));
    totals
}
