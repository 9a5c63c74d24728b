use std::sync::Arc;

use super::reference::is_reference;
use super::types::SimilarityScorer;
use super::vocabulary::{extract_symptoms, symptoms_overlap};
use super::TriageError;
use crate::config::ResolutionPolicy;
use crate::models::{ClassificationResult, IntentLabel, SymptomSet};

/// Substituted for `{symptom}` / `{disease}` when nothing was extracted.
const EMPTY_SLOT_FILLER: &str = "triệu chứng";

const INFO_NEW_DISEASE_TEMPLATES: &[&str] = &[
    "Cho tôi thông tin về {disease}",
    "Thông tin về {disease}",
    "Giải thích về {disease}",
    "Bệnh {disease} là gì",
    "Tìm hiểu về {disease}",
    "Tôi muốn biết về {disease}",
    "Tôi cần thông tin về {disease}",
    "Thông tin bệnh {disease}",
];

const DIAGNOSE_NEW_TEMPLATES: &[&str] = &[
    "Tôi bị {symptom} tôi có thể bị bệnh gì",
    "Tôi hiện đang có {symptom} tôi bị gì",
    "Có triệu chứng {symptom} tôi bị gì",
    "Cảm thấy {symptom} tôi có thể mắc bệnh gì",
    "Tôi thấy {symptom} tôi có bị bệnh không",
    "Tôi đang {symptom} có thể bị bệnh gì",
    "Tôi hiện đang có triệu chứng {symptom} tôi có thể bị bệnh gì",
    "Tôi đang gặp triệu chứng {symptom} tôi có thể bị bệnh gì",
    "Tôi thường xuyên bị {symptom} tôi có thể bị bệnh gì",
    "Tôi hay bị {symptom} tôi có thể bị bệnh gì",
    "Tôi hay gặp triệu chứng {symptom} tôi có thể bị bệnh gì",
];

const DIAGNOSE_UPDATE_TEMPLATES: &[&str] = &[
    "Tôi còn bị {symptom}",
    "Tôi còn thấy {symptom}",
    "Tôi còn",
    "Ngoài ra tôi còn {symptom}",
    "Ngoài ra",
    "Ngoài triêu chứng {symptom}",
    "Thêm triệu chứng {symptom}",
    "Cập nhật triệu chứng {symptom}",
    "Tôi cũng bị {symptom}",
    "Thêm vào {symptom}",
    "Tôi còn có triệu chứng {symptom}",
    "Tôi còn có các triệu chứng như {symptom}",
    "Tôi còn xuất hiện {symptom}",
    "Tôi còn gặp {symptom}",
    "Ngoài các triệu chứng trên, tôi còn {symptom}",
];

/// Scored categories in tie-break order.
const SCORED_INTENTS: [(IntentLabel, &[&str]); 3] = [
    (IntentLabel::InfoNewDisease, INFO_NEW_DISEASE_TEMPLATES),
    (IntentLabel::DiagnoseNew, DIAGNOSE_NEW_TEMPLATES),
    (IntentLabel::DiagnoseUpdate, DIAGNOSE_UPDATE_TEMPLATES),
];

fn fill_template(template: &str, slot: &str) -> String {
    template.replace("{symptom}", slot).replace("{disease}", slot)
}

/// Exemplar phrases of one category with the extracted slot filled in.
pub fn exemplars(label: IntentLabel, symptoms: &SymptomSet) -> Vec<String> {
    let slot = if symptoms.is_empty() {
        EMPTY_SLOT_FILLER
    } else {
        symptoms.as_str()
    };
    SCORED_INTENTS
        .iter()
        .find(|(candidate, _)| *candidate == label)
        .map(|(_, templates)| templates.iter().map(|t| fill_template(t, slot)).collect())
        .unwrap_or_default()
}

/// Turn-level intent classification against exemplar templates.
pub struct IntentClassifier {
    scorer: Arc<dyn SimilarityScorer>,
    intent_floor: f64,
}

impl IntentClassifier {
    pub fn new(scorer: Arc<dyn SimilarityScorer>, policy: &ResolutionPolicy) -> Self {
        Self {
            scorer,
            intent_floor: policy.intent_floor,
        }
    }

    /// Classify one utterance given the symptoms carried from earlier turns.
    pub fn classify(
        &self,
        text: &str,
        previous_symptoms: &SymptomSet,
    ) -> Result<ClassificationResult, TriageError> {
        // Step 1: Extract symptoms
        let extracted = extract_symptoms(text);

        // Step 2: Back-references never reach the scorer
        if is_reference(text) {
            tracing::debug!("Reference phrasing detected, asking for disease name");
            return Ok(ClassificationResult::reference_last());
        }

        // Step 3: Best exemplar score per category
        let mut best: Option<(IntentLabel, f64)> = None;
        for (label, _) in SCORED_INTENTS {
            let phrases = exemplars(label, &extracted);
            let refs: Vec<&str> = phrases.iter().map(String::as_str).collect();
            let scores = self.scorer.score_batch(text, &refs)?;
            let category_max = scores.into_iter().fold(f64::NEG_INFINITY, f64::max);
            tracing::debug!(intent = %label, score = category_max, "Intent category scored");

            // Strict comparison keeps the earlier category on ties
            match best {
                Some((_, top)) if category_max <= top => {}
                _ => best = Some((label, category_max)),
            }
        }

        // Step 4: Confidence floor
        let (label, confidence) = match best {
            Some((label, score)) if score >= self.intent_floor => (label, score),
            Some((_, score)) => {
                tracing::info!(score, "No intent above confidence floor, resetting context");
                return Ok(ClassificationResult::unknown(score));
            }
            None => return Ok(ClassificationResult::unknown(0.0)),
        };

        // Step 5: Context directives per category
        let result = match label {
            IntentLabel::InfoNewDisease => ClassificationResult {
                label,
                confidence,
                reset_requested: true,
                carried_symptoms: SymptomSet::empty(),
                ask_confirmation: false,
            },
            IntentLabel::DiagnoseNew => {
                let overlap = symptoms_overlap(&extracted, previous_symptoms);
                if overlap {
                    ClassificationResult {
                        label,
                        confidence,
                        reset_requested: false,
                        carried_symptoms: extracted,
                        ask_confirmation: false,
                    }
                } else {
                    ClassificationResult {
                        label,
                        confidence,
                        reset_requested: true,
                        carried_symptoms: SymptomSet::empty(),
                        ask_confirmation: false,
                    }
                }
            }
            IntentLabel::DiagnoseUpdate => ClassificationResult {
                label,
                confidence,
                reset_requested: false,
                carried_symptoms: previous_symptoms.merged_with(&extracted),
                ask_confirmation: false,
            },
            IntentLabel::ReferenceLast | IntentLabel::Unknown => {
                ClassificationResult::unknown(confidence)
            }
        };

        tracing::info!(
            intent = %result.label,
            confidence = result.confidence,
            reset = result.reset_requested,
            "Intent classified"
        );
        Ok(result)
    }
}
