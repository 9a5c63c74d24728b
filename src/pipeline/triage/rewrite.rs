use super::prompt::CONFIRMATION_MESSAGE;
use crate::models::{ClassificationResult, IntentLabel, QueryContext, SymptomSet};

/// Turn a classification into the query handed to disease resolution.
///
/// A symptom update replaces the query with the merged symptom string, so
/// retrieval works on normalized terms rather than the raw sentence.
pub fn rewrite_context(
    classification: &ClassificationResult,
    raw_query: &str,
    previous_symptoms: &SymptomSet,
) -> QueryContext {
    match classification.label {
        IntentLabel::ReferenceLast if classification.ask_confirmation => QueryContext {
            processed_query: CONFIRMATION_MESSAGE.to_string(),
            symptoms: previous_symptoms.clone(),
            reset: false,
            ask_confirmation: true,
        },
        IntentLabel::InfoNewDisease => fresh(raw_query),
        IntentLabel::DiagnoseNew if classification.reset_requested => fresh(raw_query),
        IntentLabel::DiagnoseUpdate if !classification.carried_symptoms.is_empty() => {
            let merged = classification.carried_symptoms.clone();
            QueryContext {
                processed_query: merged.as_str().to_string(),
                symptoms: merged,
                reset: false,
                ask_confirmation: false,
            }
        }
        _ => QueryContext {
            processed_query: raw_query.to_string(),
            symptoms: previous_symptoms.clone(),
            reset: classification.reset_requested,
            ask_confirmation: false,
        },
    }
}

fn fresh(raw_query: &str) -> QueryContext {
    QueryContext {
        processed_query: raw_query.to_string(),
        symptoms: SymptomSet::empty(),
        reset: true,
        ask_confirmation: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classified(label: IntentLabel, reset: bool, carried: &str) -> ClassificationResult {
        ClassificationResult {
            label,
            confidence: 0.8,
            reset_requested: reset,
            carried_symptoms: SymptomSet::from(carried),
            ask_confirmation: false,
        }
    }

    #[test]
    fn reference_keeps_symptoms_and_asks() {
        let ctx = rewrite_context(
            &ClassificationResult::reference_last(),
            "Bệnh này là gì",
            &SymptomSet::from("sốt"),
        );
        assert!(ctx.ask_confirmation);
        assert!(!ctx.reset);
        assert_eq!(ctx.symptoms.as_str(), "sốt");
        assert_eq!(ctx.processed_query, CONFIRMATION_MESSAGE);
    }

    #[test]
    fn info_request_clears_symptoms() {
        let ctx = rewrite_context(
            &classified(IntentLabel::InfoNewDisease, true, ""),
            "Thông tin về bệnh cúm",
            &SymptomSet::from("sốt đau đầu"),
        );
        assert_eq!(ctx.processed_query, "Thông tin về bệnh cúm");
        assert!(ctx.symptoms.is_empty());
        assert!(ctx.reset);
    }

    #[test]
    fn new_complaint_without_overlap_starts_fresh() {
        let ctx = rewrite_context(
            &classified(IntentLabel::DiagnoseNew, true, ""),
            "Tôi bị đau ngực",
            &SymptomSet::from("sốt"),
        );
        assert!(ctx.reset);
        assert!(ctx.symptoms.is_empty());
    }

    #[test]
    fn update_queries_with_merged_symptoms() {
        let ctx = rewrite_context(
            &classified(IntentLabel::DiagnoseUpdate, false, "sốt ho"),
            "Tôi còn bị ho",
            &SymptomSet::from("sốt"),
        );
        assert_eq!(ctx.processed_query, "sốt ho");
        assert_eq!(ctx.symptoms.as_str(), "sốt ho");
        assert!(!ctx.reset);
    }

    #[test]
    fn empty_update_passes_through() {
        let ctx = rewrite_context(
            &classified(IntentLabel::DiagnoseUpdate, false, ""),
            "Ngoài ra",
            &SymptomSet::empty(),
        );
        assert_eq!(ctx.processed_query, "Ngoài ra");
        assert!(ctx.symptoms.is_empty());
    }

    #[test]
    fn unknown_passes_through_with_reset() {
        let ctx = rewrite_context(
            &ClassificationResult::unknown(0.2),
            "xin chào",
            &SymptomSet::from("sốt"),
        );
        assert_eq!(ctx.processed_query, "xin chào");
        assert_eq!(ctx.symptoms.as_str(), "sốt");
        assert!(ctx.reset);
        assert!(!ctx.ask_confirmation);
    }

    #[test]
    fn overlapping_new_complaint_keeps_previous_symptoms() {
        let ctx = rewrite_context(
            &classified(IntentLabel::DiagnoseNew, false, "đau đầu sốt"),
            "Tôi bị sốt và đau đầu",
            &SymptomSet::from("sốt"),
        );
        assert_eq!(ctx.processed_query, "Tôi bị sốt và đau đầu");
        assert_eq!(ctx.symptoms.as_str(), "sốt");
        assert!(!ctx.reset);
    }
}
