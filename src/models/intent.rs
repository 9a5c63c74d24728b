use serde::{Deserialize, Serialize};

use super::enums::IntentLabel;
use super::symptom::SymptomSet;

/// Outcome of classifying one utterance.
///
/// `ask_confirmation` is only ever set together with `IntentLabel::ReferenceLast`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: IntentLabel,
    pub confidence: f64,
    pub reset_requested: bool,
    pub carried_symptoms: SymptomSet,
    pub ask_confirmation: bool,
}

impl ClassificationResult {
    /// Back-reference to a disease that was never named.
    pub fn reference_last() -> Self {
        Self {
            label: IntentLabel::ReferenceLast,
            confidence: 1.0,
            reset_requested: false,
            carried_symptoms: SymptomSet::empty(),
            ask_confirmation: true,
        }
    }

    /// Nothing cleared the confidence floor: drop all continuity.
    pub fn unknown(confidence: f64) -> Self {
        Self {
            label: IntentLabel::Unknown,
            confidence,
            reset_requested: true,
            carried_symptoms: SymptomSet::empty(),
            ask_confirmation: false,
        }
    }
}

/// Normalized query handed to the disease resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryContext {
    pub processed_query: String,
    pub symptoms: SymptomSet,
    pub reset: bool,
    pub ask_confirmation: bool,
}
