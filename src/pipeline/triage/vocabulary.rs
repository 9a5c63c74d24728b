use crate::models::SymptomSet;

/// Fixed symptom vocabulary, in extraction order.
///
/// headache, fever, cough, dyspnea, fatigue, dizziness, nausea,
/// bleeding, chest pain, edema.
pub const COMMON_SYMPTOMS: &[&str] = &[
    "đau đầu",
    "sốt",
    "ho",
    "khó thở",
    "mệt",
    "chóng mặt",
    "buồn nôn",
    "ra máu",
    "đau ngực",
    "sưng phù",
];

/// Pull known symptom terms out of free text.
///
/// Matching is case-insensitive substring containment. Matches are joined
/// in vocabulary order. With no match the text is returned unchanged so that
/// informative but unrecognized wording still reaches retrieval.
pub fn extract_symptoms(text: &str) -> SymptomSet {
    let lower = text.to_lowercase();
    let found: Vec<&str> = COMMON_SYMPTOMS
        .iter()
        .copied()
        .filter(|symptom| lower.contains(symptom))
        .collect();

    if found.is_empty() {
        SymptomSet::new(text)
    } else {
        SymptomSet::new(found.join(" "))
    }
}

/// True when any single vocabulary term appears in both sets.
pub fn symptoms_overlap(current: &SymptomSet, previous: &SymptomSet) -> bool {
    if previous.is_empty() {
        return false;
    }
    let current = current.as_str().to_lowercase();
    let previous = previous.as_str().to_lowercase();
    COMMON_SYMPTOMS
        .iter()
        .any(|symptom| current.contains(symptom) && previous.contains(symptom))
}

/// Whether `term` (already lowercased) is itself a vocabulary symptom.
pub fn is_common_symptom(term: &str) -> bool {
    COMMON_SYMPTOMS.contains(&term)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_in_vocabulary_order() {
        let symptoms = extract_symptoms("Tôi bị sốt và đau đầu");
        assert_eq!(symptoms.as_str(), "đau đầu sốt");
    }

    #[test]
    fn extraction_is_case_insensitive() {
        let symptoms = extract_symptoms("ĐAU NGỰC dữ dội");
        assert_eq!(symptoms.as_str(), "đau ngực");
    }

    #[test]
    fn unmatched_text_passes_through() {
        let text = "Tôi bị ngứa da";
        assert_eq!(extract_symptoms(text).as_str(), text);
    }

    #[test]
    fn overlap_requires_shared_term() {
        assert!(symptoms_overlap(
            &SymptomSet::from("đau đầu sốt"),
            &SymptomSet::from("sốt")
        ));
        assert!(!symptoms_overlap(
            &SymptomSet::from("đau ngực"),
            &SymptomSet::from("sốt")
        ));
    }

    #[test]
    fn no_overlap_with_empty_history() {
        assert!(!symptoms_overlap(&SymptomSet::from("sốt"), &SymptomSet::empty()));
    }

    #[test]
    fn recognizes_vocabulary_terms() {
        assert!(is_common_symptom("chóng mặt"));
        assert!(!is_common_symptom("tiểu đường"));
    }
}
