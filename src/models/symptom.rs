use std::fmt;

use serde::{Deserialize, Serialize};

/// Space-joined sequence of recognized symptom terms.
///
/// Produced by the symptom extractor and carried across turns. When the
/// extractor finds no vocabulary term the raw utterance passes through
/// unfiltered, so the value is not guaranteed to be vocabulary-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymptomSet(String);

impl SymptomSet {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append `addition` to this set (additive path of a symptom update).
    ///
    /// An empty set yields `addition` unchanged; otherwise the two are
    /// space-joined and trimmed.
    pub fn merged_with(&self, addition: &SymptomSet) -> SymptomSet {
        if self.is_empty() {
            return addition.clone();
        }
        SymptomSet(format!("{} {}", self.0, addition.0).trim().to_string())
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SymptomSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SymptomSet {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SymptomSet {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_appends_with_single_space() {
        let previous = SymptomSet::from("sốt");
        let merged = previous.merged_with(&SymptomSet::from("ho"));
        assert_eq!(merged.as_str(), "sốt ho");
    }

    #[test]
    fn merge_into_empty_keeps_addition() {
        let merged = SymptomSet::empty().merged_with(&SymptomSet::from("đau đầu"));
        assert_eq!(merged.as_str(), "đau đầu");
    }

    #[test]
    fn merge_trims_trailing_space() {
        let merged = SymptomSet::from("sốt").merged_with(&SymptomSet::empty());
        assert_eq!(merged.as_str(), "sốt");
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&SymptomSet::from("sốt ho")).unwrap();
        assert_eq!(json, "\"sốt ho\"");
    }
}
