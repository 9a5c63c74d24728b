use serde::{Deserialize, Serialize};

use super::disease::canonical_disease_name;

/// Payload metadata attached to an indexed document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disease: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A reference question or an information passage returned by an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            metadata: DocumentMetadata::default(),
        }
    }

    pub fn tagged(text: &str, disease: &str) -> Self {
        Self {
            text: text.to_string(),
            metadata: DocumentMetadata {
                disease: Some(disease.to_string()),
                extra: serde_json::Map::new(),
            },
        }
    }

    /// Canonical disease tag, if the document carries a non-blank one.
    pub fn disease(&self) -> Option<String> {
        self.metadata
            .disease
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(canonical_disease_name)
    }
}

/// A document with the relevance score assigned by the reranker.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f64,
}
