use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{build_client, read_json, send_error, trim_base};
use crate::config::ConfigError;
use crate::models::Document;
use crate::pipeline::triage::types::{InformationIndex, QuestionIndex};
use crate::pipeline::triage::TriageError;

const EMBED_SERVICE: &str = "Embedding";
const QDRANT_SERVICE: &str = "Qdrant";

/// Page size for scrolling through a collection.
const SCROLL_PAGE: usize = 256;

// ═══════════════════════════════════════════════════════════
// Query embedding
// ═══════════════════════════════════════════════════════════

/// Query embedder served by a text-embeddings-inference `/embed` endpoint.
pub struct TeiEmbedder {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout: Duration,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a str,
}

impl TeiEmbedder {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: trim_base(base_url),
            client: build_client(EMBED_SERVICE, timeout)?,
            timeout,
        })
    }

    pub fn embed(&self, text: &str) -> Result<Vec<f32>, TriageError> {
        let url = format!("{}/embed", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest { inputs: text })
            .send()
            .map_err(|e| send_error(EMBED_SERVICE, &self.base_url, self.timeout, e))?;

        let vectors: Vec<Vec<f32>> = read_json(EMBED_SERVICE, response)?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| TriageError::ResponseParsing("embedding response was empty".into()))
    }
}

// ═══════════════════════════════════════════════════════════
// Qdrant collection
// ═══════════════════════════════════════════════════════════

/// One Qdrant collection whose points carry `text` and `metadata` payloads.
pub struct QdrantIndex {
    base_url: String,
    api_key: Option<String>,
    collection: String,
    embedder: TeiEmbedder,
    client: reqwest::blocking::Client,
    timeout: Duration,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    #[serde(default)]
    payload: Option<Value>,
}

#[derive(Deserialize)]
struct ScrollResponse {
    result: ScrollPage,
}

#[derive(Deserialize)]
struct ScrollPage {
    points: Vec<ScoredPoint>,
    #[serde(default)]
    next_page_offset: Option<Value>,
}

impl QdrantIndex {
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        collection: &str,
        embedder: TeiEmbedder,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: trim_base(base_url),
            api_key: api_key.map(str::to_string),
            collection: collection.to_string(),
            embedder,
            client: build_client(QDRANT_SERVICE, timeout)?,
            timeout,
        })
    }

    fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, TriageError> {
        let url = format!("{}/collections/{}/points/{path}", self.base_url, self.collection);
        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.header("api-key", key);
        }
        let response = request
            .send()
            .map_err(|e| send_error(QDRANT_SERVICE, &self.base_url, self.timeout, e))?;
        read_json(QDRANT_SERVICE, response)
    }

    fn scroll(&self, filter: Option<Value>, limit: usize) -> Result<Vec<Document>, TriageError> {
        let mut documents = Vec::new();
        let mut offset: Option<Value> = None;

        while documents.len() < limit {
            let mut body = json!({
                "limit": SCROLL_PAGE.min(limit - documents.len()),
                "with_payload": true,
                "with_vector": false,
            });
            if let Some(filter) = &filter {
                body["filter"] = filter.clone();
            }
            if let Some(offset) = offset.take() {
                body["offset"] = offset;
            }

            let page: ScrollResponse = self.post("scroll", &body)?;
            documents.extend(page.result.points.into_iter().filter_map(point_document));
            match page.result.next_page_offset {
                Some(next) if !next.is_null() => offset = Some(next),
                _ => break,
            }
        }
        Ok(documents)
    }
}

/// Decode a point payload; points without a usable payload are skipped.
fn point_document(point: ScoredPoint) -> Option<Document> {
    let payload = point.payload?;
    match serde_json::from_value::<Document>(payload) {
        Ok(doc) => Some(doc),
        Err(e) => {
            tracing::warn!(error = %e, "Skipping point with malformed payload");
            None
        }
    }
}

fn disease_filter(disease: &str) -> Value {
    json!({
        "must": [
            { "key": "metadata.disease", "match": { "value": disease } }
        ]
    })
}

impl QuestionIndex for QdrantIndex {
    fn top_k(&self, query: &str, k: usize) -> Result<Vec<Document>, TriageError> {
        let vector = self.embedder.embed(query)?;
        let body = json!({
            "vector": vector,
            "limit": k,
            "with_payload": true,
        });
        let response: SearchResponse = self.post("search", &body)?;
        Ok(response
            .result
            .into_iter()
            .filter_map(point_document)
            .collect())
    }
}

impl InformationIndex for QdrantIndex {
    fn filter_by_disease(&self, disease: &str, k: usize) -> Result<Vec<Document>, TriageError> {
        self.scroll(Some(disease_filter(disease)), k)
    }

    fn diseases(&self, limit: usize) -> Result<Vec<String>, TriageError> {
        Ok(self
            .scroll(None, limit)?
            .into_iter()
            .filter_map(|doc| doc.metadata.disease)
            .collect())
    }
}
