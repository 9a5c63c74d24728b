//! HTTP adapters for the external triage collaborators.
//!
//! All clients are blocking and meant to run on a blocking thread; the
//! dialogue service moves whole turns onto `spawn_blocking`.

pub mod ollama;
pub mod qdrant;
pub mod rerank;

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::config::ConfigError;
use crate::pipeline::triage::TriageError;

pub use ollama::OllamaGenerator;
pub use qdrant::{QdrantIndex, TeiEmbedder};
pub use rerank::RerankScorer;

/// Blocking HTTP client with a per-request timeout.
pub(crate) fn build_client(
    service: &'static str,
    timeout: Duration,
) -> Result<reqwest::blocking::Client, ConfigError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ConfigError::Client {
            service,
            reason: e.to_string(),
        })
}

/// Map a transport failure to the matching triage error.
pub(crate) fn send_error(
    service: &'static str,
    url: &str,
    timeout: Duration,
    e: reqwest::Error,
) -> TriageError {
    if e.is_connect() {
        TriageError::Connection {
            service,
            url: url.to_string(),
        }
    } else if e.is_timeout() {
        TriageError::Timeout(timeout.as_secs())
    } else {
        match service {
            "Ollama" => TriageError::Generation(e.to_string()),
            "Rerank" => TriageError::Scorer(e.to_string()),
            _ => TriageError::Retrieval(e.to_string()),
        }
    }
}

/// Check the status and decode a JSON body.
pub(crate) fn read_json<T: DeserializeOwned>(
    service: &'static str,
    response: reqwest::blocking::Response,
) -> Result<T, TriageError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(TriageError::HttpStatus {
            service,
            status: status.as_u16(),
            body,
        });
    }

    response
        .json()
        .map_err(|e| TriageError::ResponseParsing(format!("{service}: {e}")))
}

pub(crate) fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_dropped() {
        assert_eq!(trim_base("http://localhost:11434//"), "http://localhost:11434");
        assert_eq!(trim_base("http://qdrant:6333"), "http://qdrant:6333");
    }

    #[test]
    fn client_builds_with_timeout() {
        assert!(build_client("Ollama", Duration::from_secs(5)).is_ok());
    }
}
