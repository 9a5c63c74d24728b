pub mod types;
pub mod vocabulary;
pub mod reference;
pub mod intent;
pub mod rewrite;
pub mod name_match;
pub mod resolution;
pub mod prompt;
pub mod retrieval;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod test_support;

use thiserror::Error;

/// Failures of the external collaborators a turn depends on.
///
/// Every variant is recoverable: the turn is abandoned and the session is
/// left exactly as it was before the turn started.
#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Similarity scoring failed: {0}")]
    Scorer(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error("{service} is not reachable at {url}")]
    Connection { service: &'static str, url: String },

    #[error("{service} returned error (status {status}): {body}")]
    HttpStatus {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Turn was cancelled: {0}")]
    Cancelled(String),
}
