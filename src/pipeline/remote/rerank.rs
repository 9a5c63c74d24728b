use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{build_client, read_json, send_error, trim_base};
use crate::config::ConfigError;
use crate::pipeline::triage::types::SimilarityScorer;
use crate::pipeline::triage::TriageError;

const SERVICE: &str = "Rerank";

/// Cross-encoder scorer served by a text-embeddings-inference `/rerank`
/// endpoint. Raw (unnormalized) scores are requested.
pub struct RerankScorer {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl RerankScorer {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: trim_base(base_url),
            client: build_client(SERVICE, timeout)?,
            timeout,
        })
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [&'a str],
    raw_scores: bool,
}

#[derive(Deserialize)]
struct RankedText {
    index: usize,
    score: f64,
}

/// Put scores back into input order.
fn scores_in_input_order(ranked: Vec<RankedText>, expected: usize) -> Result<Vec<f64>, TriageError> {
    let mut scores: Vec<Option<f64>> = vec![None; expected];
    for item in ranked {
        let slot = scores.get_mut(item.index).ok_or_else(|| {
            TriageError::ResponseParsing(format!(
                "rerank index {} out of range for {expected} texts",
                item.index
            ))
        })?;
        *slot = Some(item.score);
    }
    scores
        .into_iter()
        .enumerate()
        .map(|(i, score)| {
            score.ok_or_else(|| TriageError::ResponseParsing(format!("no rerank score for text {i}")))
        })
        .collect()
}

impl SimilarityScorer for RerankScorer {
    fn score(&self, query: &str, candidate: &str) -> Result<f64, TriageError> {
        let scores = self.score_batch(query, &[candidate])?;
        scores
            .first()
            .copied()
            .ok_or_else(|| TriageError::ResponseParsing("empty rerank response".into()))
    }

    fn score_batch(&self, query: &str, candidates: &[&str]) -> Result<Vec<f64>, TriageError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/rerank", self.base_url);
        let body = RerankRequest {
            query,
            texts: candidates,
            raw_scores: true,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| send_error(SERVICE, &self.base_url, self.timeout, e))?;

        let ranked: Vec<RankedText> = read_json(SERVICE, response)?;
        scores_in_input_order(ranked, candidates.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(json: &str) -> Vec<RankedText> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn scores_are_restored_to_input_order() {
        let scores = scores_in_input_order(
            ranked(r#"[{"index":2,"score":0.9},{"index":0,"score":0.4},{"index":1,"score":-1.5}]"#),
            3,
        )
        .unwrap();
        assert_eq!(scores, vec![0.4, -1.5, 0.9]);
    }

    #[test]
    fn missing_score_is_parsing_error() {
        let err = scores_in_input_order(ranked(r#"[{"index":0,"score":0.4}]"#), 2).unwrap_err();
        assert!(matches!(err, TriageError::ResponseParsing(_)));
    }

    #[test]
    fn out_of_range_index_is_parsing_error() {
        let err = scores_in_input_order(ranked(r#"[{"index":5,"score":0.4}]"#), 1).unwrap_err();
        assert!(matches!(err, TriageError::ResponseParsing(_)));
    }

    #[test]
    fn request_asks_for_raw_scores() {
        let texts = ["a", "b"];
        let json = serde_json::to_value(RerankRequest {
            query: "đau đầu",
            texts: &texts,
            raw_scores: true,
        })
        .unwrap();
        assert_eq!(json["raw_scores"], true);
        assert_eq!(json["texts"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn empty_batch_skips_the_request() {
        let scorer = RerankScorer::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        assert!(scorer.score_batch("q", &[]).unwrap().is_empty());
    }
}
