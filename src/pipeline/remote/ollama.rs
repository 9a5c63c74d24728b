use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{build_client, read_json, send_error, trim_base};
use crate::config::ConfigError;
use crate::pipeline::triage::prompt::{build_triage_prompt, TRIAGE_SYSTEM_PROMPT};
use crate::pipeline::triage::types::AnswerGenerator;
use crate::pipeline::triage::TriageError;

const SERVICE: &str = "Ollama";

/// Answer generation through a local Ollama instance.
pub struct OllamaGenerator {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl OllamaGenerator {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: trim_base(base_url),
            model: model.to_string(),
            client: build_client(SERVICE, timeout)?,
            timeout,
        })
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl AnswerGenerator for OllamaGenerator {
    fn generate(
        &self,
        context: &str,
        question: &str,
        previous_symptoms: &str,
    ) -> Result<String, TriageError> {
        let url = format!("{}/api/generate", self.base_url);
        let prompt = build_triage_prompt(context, question, previous_symptoms);
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt: &prompt,
            system: TRIAGE_SYSTEM_PROMPT,
            stream: false,
        };

        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "Generating answer");
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| send_error(SERVICE, &self.base_url, self.timeout, e))?;

        let parsed: OllamaGenerateResponse = read_json(SERVICE, response)?;
        Ok(parsed.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_without_streaming() {
        let body = OllamaGenerateRequest {
            model: "mistral-small",
            prompt: "**Câu hỏi:** Tôi bị sốt",
            system: "sys",
            stream: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "mistral-small");
        assert_eq!(json["stream"], false);
        assert_eq!(json["system"], "sys");
    }

    #[test]
    fn response_parses_generated_text() {
        let parsed: OllamaGenerateResponse =
            serde_json::from_str(r#"{"model":"m","response":"Xin chào","done":true}"#).unwrap();
        assert_eq!(parsed.response, "Xin chào");
    }

    #[test]
    fn unreachable_server_is_connection_error() {
        let generator =
            OllamaGenerator::new("http://127.0.0.1:1/", "mistral-small", Duration::from_secs(2))
                .unwrap();
        assert_eq!(generator.base_url, "http://127.0.0.1:1");
        match generator.generate("ctx", "q", "") {
            Err(TriageError::Connection { service, url }) => {
                assert_eq!(service, "Ollama");
                assert_eq!(url, "http://127.0.0.1:1");
            }
            other => panic!("Expected Connection, got: {other:?}"),
        }
    }
}
