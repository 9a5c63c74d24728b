//! Dialogue service: one triage turn per user message, serialized per
//! session, with a timeout around the blocking collaborator calls.
//!
//! A turn either commits completely (user turn, assistant turn, symptom
//! state) or not at all.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;
use serde::Serialize;

use crate::config::{ConfigError, ServiceConfig, SessionBackend};
use crate::models::{ResolutionOutcome, SymptomSet, Turn};
use crate::pipeline::remote::{OllamaGenerator, QdrantIndex, RerankScorer, TeiEmbedder};
use crate::pipeline::triage::name_match::PartialRatioMatcher;
use crate::pipeline::triage::orchestrator::{Collaborators, TriagePipeline, TurnResult};
use crate::pipeline::triage::prompt::FAILURE_MESSAGE;
use crate::pipeline::triage::TriageError;
use crate::session_store::{InMemorySessionStore, SessionError, SessionStore, SqliteSessionStore};

/// How a turn ended, for callers that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Confirmed,
    Ambiguous,
    NoMatch,
    ConfirmationRequested,
    Failed,
}

impl From<&ResolutionOutcome> for TurnStatus {
    fn from(outcome: &ResolutionOutcome) -> Self {
        match outcome {
            ResolutionOutcome::Confirmed { .. } => Self::Confirmed,
            ResolutionOutcome::Ambiguous { .. } => Self::Ambiguous,
            ResolutionOutcome::NoMatch { .. } => Self::NoMatch,
            ResolutionOutcome::ConfirmationRequested => Self::ConfirmationRequested,
        }
    }
}

/// What the user sees after one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnReply {
    pub session_id: String,
    pub response: String,
    pub possible_diseases: Vec<String>,
    /// Session symptom state after the turn.
    pub symptoms: SymptomSet,
    pub ask_confirmation: bool,
    /// `HH:MM:SS`, shared by the user and assistant turns.
    pub timestamp: String,
    pub status: TurnStatus,
}

pub struct DialogueService {
    pipeline: Arc<TriagePipeline>,
    store: Arc<dyn SessionStore>,
    gates: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    turn_timeout: Duration,
}

impl DialogueService {
    pub fn new(
        pipeline: Arc<TriagePipeline>,
        store: Arc<dyn SessionStore>,
        turn_timeout: Duration,
    ) -> Self {
        Self {
            pipeline,
            store,
            gates: Mutex::new(HashMap::new()),
            turn_timeout,
        }
    }

    /// Wire the HTTP collaborators and the session backend from config.
    ///
    /// Blocking: loads the disease catalog. Call outside the async runtime.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ConfigError> {
        let questions = QdrantIndex::new(
            &config.qdrant_url,
            config.qdrant_api_key.as_deref(),
            &config.questions_collection,
            TeiEmbedder::new(&config.embed_url, config.http_timeout)?,
            config.http_timeout,
        )?;
        let information = QdrantIndex::new(
            &config.qdrant_url,
            config.qdrant_api_key.as_deref(),
            &config.information_collection,
            TeiEmbedder::new(&config.embed_url, config.http_timeout)?,
            config.http_timeout,
        )?;
        let scorer = Arc::new(RerankScorer::new(&config.rerank_url, config.http_timeout)?);
        let generator = OllamaGenerator::new(
            &config.ollama_url,
            &config.ollama_model,
            config.http_timeout,
        )?;

        let collaborators = Collaborators {
            intent_scorer: scorer.clone(),
            reranker: scorer,
            questions: Arc::new(questions),
            information: Arc::new(information),
            generator: Arc::new(generator),
            matcher: Arc::new(PartialRatioMatcher),
        };
        let pipeline = TriagePipeline::new(collaborators, config.policy.clone());

        let store: Arc<dyn SessionStore> = match &config.session_backend {
            SessionBackend::Memory => Arc::new(InMemorySessionStore::new()),
            SessionBackend::Sqlite(path) => Arc::new(
                SqliteSessionStore::open(path)
                    .map_err(|e| ConfigError::SessionStore(e.to_string()))?,
            ),
        };

        Ok(Self::new(Arc::new(pipeline), store, config.turn_timeout))
    }

    /// Start a fresh session and return its id.
    pub fn new_session(&self) -> Result<String, SessionError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.store.get_or_create(&id)?;
        Ok(id)
    }

    /// Ordered history of a session (empty for unknown ids).
    pub fn messages(&self, session_id: &str) -> Result<Vec<Turn>, SessionError> {
        Ok(self.store.get_or_create(session_id)?.turns)
    }

    pub fn symptoms(&self, session_id: &str) -> Result<SymptomSet, SessionError> {
        self.store.get_symptoms(session_id)
    }

    fn gate(&self, session_id: &str) -> Result<Arc<tokio::sync::Mutex<()>>, SessionError> {
        let mut gates = self.gates.lock().map_err(|_| SessionError::LockPoisoned)?;
        Ok(gates
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone())
    }

    /// Run one user message through the pipeline and commit the exchange.
    ///
    /// Collaborator failures and timeouts yield a `Failed` reply and leave
    /// the session untouched. Only storage failures are returned as errors.
    pub async fn handle_turn(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<TurnReply, SessionError> {
        let gate = self.gate(session_id)?;
        let _turn_guard = gate.lock().await;

        let previous = self.store.get_symptoms(session_id)?;
        let timestamp = Local::now().format("%H:%M:%S").to_string();

        let result = self.run_pipeline(message, &previous).await;
        let turn = match result {
            Ok(turn) => turn,
            Err(e) => {
                tracing::error!(session_id, error = %e, "Turn failed, session left unchanged");
                return Ok(TurnReply {
                    session_id: session_id.to_string(),
                    response: FAILURE_MESSAGE.to_string(),
                    possible_diseases: Vec::new(),
                    symptoms: previous,
                    ask_confirmation: false,
                    timestamp,
                    status: TurnStatus::Failed,
                });
            }
        };

        self.store.commit_turn(
            session_id,
            Turn::user(message, &timestamp),
            Turn::assistant(&turn.response, &timestamp),
            &turn.symptoms,
        )?;

        let symptoms = if turn.symptoms.is_empty() {
            previous
        } else {
            turn.symptoms.clone()
        };
        tracing::info!(
            session_id,
            intent = %turn.classification.label,
            status = ?TurnStatus::from(&turn.outcome),
            "Turn committed"
        );

        Ok(TurnReply {
            session_id: session_id.to_string(),
            status: TurnStatus::from(&turn.outcome),
            response: turn.response,
            possible_diseases: turn.possible_diseases,
            symptoms,
            ask_confirmation: turn.ask_confirmation,
            timestamp,
        })
    }

    async fn run_pipeline(
        &self,
        message: &str,
        previous: &SymptomSet,
    ) -> Result<TurnResult, TriageError> {
        let pipeline = self.pipeline.clone();
        let utterance = message.to_string();
        let previous = previous.clone();
        let task = tokio::task::spawn_blocking(move || pipeline.run_turn(&utterance, &previous));

        match tokio::time::timeout(self.turn_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(TriageError::Cancelled(join_error.to_string())),
            Err(_) => Err(TriageError::Timeout(self.turn_timeout.as_secs())),
        }
    }
}
