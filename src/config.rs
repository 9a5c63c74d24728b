use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "ViMedical";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_QUESTIONS_COLLECTION: &str = "vimedical-questions";
pub const DEFAULT_INFORMATION_COLLECTION: &str = "vimedical-information";
const DEFAULT_TURN_TIMEOUT_SECS: u64 = 60;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "info,vimedical_lib=debug"
    } else {
        "info"
    }
}

/// Get the application data directory (`<data dir>/ViMedical`).
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_NAME))
}

/// Default location of the on-disk session database.
pub fn default_session_db_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("sessions.db"))
}

// ═══════════════════════════════════════════════════════════
// Resolution policy
// ═══════════════════════════════════════════════════════════

/// Numeric policy applied to scorer output.
///
/// The constants are empirical and clinically sensitive; they are kept
/// exactly as tuned and only ever overridden explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionPolicy {
    /// Below this best intent score the turn is `Unknown` and context resets.
    pub intent_floor: f64,
    /// Winner must beat the runner-up by this factor.
    pub margin_multiplier: f64,
    /// Winner's summed evidence must reach this value.
    pub absolute_floor: f64,
    /// Reference questions retrieved per turn.
    pub question_top_k: usize,
    /// Information passages fetched for a resolved disease.
    pub information_top_k: usize,
    /// Candidates offered to the user on an ambiguous turn.
    pub shortlist_len: usize,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            intent_floor: 0.5,
            margin_multiplier: 1.125,
            absolute_floor: 0.92,
            question_top_k: 20,
            information_top_k: 6,
            shortlist_len: 3,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Service configuration
// ═══════════════════════════════════════════════════════════

/// Startup configuration errors. Always fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Cannot determine a default session database location")]
    NoDataDir,

    #[error("Failed to build client for {service}: {reason}")]
    Client { service: &'static str, reason: String },

    #[error("Failed to open session store: {0}")]
    SessionStore(String),
}

/// Where dialogue sessions live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionBackend {
    Memory,
    Sqlite(PathBuf),
}

/// Endpoints and limits for the external collaborators.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub questions_collection: String,
    pub information_collection: String,
    pub embed_url: String,
    pub rerank_url: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub http_timeout: Duration,
    pub turn_timeout: Duration,
    pub session_backend: SessionBackend,
    pub policy: ResolutionPolicy,
}

impl ServiceConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let session_backend = match get("VIMEDICAL_SESSION_STORE").as_deref() {
            None | Some("memory") => SessionBackend::Memory,
            Some("sqlite") => {
                let path = match get("VIMEDICAL_SESSION_DB") {
                    Some(path) => PathBuf::from(path),
                    None => default_session_db_path().ok_or(ConfigError::NoDataDir)?,
                };
                SessionBackend::Sqlite(path)
            }
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "VIMEDICAL_SESSION_STORE",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            qdrant_url: required("VIMEDICAL_QDRANT_URL")?,
            qdrant_api_key: get("VIMEDICAL_QDRANT_API_KEY"),
            questions_collection: get("VIMEDICAL_QUESTIONS_COLLECTION")
                .unwrap_or_else(|| DEFAULT_QUESTIONS_COLLECTION.to_string()),
            information_collection: get("VIMEDICAL_INFORMATION_COLLECTION")
                .unwrap_or_else(|| DEFAULT_INFORMATION_COLLECTION.to_string()),
            embed_url: required("VIMEDICAL_EMBED_URL")?,
            rerank_url: required("VIMEDICAL_RERANK_URL")?,
            ollama_url: get("VIMEDICAL_OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            ollama_model: required("VIMEDICAL_OLLAMA_MODEL")?,
            http_timeout: Duration::from_secs(parse_secs(
                "VIMEDICAL_HTTP_TIMEOUT_SECS",
                get("VIMEDICAL_HTTP_TIMEOUT_SECS"),
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
            turn_timeout: Duration::from_secs(parse_secs(
                "VIMEDICAL_TURN_TIMEOUT_SECS",
                get("VIMEDICAL_TURN_TIMEOUT_SECS"),
                DEFAULT_TURN_TIMEOUT_SECS,
            )?),
            session_backend,
            policy: ResolutionPolicy::default(),
        })
    }
}

fn parse_secs(key: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => match value.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(secs),
            _ => Err(ConfigError::InvalidValue { key, value }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("VIMEDICAL_QDRANT_URL", "http://qdrant:6333"),
            ("VIMEDICAL_EMBED_URL", "http://tei-embed:8080"),
            ("VIMEDICAL_RERANK_URL", "http://tei-rerank:8080"),
            ("VIMEDICAL_OLLAMA_MODEL", "mistral-small"),
        ]
    }

    #[test]
    fn policy_defaults_are_preserved() {
        let policy = ResolutionPolicy::default();
        assert_eq!(policy.intent_floor, 0.5);
        assert_eq!(policy.margin_multiplier, 1.125);
        assert_eq!(policy.absolute_floor, 0.92);
        assert_eq!(policy.question_top_k, 20);
        assert_eq!(policy.information_top_k, 6);
        assert_eq!(policy.shortlist_len, 3);
    }

    #[test]
    fn minimal_env_fills_defaults() {
        let config = ServiceConfig::from_lookup(env(&minimal())).unwrap();
        assert_eq!(config.ollama_url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.questions_collection, "vimedical-questions");
        assert_eq!(config.information_collection, "vimedical-information");
        assert_eq!(config.turn_timeout, Duration::from_secs(60));
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.session_backend, SessionBackend::Memory);
        assert!(config.qdrant_api_key.is_none());
    }

    #[test]
    fn missing_required_key_is_reported() {
        let mut pairs = minimal();
        pairs.retain(|(k, _)| *k != "VIMEDICAL_RERANK_URL");
        match ServiceConfig::from_lookup(env(&pairs)) {
            Err(ConfigError::Missing(key)) => assert_eq!(key, "VIMEDICAL_RERANK_URL"),
            other => panic!("Expected Missing, got: {other:?}"),
        }
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let mut pairs = minimal();
        pairs.push(("VIMEDICAL_QDRANT_API_KEY", "   "));
        let config = ServiceConfig::from_lookup(env(&pairs)).unwrap();
        assert!(config.qdrant_api_key.is_none());
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let mut pairs = minimal();
        pairs.push(("VIMEDICAL_TURN_TIMEOUT_SECS", "soon"));
        assert!(matches!(
            ServiceConfig::from_lookup(env(&pairs)),
            Err(ConfigError::InvalidValue { key: "VIMEDICAL_TURN_TIMEOUT_SECS", .. })
        ));

        let mut pairs = minimal();
        pairs.push(("VIMEDICAL_HTTP_TIMEOUT_SECS", "0"));
        assert!(ServiceConfig::from_lookup(env(&pairs)).is_err());
    }

    #[test]
    fn sqlite_backend_uses_explicit_path() {
        let mut pairs = minimal();
        pairs.push(("VIMEDICAL_SESSION_STORE", "sqlite"));
        pairs.push(("VIMEDICAL_SESSION_DB", "/tmp/vimedical/sessions.db"));
        let config = ServiceConfig::from_lookup(env(&pairs)).unwrap();
        assert_eq!(
            config.session_backend,
            SessionBackend::Sqlite(PathBuf::from("/tmp/vimedical/sessions.db"))
        );
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let mut pairs = minimal();
        pairs.push(("VIMEDICAL_SESSION_STORE", "redis"));
        assert!(matches!(
            ServiceConfig::from_lookup(env(&pairs)),
            Err(ConfigError::InvalidValue { key: "VIMEDICAL_SESSION_STORE", .. })
        ));
    }

    #[test]
    fn app_name_is_vimedical() {
        assert_eq!(APP_NAME, "ViMedical");
    }
}
