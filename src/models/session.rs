use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::enums::TurnRole;
use super::symptom::SymptomSet;

/// One message in a dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    /// Wall-clock time of the exchange, `HH:MM:SS`.
    pub timestamp: String,
}

impl Turn {
    pub fn user(content: &str, timestamp: &str) -> Self {
        Self {
            role: TurnRole::User,
            content: content.to_string(),
            timestamp: timestamp.to_string(),
        }
    }

    pub fn assistant(content: &str, timestamp: &str) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.to_string(),
            timestamp: timestamp.to_string(),
        }
    }
}

/// Per-session history plus the running symptom state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueSession {
    pub id: String,
    pub turns: Vec<Turn>,
    pub symptoms: SymptomSet,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl DialogueSession {
    pub fn new(id: &str) -> Self {
        let now = Local::now().naive_local();
        Self {
            id: id.to_string(),
            turns: Vec::new(),
            symptoms: SymptomSet::empty(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push_turn(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.updated_at = Local::now().naive_local();
    }

    /// Replace the symptom state. Empty values are ignored so that
    /// ambiguous or unmatched turns never erase earlier symptoms.
    pub fn update_symptoms(&mut self, symptoms: &SymptomSet) -> bool {
        if symptoms.is_empty() {
            return false;
        }
        self.symptoms = symptoms.clone();
        self.updated_at = Local::now().naive_local();
        true
    }
}
