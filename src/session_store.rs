//! Dialogue session storage.
//!
//! Sessions materialize on first reference to an unknown id and are only
//! ever extended: turns are appended, symptoms replaced by non-empty
//! values. Two backends share one trait so the dialogue service never
//! knows which one it talks to.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use chrono::Local;
use rusqlite::Connection;
use thiserror::Error;

use crate::db::{self, DatabaseError};
use crate::models::{DialogueSession, SymptomSet, Turn};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session store lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Keyed store of dialogue sessions.
pub trait SessionStore: Send + Sync {
    /// Snapshot of the session, creating an empty one for unknown ids.
    fn get_or_create(&self, id: &str) -> Result<DialogueSession, SessionError>;

    fn append(&self, id: &str, turn: Turn) -> Result<(), SessionError>;

    /// Replace the symptom state. Empty values are a no-op.
    fn set_symptoms(&self, id: &str, symptoms: &SymptomSet) -> Result<(), SessionError>;

    fn get_symptoms(&self, id: &str) -> Result<SymptomSet, SessionError>;

    /// Record a completed exchange: both turns plus the new symptom state.
    fn commit_turn(
        &self,
        id: &str,
        user: Turn,
        assistant: Turn,
        symptoms: &SymptomSet,
    ) -> Result<(), SessionError> {
        self.append(id, user)?;
        self.append(id, assistant)?;
        self.set_symptoms(id, symptoms)
    }
}

// ═══════════════════════════════════════════════════════════
// In-memory backend
// ═══════════════════════════════════════════════════════════

/// Process-lifetime session map. Each session sits behind its own mutex so
/// writes to one session never wait on another.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<DialogueSession>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, id: &str) -> Result<Arc<Mutex<DialogueSession>>, SessionError> {
        {
            let sessions = self.sessions.read().map_err(|_| SessionError::LockPoisoned)?;
            if let Some(session) = sessions.get(id) {
                return Ok(session.clone());
            }
        }

        let mut sessions = self.sessions.write().map_err(|_| SessionError::LockPoisoned)?;
        let session = sessions.entry(id.to_string()).or_insert_with(|| {
            tracing::info!(session_id = id, "Created dialogue session");
            Arc::new(Mutex::new(DialogueSession::new(id)))
        });
        Ok(session.clone())
    }

    fn with_session<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut DialogueSession) -> T,
    ) -> Result<T, SessionError> {
        let entry = self.entry(id)?;
        let mut session = entry.lock().map_err(|_| SessionError::LockPoisoned)?;
        Ok(f(&mut session))
    }

    pub fn session_count(&self) -> Result<usize, SessionError> {
        Ok(self
            .sessions
            .read()
            .map_err(|_| SessionError::LockPoisoned)?
            .len())
    }
}

impl SessionStore for InMemorySessionStore {
    fn get_or_create(&self, id: &str) -> Result<DialogueSession, SessionError> {
        self.with_session(id, |session| session.clone())
    }

    fn append(&self, id: &str, turn: Turn) -> Result<(), SessionError> {
        self.with_session(id, |session| session.push_turn(turn))
    }

    fn set_symptoms(&self, id: &str, symptoms: &SymptomSet) -> Result<(), SessionError> {
        self.with_session(id, |session| {
            session.update_symptoms(symptoms);
        })
    }

    fn get_symptoms(&self, id: &str) -> Result<SymptomSet, SessionError> {
        self.with_session(id, |session| session.symptoms.clone())
    }

    fn commit_turn(
        &self,
        id: &str,
        user: Turn,
        assistant: Turn,
        symptoms: &SymptomSet,
    ) -> Result<(), SessionError> {
        self.with_session(id, |session| {
            session.push_turn(user);
            session.push_turn(assistant);
            session.update_symptoms(symptoms);
        })
    }
}

// ═══════════════════════════════════════════════════════════
// SQLite backend
// ═══════════════════════════════════════════════════════════

/// Sessions persisted in SQLite. A single connection serializes access.
pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
}

impl SqliteSessionStore {
    pub fn open(path: &Path) -> Result<Self, SessionError> {
        let conn = db::open_database(path)?;
        tracing::info!(path = %path.display(), "Opened session database");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, SessionError> {
        Ok(Self {
            conn: Mutex::new(db::open_memory_database()?),
        })
    }

    fn ensure(conn: &Connection, id: &str) -> Result<(), SessionError> {
        if db::ensure_session(conn, &DialogueSession::new(id))? {
            tracing::info!(session_id = id, "Created dialogue session");
        }
        Ok(())
    }
}

impl SessionStore for SqliteSessionStore {
    fn get_or_create(&self, id: &str) -> Result<DialogueSession, SessionError> {
        let conn = self.conn.lock().map_err(|_| SessionError::LockPoisoned)?;
        Self::ensure(&conn, id)?;
        db::get_session(&conn, id)?.ok_or_else(|| {
            SessionError::Database(DatabaseError::NotFound {
                entity_type: "Session".into(),
                id: id.to_string(),
            })
        })
    }

    fn append(&self, id: &str, turn: Turn) -> Result<(), SessionError> {
        let conn = self.conn.lock().map_err(|_| SessionError::LockPoisoned)?;
        Self::ensure(&conn, id)?;
        db::insert_turn(&conn, id, &turn, &Local::now().naive_local())?;
        Ok(())
    }

    fn set_symptoms(&self, id: &str, symptoms: &SymptomSet) -> Result<(), SessionError> {
        if symptoms.is_empty() {
            return Ok(());
        }
        let conn = self.conn.lock().map_err(|_| SessionError::LockPoisoned)?;
        Self::ensure(&conn, id)?;
        db::update_session_symptoms(&conn, id, symptoms, &Local::now().naive_local())?;
        Ok(())
    }

    fn get_symptoms(&self, id: &str) -> Result<SymptomSet, SessionError> {
        let conn = self.conn.lock().map_err(|_| SessionError::LockPoisoned)?;
        Self::ensure(&conn, id)?;
        Ok(db::get_session_symptoms(&conn, id)?.unwrap_or_default())
    }

    fn commit_turn(
        &self,
        id: &str,
        user: Turn,
        assistant: Turn,
        symptoms: &SymptomSet,
    ) -> Result<(), SessionError> {
        let mut conn = self.conn.lock().map_err(|_| SessionError::LockPoisoned)?;
        let tx = conn.transaction().map_err(DatabaseError::from)?;
        let now = Local::now().naive_local();

        Self::ensure(&tx, id)?;
        db::insert_turn(&tx, id, &user, &now)?;
        db::insert_turn(&tx, id, &assistant, &now)?;
        if !symptoms.is_empty() {
            db::update_session_symptoms(&tx, id, symptoms, &now)?;
        }
        tx.commit().map_err(DatabaseError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TurnRole;

    fn stores() -> Vec<(&'static str, Box<dyn SessionStore>)> {
        vec![
            ("memory", Box::new(InMemorySessionStore::new())),
            ("sqlite", Box::new(SqliteSessionStore::in_memory().unwrap())),
        ]
    }

    #[test]
    fn unknown_id_materializes_empty_session() {
        for (name, store) in stores() {
            let session = store.get_or_create("new-id").unwrap();
            assert_eq!(session.id, "new-id", "{name}");
            assert!(session.turns.is_empty(), "{name}");
            assert!(store.get_symptoms("other-id").unwrap().is_empty(), "{name}");
        }
    }

    #[test]
    fn get_or_create_is_idempotent() {
        for (name, store) in stores() {
            store.append("s1", Turn::user("Tôi bị sốt", "08:00:00")).unwrap();
            let first = store.get_or_create("s1").unwrap();
            let second = store.get_or_create("s1").unwrap();
            assert_eq!(first.turns.len(), 1, "{name}");
            assert_eq!(first.created_at, second.created_at, "{name}");
        }
    }

    #[test]
    fn empty_symptom_update_is_noop() {
        for (name, store) in stores() {
            store.set_symptoms("s1", &SymptomSet::from("sốt")).unwrap();
            store.set_symptoms("s1", &SymptomSet::empty()).unwrap();
            assert_eq!(store.get_symptoms("s1").unwrap().as_str(), "sốt", "{name}");
        }
    }

    #[test]
    fn commit_turn_appends_in_order() {
        for (name, store) in stores() {
            store
                .commit_turn(
                    "s1",
                    Turn::user("Tôi bị đau đầu", "08:00:00"),
                    Turn::assistant("Bạn có sốt không?", "08:00:00"),
                    &SymptomSet::from("đau đầu"),
                )
                .unwrap();
            let session = store.get_or_create("s1").unwrap();
            assert_eq!(session.turns.len(), 2, "{name}");
            assert_eq!(session.turns[0].role, TurnRole::User, "{name}");
            assert_eq!(session.turns[1].role, TurnRole::Assistant, "{name}");
            assert_eq!(session.symptoms.as_str(), "đau đầu", "{name}");
        }
    }

    #[test]
    fn sessions_are_isolated() {
        for (name, store) in stores() {
            store.set_symptoms("a", &SymptomSet::from("sốt")).unwrap();
            store.set_symptoms("b", &SymptomSet::from("khó thở")).unwrap();
            assert_eq!(store.get_symptoms("a").unwrap().as_str(), "sốt", "{name}");
            assert_eq!(store.get_symptoms("b").unwrap().as_str(), "khó thở", "{name}");
        }
    }

    #[test]
    fn in_memory_store_counts_sessions() {
        let store = InMemorySessionStore::new();
        store.get_or_create("a").unwrap();
        store.get_or_create("a").unwrap();
        store.get_or_create("b").unwrap();
        assert_eq!(store.session_count().unwrap(), 2);
    }

    #[test]
    fn sqlite_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        {
            let store = SqliteSessionStore::open(&path).unwrap();
            store
                .commit_turn(
                    "s1",
                    Turn::user("Tôi bị sốt", "08:00:00"),
                    Turn::assistant("Bạn sốt mấy ngày rồi?", "08:00:00"),
                    &SymptomSet::from("sốt"),
                )
                .unwrap();
        }
        let store = SqliteSessionStore::open(&path).unwrap();
        let session = store.get_or_create("s1").unwrap();
        assert_eq!(session.turns.len(), 2);
        assert_eq!(session.symptoms.as_str(), "sốt");
    }
}
