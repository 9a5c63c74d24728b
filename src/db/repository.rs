use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use super::DatabaseError;
use crate::models::*;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

fn format_datetime(value: &NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

fn parse_datetime(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT).unwrap_or_default()
}

// ═══════════════════════════════════════════
// Session Repository
// ═══════════════════════════════════════════

/// Insert the session row if it does not exist yet. Returns true when a
/// row was created.
pub fn ensure_session(conn: &Connection, session: &DialogueSession) -> Result<bool, DatabaseError> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO sessions (id, symptoms, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            session.id,
            session.symptoms.as_str(),
            format_datetime(&session.created_at),
            format_datetime(&session.updated_at),
        ],
    )?;
    Ok(inserted > 0)
}

/// Load a session with its full turn history.
pub fn get_session(conn: &Connection, id: &str) -> Result<Option<DialogueSession>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, symptoms, created_at, updated_at FROM sessions WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((id, symptoms, created_at, updated_at)) = row else {
        return Ok(None);
    };

    Ok(Some(DialogueSession {
        turns: get_turns(conn, &id)?,
        id,
        symptoms: SymptomSet::new(symptoms),
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    }))
}

pub fn get_session_symptoms(conn: &Connection, id: &str) -> Result<Option<SymptomSet>, DatabaseError> {
    let symptoms = conn
        .query_row(
            "SELECT symptoms FROM sessions WHERE id = ?1",
            params![id],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(symptoms.map(SymptomSet::new))
}

pub fn update_session_symptoms(
    conn: &Connection,
    id: &str,
    symptoms: &SymptomSet,
    updated_at: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE sessions SET symptoms = ?1, updated_at = ?2 WHERE id = ?3",
        params![symptoms.as_str(), format_datetime(updated_at), id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Session".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

// ═══════════════════════════════════════════
// Turn Repository
// ═══════════════════════════════════════════

pub fn insert_turn(
    conn: &Connection,
    session_id: &str,
    turn: &Turn,
    updated_at: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO turns (session_id, role, content, timestamp) VALUES (?1, ?2, ?3, ?4)",
        params![session_id, turn.role.as_str(), turn.content, turn.timestamp],
    )?;
    conn.execute(
        "UPDATE sessions SET updated_at = ?1 WHERE id = ?2",
        params![format_datetime(updated_at), session_id],
    )?;
    Ok(())
}

pub fn get_turns(conn: &Connection, session_id: &str) -> Result<Vec<Turn>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT role, content, timestamp FROM turns WHERE session_id = ?1 ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![session_id], |row| {
        Ok(TurnRow {
            role: row.get(0)?,
            content: row.get(1)?,
            timestamp: row.get(2)?,
        })
    })?;

    let mut turns = Vec::new();
    for row in rows {
        turns.push(turn_from_row(row?)?);
    }
    Ok(turns)
}

struct TurnRow {
    role: String,
    content: String,
    timestamp: String,
}

fn turn_from_row(row: TurnRow) -> Result<Turn, DatabaseError> {
    Ok(Turn {
        role: TurnRole::from_str(&row.role)?,
        content: row.content,
        timestamp: row.timestamp,
    })
}
