use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::models::{Exam, Session};

pub fn connect(path: &str) -> Result<Connection> {
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sessions (
            id         TEXT PRIMARY KEY,
            name       TEXT NOT NULL,
            created_at TEXT NOT NULL,
            body       TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_created ON sessions(created_at);

        CREATE TABLE IF NOT EXISTS exams (
            id     TEXT PRIMARY KEY,
            title  TEXT NOT NULL,
            date   TEXT NOT NULL,
            topics TEXT NOT NULL DEFAULT '[]'
        );
        ",
    )?;
    Ok(())
}

/// 12 hex chars cut from a v4 UUID.
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

// ── Sessions ──

pub struct SessionSummary {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

/// Insert or overwrite the whole session row; one statement per write.
pub fn save_session(conn: &Connection, session: &Session) -> Result<()> {
    let body = serde_json::to_string(session)?;
    conn.execute(
        "INSERT INTO sessions (id, name, created_at, body) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
             name = excluded.name,
             body = excluded.body,
             updated_at = datetime('now')",
        rusqlite::params![session.id, session.name, session.created_at, body],
    )?;
    Ok(())
}

pub fn load_session(conn: &Connection, id: &str) -> Result<Option<Session>> {
    let body: Option<String> = conn
        .query_row("SELECT body FROM sessions WHERE id = ?1", [id], |r| r.get(0))
        .optional()?;
    body.map(|b| serde_json::from_str(&b).with_context(|| format!("corrupt session {id}")))
        .transpose()
}

pub fn delete_session(conn: &Connection, id: &str) -> Result<bool> {
    Ok(conn.execute("DELETE FROM sessions WHERE id = ?1", [id])? > 0)
}

/// Most recent first.
pub fn list_sessions(conn: &Connection, limit: usize) -> Result<Vec<SessionSummary>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, created_at FROM sessions ORDER BY created_at DESC, rowid DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit as i64], |row| {
            Ok(SessionSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Case-insensitive name lookup.
pub fn session_name_taken(conn: &Connection, name: &str) -> Result<bool> {
    let wanted = name.trim().to_lowercase();
    let mut stmt = conn.prepare("SELECT name FROM sessions")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|n| n.trim().to_lowercase() == wanted))
}

// ── Exams ──

pub fn insert_exam(conn: &Connection, exam: &Exam) -> Result<()> {
    conn.execute(
        "INSERT INTO exams (id, title, date, topics) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![exam.id, exam.title, exam.date, serde_json::to_string(&exam.topics)?],
    )?;
    Ok(())
}

pub fn list_exams(conn: &Connection) -> Result<Vec<Exam>> {
    let mut stmt = conn.prepare("SELECT id, title, date, topics FROM exams ORDER BY date, id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, title, date, topics)| -> Result<Exam> {
            let topics = serde_json::from_str(&topics).with_context(|| format!("corrupt topics for exam {id}"))?;
            Ok(Exam {
                id,
                title,
                date,
                topics,
            })
        })
        .collect()
}

pub fn delete_exam(conn: &Connection, id: &str) -> Result<bool> {
    Ok(conn.execute("DELETE FROM exams WHERE id = ?1", [id])? > 0)
}
