use std::{
    path::Path,
    sync::{Mutex, MutexGuard},
};

use rusqlite::{Connection, OptionalExtension, params};

use crate::{
    foundation::error::{MemeError, MemeResult},
    model::parse::CaptionPair,
};

/// Settings key holding the image-generation preamble.
pub const SYSTEM_PROMPT_KEY: &str = "system_prompt";

/// Preamble seeded into settings at schema creation.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a creative meme generator. Generate images based on the following description:";

/// Lifecycle state of one generation record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    /// Pipeline still running.
    Processing,
    /// Artifact produced and composited.
    Success,
    /// Pipeline aborted; `error_message` carries the reason.
    Failed,
}

impl GenerationStatus {
    /// Stable text form stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    fn from_db(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(Self::Processing),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One persisted generation record. A failed generation stays viewable with
/// its failure message attached; it never silently disappears.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Generation {
    /// Row id.
    pub id: i64,
    /// User prompt as submitted.
    pub prompt: String,
    /// Bare artifact filename, or empty while processing / after failure.
    pub image_path: String,
    /// Composited top caption (possibly empty).
    pub top_text: String,
    /// Composited bottom caption (possibly empty).
    pub bottom_text: String,
    /// Lifecycle state.
    pub status: GenerationStatus,
    /// Human-readable failure reason, present only for failed records.
    pub error_message: Option<String>,
    /// Insertion timestamp (UTC, SQLite `CURRENT_TIMESTAMP`).
    pub created_at: String,
}

/// SQLite-backed store for generation records and settings.
pub struct GenerationStore {
    conn: Mutex<Connection>,
}

impl GenerationStore {
    /// Open (creating if needed) the database at `path` and ensure the schema.
    pub fn open(path: &Path) -> MemeResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Fully in-memory store, used by tests.
    pub fn open_in_memory() -> MemeResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> MemeResult<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("store lock poisoned")
    }

    /// Insert a new `processing` record for `prompt` and return its id.
    pub fn insert_generation(&self, prompt: &str) -> MemeResult<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO generations (prompt, image_path, top_text, bottom_text, status, error_message)
             VALUES (?1, '', '', '', ?2, NULL)",
            params![prompt, GenerationStatus::Processing.as_str()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Record the terminal outcome of a generation.
    pub fn update_status(
        &self,
        id: i64,
        status: GenerationStatus,
        image_path: &str,
        captions: &CaptionPair,
        error_message: Option<&str>,
    ) -> MemeResult<()> {
        self.conn().execute(
            "UPDATE generations
             SET status = ?1, image_path = ?2, top_text = ?3, bottom_text = ?4, error_message = ?5
             WHERE id = ?6",
            params![
                status.as_str(),
                image_path,
                captions.top,
                captions.bottom,
                error_message,
                id
            ],
        )?;
        Ok(())
    }

    /// Fetch one record by id.
    pub fn get_generation(&self, id: i64) -> MemeResult<Option<Generation>> {
        self.conn()
            .query_row(
                "SELECT id, prompt, image_path, top_text, bottom_text, status, error_message, created_at
                 FROM generations WHERE id = ?1",
                params![id],
                row_to_generation,
            )
            .optional()
            .map_err(MemeError::from)
    }

    /// Newest-first listing bounded by `limit`.
    pub fn list_generations(&self, limit: u32) -> MemeResult<Vec<Generation>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, prompt, image_path, top_text, bottom_text, status, error_message, created_at
             FROM generations ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], row_to_generation)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Read a settings value.
    pub fn get_setting(&self, key: &str) -> MemeResult<Option<String>> {
        self.conn()
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(MemeError::from)
    }

    /// Insert or replace a settings value.
    pub fn set_setting(&self, key: &str, value: &str) -> MemeResult<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

fn row_to_generation(row: &rusqlite::Row<'_>) -> Result<Generation, rusqlite::Error> {
    let status_text: String = row.get(5)?;
    let status = GenerationStatus::from_db(&status_text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("unknown generation status '{status_text}'").into(),
        )
    })?;

    Ok(Generation {
        id: row.get(0)?,
        prompt: row.get(1)?,
        image_path: row.get(2)?,
        top_text: row.get(3)?,
        bottom_text: row.get(4)?,
        status,
        error_message: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn init_schema(conn: &Connection) -> MemeResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS generations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            prompt TEXT NOT NULL,
            image_path TEXT NOT NULL DEFAULT '',
            top_text TEXT NOT NULL DEFAULT '',
            bottom_text TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL,
            error_message TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
        params![SYSTEM_PROMPT_KEY, DEFAULT_SYSTEM_PROMPT],
    )?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/store/db.rs"]
mod tests;
