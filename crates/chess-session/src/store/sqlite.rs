use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use crate::checkpoint::{Checkpoint, CheckpointError, CheckpointStore};
use crate::store::check_id;

/// SQLite-backed checkpoint storage.
///
/// The full checkpoint is kept as JSON in the `state` column; outcome and
/// ply count are duplicated into their own columns for listing and ad-hoc
/// queries.
///
/// # Example
///
/// ```ignore
/// let store = SqliteStore::open("data/sessions.db")?;
/// store.save(&checkpoint)?;
/// let restored = store.load(&checkpoint.id)?;
/// ```
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates a database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Opens a private in-memory database.
    pub fn in_memory() -> Result<Self, CheckpointError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, CheckpointError> {
        init_schema(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS checkpoints (
            id TEXT PRIMARY KEY,
            outcome TEXT NOT NULL,
            ply_count INTEGER NOT NULL,
            state TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_checkpoints_created ON checkpoints(created_at);
        ",
    )
}

impl CheckpointStore for SqliteStore {
    fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        check_id(&checkpoint.id)?;
        let state = serde_json::to_string(checkpoint)?;
        let outcome = serde_json::to_value(checkpoint.outcome)?
            .as_str()
            .unwrap_or_default()
            .to_string();

        self.conn().execute(
            "INSERT INTO checkpoints (id, outcome, ply_count, state, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                outcome = excluded.outcome,
                ply_count = excluded.ply_count,
                state = excluded.state,
                updated_at = excluded.updated_at",
            params![
                checkpoint.id,
                outcome,
                checkpoint.ledger.len() as i64,
                state,
                checkpoint.created_at.to_rfc3339(),
                checkpoint.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        check_id(id)?;
        let state: Option<String> = self
            .conn()
            .query_row(
                "SELECT state FROM checkpoints WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()?;
        state.map(|json| Checkpoint::from_json(&json)).transpose()
    }

    fn delete(&self, id: &str) -> Result<bool, CheckpointError> {
        check_id(id)?;
        let removed = self
            .conn()
            .execute("DELETE FROM checkpoints WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }

    fn list(&self) -> Result<Vec<String>, CheckpointError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id FROM checkpoints ORDER BY created_at, rowid")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }
}
