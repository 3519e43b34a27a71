//! DuckDB-backed mirror store
//!
//! Entries live in a single `mirror_entries` table. Every statement runs in
//! DuckDB's autocommit mode, so a mutation is durable once it returns.

use super::store::MirrorStore;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use duckdb::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS mirror_entries (
    id VARCHAR PRIMARY KEY,
    payload VARCHAR NOT NULL,
    updated_at VARCHAR NOT NULL
)";

/// Mirror store using an embedded DuckDB database
pub struct DuckDbMirrorStore {
    /// DuckDB connection
    conn: Mutex<Connection>,
    /// Database file, `None` when in memory
    path: Option<PathBuf>,
}

impl DuckDbMirrorStore {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::mirror(format!("Failed to create mirror directory: {e}"))
                })?;
            }
        }

        let conn = Connection::open(&path)
            .map_err(|e| Error::mirror(format!("Failed to open DuckDB mirror: {e}")))?;
        Self::init(conn, Some(path))
    }

    /// Create a store in an in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::mirror(format!("Failed to create DuckDB connection: {e}")))?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch(CREATE_TABLE_SQL)
            .map_err(|e| Error::mirror(format!("Failed to create mirror table: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Get the database path (None for in-memory)
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::mirror("DuckDB connection lock poisoned"))
    }

    fn select_payload(conn: &Connection, id: &str) -> Result<Option<String>> {
        let mut stmt = conn
            .prepare("SELECT payload FROM mirror_entries WHERE id = ?")
            .map_err(|e| Error::mirror(format!("Failed to prepare lookup: {e}")))?;
        let mut rows = stmt
            .query_map(params![id], |row| row.get::<_, String>(0))
            .map_err(|e| Error::mirror(format!("Failed to look up '{id}': {e}")))?;

        rows.next()
            .transpose()
            .map_err(|e| Error::mirror(format!("Failed to read '{id}': {e}")))
    }
}

impl std::fmt::Debug for DuckDbMirrorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbMirrorStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MirrorStore for DuckDbMirrorStore {
    async fn upsert(&self, id: &str, payload: &str) -> Result<()> {
        let conn = self.conn()?;
        if Self::select_payload(&conn, id)?.as_deref() == Some(payload) {
            return Ok(());
        }

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        conn.execute(
            "INSERT OR REPLACE INTO mirror_entries (id, payload, updated_at) VALUES (?, ?, ?)",
            params![id, payload, now],
        )
        .map_err(|e| Error::mirror(format!("Failed to upsert '{id}': {e}")))?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM mirror_entries WHERE id = ?", params![id])
            .map_err(|e| Error::mirror(format!("Failed to delete '{id}': {e}")))?;
        Ok(())
    }

    async fn contains(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        Ok(Self::select_payload(&conn, id)?.is_some())
    }

    async fn clear(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch("DELETE FROM mirror_entries")
            .map_err(|e| Error::mirror(format!("Failed to clear mirror: {e}")))?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        Self::select_payload(&conn, id)
    }

    async fn len(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM mirror_entries", [], |row| row.get(0))
            .map_err(|e| Error::mirror(format!("Failed to count entries: {e}")))?;
        Ok(count as usize)
    }

    async fn ids(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id FROM mirror_entries ORDER BY id")
            .map_err(|e| Error::mirror(format!("Failed to prepare id listing: {e}")))?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| Error::mirror(format!("Failed to list ids: {e}")))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::mirror(format!("Failed to read id: {e}")))?;
        Ok(ids)
    }
}
