//! SQL audit log of completed missions

use chrono::{DateTime, Utc};
use mia_core::{AuditError, SqliteTarget};
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

/// Status written for missions that produced a report
pub const STATUS_COMPLETED: &str = "COMPLETED";

/// One audit row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionLog {
    pub id: i64,
    pub conversation_id: i64,
    pub query: String,
    pub response: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// `mission_logs` table behind a single connection
#[derive(Debug)]
pub struct MissionStore {
    conn: Mutex<Connection>,
}

fn db_error(err: rusqlite::Error) -> AuditError {
    AuditError::Database(err.to_string())
}

impl MissionStore {
    /// Open the configured database and create the schema
    pub fn open(target: &SqliteTarget) -> Result<Self, AuditError> {
        let conn = match target {
            SqliteTarget::Memory => Connection::open_in_memory(),
            SqliteTarget::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| AuditError::Database(e.to_string()))?;
                }
                Connection::open(path)
            }
        }
        .map_err(db_error)?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        tracing::info!(?target, "Audit database ready");
        Ok(store)
    }

    /// In-memory store (tests, ephemeral deployments)
    pub fn in_memory() -> Result<Self, AuditError> {
        Self::open(&SqliteTarget::Memory)
    }

    /// Create tables and indexes if missing
    pub fn migrate(&self) -> Result<(), AuditError> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS mission_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL,
                query TEXT NOT NULL,
                response TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_mission_logs_conversation
                ON mission_logs(conversation_id);",
        )
        .map_err(db_error)
    }

    /// Append a row; returns its id
    pub fn record(
        &self,
        conversation_id: i64,
        query: &str,
        response: &str,
        status: &str,
    ) -> Result<i64, AuditError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO mission_logs (conversation_id, query, response, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![conversation_id, query, response, status, Utc::now().to_rfc3339()],
        )
        .map_err(db_error)?;
        Ok(conn.last_insert_rowid())
    }

    /// Newest rows first
    pub fn recent(&self, limit: usize) -> Result<Vec<MissionLog>, AuditError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.select(
            "SELECT id, conversation_id, query, response, status, created_at
             FROM mission_logs ORDER BY id DESC LIMIT ?1",
            limit,
        )
    }

    /// Rows of one conversation, oldest first
    pub fn for_conversation(&self, conversation_id: i64) -> Result<Vec<MissionLog>, AuditError> {
        self.select(
            "SELECT id, conversation_id, query, response, status, created_at
             FROM mission_logs WHERE conversation_id = ?1 ORDER BY id ASC",
            conversation_id,
        )
    }

    /// Liveness check (`SELECT 1`)
    pub fn ping(&self) -> Result<(), AuditError> {
        let conn = self.conn.lock();
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(db_error)
    }

    fn select(&self, sql: &str, param: i64) -> Result<Vec<MissionLog>, AuditError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql).map_err(db_error)?;
        let rows = stmt
            .query_map(params![param], row_to_log)
            .map_err(db_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_error)?;
        Ok(rows)
    }
}

fn row_to_log(row: &Row<'_>) -> rusqlite::Result<MissionLog> {
    let created_at: String = row.get(5)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(MissionLog {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        query: row.get(2)?,
        response: row.get(3)?,
        status: row.get(4)?,
        created_at,
    })
}
