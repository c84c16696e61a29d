//! Record types stored in and read back from the `logs` table

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// One persisted access-log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Surrogate key assigned by the store
    pub id: i64,
    pub ip: String,
    /// Log-native timestamp, stored verbatim
    pub timestamp: String,
    pub method: String,
    pub endpoint: String,
    pub status: i64,
    pub size: i64,
}

impl LogRecord {
    /// Build a record from a row selected with [`RECORD_COLUMNS`](super::schema::RECORD_COLUMNS)
    pub fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            ip: row.try_get::<Option<String>, _>("ip")?.unwrap_or_default(),
            timestamp: row
                .try_get::<Option<String>, _>("timestamp")?
                .unwrap_or_default(),
            method: row.try_get::<Option<String>, _>("method")?.unwrap_or_default(),
            endpoint: row
                .try_get::<Option<String>, _>("endpoint")?
                .unwrap_or_default(),
            status: row.try_get::<Option<i64>, _>("status")?.unwrap_or_default(),
            size: row.try_get::<Option<i64>, _>("size")?.unwrap_or_default(),
        })
    }
}

/// A normalized entry produced by ingestion, not yet assigned an id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogRecord {
    pub ip: String,
    pub timestamp: String,
    pub method: String,
    pub endpoint: String,
    pub status: i64,
    pub size: i64,
}

/// Snapshot of the store layout used by `logsight verify`
#[derive(Debug, Clone, Serialize)]
pub struct SchemaReport {
    pub columns: Vec<String>,
    pub indexes: Vec<String>,
    pub total_logs: i64,
    pub sample: Option<LogRecord>,
}
