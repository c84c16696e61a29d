//! SQLite log store
//!
//! [`LogStore`] is a lightweight handle naming the database file. It holds no
//! connection: every operation opens its own `SqliteConnection`, does its
//! work, and closes it again. Callers pass the handle explicitly.

pub mod schema;
pub mod types;

pub use types::{LogRecord, NewLogRecord, SchemaReport};

use crate::error::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection, Row};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Handle to the single-file log database
#[derive(Debug, Clone)]
pub struct LogStore {
    path: PathBuf,
}

impl LogStore {
    /// Create a handle for the database at `path`. Nothing is opened yet.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open an existing database for reading
    pub async fn open(&self) -> Result<SqliteConnection> {
        SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(false)
            .connect()
            .await
            .map_err(|e| Error::ConnectionFailed(format!("{}: {}", self.path.display(), e)))
    }

    /// Open (creating if needed) the database and make sure the schema exists
    pub async fn open_for_write(&self) -> Result<SqliteConnection> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut conn = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true)
            .connect()
            .await
            .map_err(|e| Error::ConnectionFailed(format!("{}: {}", self.path.display(), e)))?;

        Self::initialize(&mut conn).await?;
        Ok(conn)
    }

    /// Create the `logs` table and its indexes if they do not exist
    pub async fn initialize(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(schema::CREATE_LOGS_TABLE)
            .execute(&mut *conn)
            .await
            .map_err(|e| Error::QueryFailed(e.to_string()))?;

        for index_sql in schema::CREATE_INDEXES {
            sqlx::query(index_sql)
                .execute(&mut *conn)
                .await
                .map_err(|e| Error::QueryFailed(e.to_string()))?;
        }

        Ok(())
    }

    /// Insert all records in a single transaction
    pub async fn insert_batch(conn: &mut SqliteConnection, records: &[NewLogRecord]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = conn
            .begin()
            .await
            .map_err(|e| Error::QueryFailed(format!("begin failed: {}", e)))?;

        let mut inserted = 0u64;
        for record in records {
            let result = sqlx::query(schema::INSERT_LOG)
                .bind(&record.ip)
                .bind(&record.timestamp)
                .bind(&record.method)
                .bind(&record.endpoint)
                .bind(record.status)
                .bind(record.size)
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::QueryFailed(e.to_string()))?;
            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| Error::QueryFailed(format!("commit failed: {}", e)))?;

        Ok(inserted)
    }

    /// Report columns, indexes, row count and one sample row
    pub async fn verify(&self) -> Result<SchemaReport> {
        let mut conn = self.open().await?;
        let report = Self::schema_report(&mut conn).await;
        close_quietly(conn).await;
        report
    }

    async fn schema_report(conn: &mut SqliteConnection) -> Result<SchemaReport> {
        let columns = sqlx::query(schema::TABLE_INFO)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| Error::QueryFailed(e.to_string()))?
            .iter()
            .filter_map(|row| row.try_get::<String, _>("name").ok())
            .collect();

        let indexes = sqlx::query(schema::INDEX_LIST)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| Error::QueryFailed(e.to_string()))?
            .iter()
            .filter_map(|row| row.try_get::<String, _>("name").ok())
            .collect();

        let total_logs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM logs")
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| Error::QueryFailed(e.to_string()))?;

        let sample_sql = format!("SELECT {} FROM logs LIMIT 1", schema::RECORD_COLUMNS);
        let sample = sqlx::query(&sample_sql)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| Error::QueryFailed(e.to_string()))?
            .map(|row| LogRecord::from_row(&row))
            .transpose()
            .map_err(|e| Error::QueryFailed(e.to_string()))?;

        Ok(SchemaReport {
            columns,
            indexes,
            total_logs,
            sample,
        })
    }
}

/// Close a connection, logging instead of failing
pub(crate) async fn close_quietly(conn: SqliteConnection) {
    if let Err(e) = conn.close().await {
        warn!(error = %e, "failed to close store connection");
    } else {
        debug!("store connection closed");
    }
}
