//! Batch ingestion of tab-separated access logs
//!
//! [`Ingestor::run`] scans a directory for files with the configured
//! extension, walks them in filename order and appends normalized rows to the
//! store in bulk-insert transactions of `batch_size` records.
//!
//! Failure handling:
//! - a malformed row is counted and dropped
//! - a file that cannot be opened, read, or has no header is logged and skipped
//! - an unreadable directory aborts the run with [`Error::Ingest`]
//! - a failed bulk insert aborts the run with [`Error::QueryFailed`]

pub mod parser;

pub use parser::{HeaderLayout, RejectReason, RowOutcome};

use crate::config::IngestConfig;
use crate::error::{Error, Result};
use crate::store::{self, LogStore, NewLogRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteConnection;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

/// Counters collected over one ingestion run
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub files_found: usize,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub rows_seen: u64,
    pub accepted: u64,
    pub rejected_missing_ip: u64,
    pub rejected_missing_timestamp: u64,
    pub malformed: u64,
    pub batches_flushed: u64,
    pub limit_reached: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl IngestReport {
    /// Rows read but not persisted
    pub fn rejected(&self) -> u64 {
        self.rejected_missing_ip + self.rejected_missing_timestamp + self.malformed
    }

    fn record(&mut self, reason: &RejectReason) {
        match reason {
            RejectReason::MissingIp => self.rejected_missing_ip += 1,
            RejectReason::MissingTimestamp => self.rejected_missing_timestamp += 1,
            RejectReason::Truncated { .. } => self.malformed += 1,
        }
    }
}

/// How a single file ended
#[derive(Debug)]
enum FileStatus {
    Completed,
    Skipped(String),
}

/// Mutable state shared across files within one run
struct RunState {
    batch: Vec<NewLogRecord>,
    report: IngestReport,
}

/// Directory-to-store ingestion pipeline
pub struct Ingestor {
    store: LogStore,
    config: IngestConfig,
}

impl Ingestor {
    pub fn new(store: LogStore, config: IngestConfig) -> Self {
        Self { store, config }
    }

    fn extension(&self) -> &str {
        self.config.extension.trim_start_matches('.')
    }

    fn batch_size(&self) -> usize {
        self.config.batch_size.max(1)
    }

    fn limit_reached(&self, report: &IngestReport) -> bool {
        self.config
            .limit
            .is_some_and(|limit| report.accepted >= limit)
    }

    /// Matching files in `data_dir`, sorted by file name
    pub async fn discover_files(&self) -> Result<Vec<PathBuf>> {
        let dir = &self.config.data_dir;
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| Error::Ingest(format!("cannot read {}: {}", dir.display(), e)))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::Ingest(format!("cannot read {}: {}", dir.display(), e)))?
        {
            let path = entry.path();
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == self.extension());
            if is_file && matches {
                files.push(path);
            }
        }

        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    /// Ingest every matching file until exhausted or the limit is reached
    ///
    /// The data directory is listed before the store is opened, so a bad
    /// directory leaves no database behind.
    pub async fn run(&self) -> Result<IngestReport> {
        let started_at = Utc::now();
        let files = self.discover_files().await?;

        let mut conn = self.store.open_for_write().await?;
        let outcome = self.run_with(&mut conn, files, started_at).await;
        store::close_quietly(conn).await;
        outcome
    }

    async fn run_with(
        &self,
        conn: &mut SqliteConnection,
        files: Vec<PathBuf>,
        started_at: DateTime<Utc>,
    ) -> Result<IngestReport> {
        let mut state = RunState {
            batch: Vec::with_capacity(self.batch_size()),
            report: IngestReport {
                started_at: Some(started_at),
                files_found: files.len(),
                ..Default::default()
            },
        };

        if files.is_empty() {
            warn!(
                dir = %self.config.data_dir.display(),
                extension = self.extension(),
                "no log files found"
            );
            state.report.finished_at = Some(Utc::now());
            return Ok(state.report);
        }

        info!(
            count = files.len(),
            limit = ?self.config.limit,
            "starting ingestion"
        );

        for path in &files {
            if self.limit_reached(&state.report) {
                break;
            }

            match self.ingest_file(path, conn, &mut state).await? {
                FileStatus::Completed => state.report.files_processed += 1,
                FileStatus::Skipped(reason) => {
                    error!(file = %path.display(), reason = %reason, "skipping file");
                    state.report.files_skipped += 1;
                }
            }
        }

        self.flush(conn, &mut state).await?;

        state.report.limit_reached = self.limit_reached(&state.report);
        state.report.finished_at = Some(Utc::now());

        info!(
            accepted = state.report.accepted,
            rejected = state.report.rejected(),
            files = state.report.files_processed,
            "ingestion complete"
        );
        Ok(state.report)
    }

    /// Process one file. `Err` is reserved for store failures.
    async fn ingest_file(
        &self,
        path: &Path,
        conn: &mut SqliteConnection,
        state: &mut RunState,
    ) -> Result<FileStatus> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!(file = %name, "processing");

        let file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(e) => return Ok(FileStatus::Skipped(format!("open failed: {}", e))),
        };
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();

        let header = loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => return Ok(FileStatus::Skipped("no header found".to_string())),
                Ok(_) => {
                    if let Some(header) = HeaderLayout::parse(&parser::decode_line(&buf)) {
                        break header;
                    }
                }
                Err(e) => return Ok(FileStatus::Skipped(format!("read failed: {}", e))),
            }
        };
        info!(file = %name, columns = ?header.columns(), "header detected");

        loop {
            if self.limit_reached(&state.report) {
                break;
            }

            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => return Ok(FileStatus::Skipped(format!("read failed: {}", e))),
            }

            let line = parser::decode_line(&buf);
            if line.is_empty() {
                continue;
            }
            state.report.rows_seen += 1;

            match header.parse_row(&line) {
                RowOutcome::Accepted(record) => {
                    state.batch.push(record);
                    state.report.accepted += 1;
                    if state.batch.len() >= self.batch_size() {
                        self.flush(conn, state).await?;
                    }
                }
                RowOutcome::Rejected(reason) => {
                    debug!(file = %name, reason = %reason, "row dropped");
                    state.report.record(&reason);
                }
            }
        }

        Ok(FileStatus::Completed)
    }

    async fn flush(&self, conn: &mut SqliteConnection, state: &mut RunState) -> Result<()> {
        if state.batch.is_empty() {
            return Ok(());
        }

        LogStore::insert_batch(conn, &state.batch).await?;
        state.batch.clear();
        state.report.batches_flushed += 1;
        info!(accepted = state.report.accepted, "logs inserted");
        Ok(())
    }
}
