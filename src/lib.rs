//! # logsight
//!
//! Ingests tab-separated web access logs into a single SQLite table and
//! serves aggregate statistics and canned security insights over HTTP.
//!
//! - [`ingest`]: directory scan, row normalization, batched inserts
//! - [`query`]: counts, top-N, time buckets and free-text search
//! - [`insights`]: fixed pattern scans presented as security findings
//! - [`http_server`]: the axum router exposing all of the above

pub mod config;
pub mod error;
pub mod http_server;
pub mod ingest;
pub mod insights;
pub mod logging;
pub mod query;
pub mod store;

pub use error::{Error, Result};
pub use ingest::{IngestReport, Ingestor};
pub use query::QueryService;
pub use store::{LogRecord, LogStore};
