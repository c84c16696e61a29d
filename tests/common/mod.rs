//! Shared helpers for integration tests

#![allow(dead_code)]

use logsight::store::{LogStore, NewLogRecord};
use sqlx::Connection;
use std::path::Path;
use tempfile::TempDir;

pub const KAGGLE_HEADER: &str =
    "host\tlogname\ttime\tmethod\turl\tresponse\tbytes\treferer\tuseragent";

/// Build one Kaggle-style TSV data row
pub fn tsv_row(host: &str, time: &str, url: &str, response: &str, bytes: &str) -> String {
    format!("{host}\t-\t{time}\tGET\t{url}\t{response}\t{bytes}\t-\t-")
}

/// Write a TSV file with the Kaggle header followed by `rows`
pub fn write_tsv(dir: &Path, name: &str, rows: &[String]) {
    let mut body = String::from(KAGGLE_HEADER);
    body.push('\n');
    for row in rows {
        body.push_str(row);
        body.push('\n');
    }
    std::fs::write(dir.join(name), body).unwrap();
}

pub fn record(ip: &str, timestamp: &str, endpoint: &str, status: i64) -> NewLogRecord {
    NewLogRecord {
        ip: ip.to_string(),
        timestamp: timestamp.to_string(),
        method: "GET".to_string(),
        endpoint: endpoint.to_string(),
        status,
        size: 100,
    }
}

/// Create a store in a fresh temp dir and insert `records`
pub async fn seeded_store(records: &[NewLogRecord]) -> (TempDir, LogStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = LogStore::new(dir.path().join("logs.db"));

    let mut conn = store.open_for_write().await.unwrap();
    LogStore::insert_batch(&mut conn, records).await.unwrap();
    conn.close().await.unwrap();

    (dir, store)
}

/// `count` copies of the same record
pub fn repeat(record: NewLogRecord, count: usize) -> Vec<NewLogRecord> {
    std::iter::repeat(record).take(count).collect()
}
