//! Read-only aggregate queries over the log store
//!
//! Every call opens a connection, aggregates from scratch and closes it. Only
//! a store that cannot be opened is reported as an error; a statement that
//! fails is logged and yields an empty or zero result.

pub mod bucket;

pub use bucket::{BucketKeyExtractor, PrefixBucket};

use crate::error::Result;
use crate::insights::{self, InsightEntry};
use crate::store::{self, schema, LogRecord, LogStore};
use serde::Serialize;
use sqlx::sqlite::{Sqlite, SqliteConnection};
use std::sync::Arc;
use tracing::warn;

/// Rows returned by the top-N views
pub const TOP_N: i64 = 10;

/// Rows returned by record searches
pub const SEARCH_LIMIT: i64 = 50;

/// Totals and error-rate percentages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub total_logs: i64,
    pub error_4xx_percentage: f64,
    pub error_5xx_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointCount {
    pub endpoint: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpCount {
    pub ip: String,
    pub count: i64,
}

/// Parallel arrays of bucket labels and counts, ascending by label
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimeSeries {
    pub labels: Vec<String>,
    pub data: Vec<i64>,
}

/// Search response, serialized as `{"type": ..., "data": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum SearchResult {
    Logs(Vec<LogRecord>),
    Analysis(Vec<InsightEntry>),
}

/// Which branch a free-text query takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchRoute {
    /// Most recent records with status >= 500
    ServerErrors,
    /// Security insight summary instead of records
    SecurityAnalysis,
    /// Case-sensitive substring match on ip or endpoint
    Substring,
}

impl SearchRoute {
    pub fn classify(query: &str) -> Self {
        let lowered = query.to_lowercase();
        if query.contains("500") || lowered.contains("error") {
            SearchRoute::ServerErrors
        } else if lowered.contains("suspicious") || lowered.contains("security") {
            SearchRoute::SecurityAnalysis
        } else {
            SearchRoute::Substring
        }
    }
}

/// Percentage of `part` in `total`, rounded half-to-even at two decimals; 0 for an empty store
pub fn percentage(part: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    round2(part as f64 / total as f64 * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Log a failed statement and fall back to the empty value
fn or_empty<T: Default>(result: std::result::Result<T, sqlx::Error>, operation: &str) -> T {
    result.unwrap_or_else(|e| {
        warn!(operation, error = %e, "query failed");
        T::default()
    })
}

/// Aggregate query catalogue bound to a store handle
#[derive(Clone)]
pub struct QueryService {
    store: LogStore,
    bucket: Arc<dyn BucketKeyExtractor>,
}

impl QueryService {
    /// Query service with hourly buckets
    pub fn new(store: LogStore) -> Self {
        Self::with_bucket(store, Arc::new(PrefixBucket::hourly()))
    }

    pub fn with_bucket(store: LogStore, bucket: Arc<dyn BucketKeyExtractor>) -> Self {
        Self { store, bucket }
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }

    /// Number of stored records
    pub async fn total_count(&self) -> Result<i64> {
        let mut conn = self.store.open().await?;
        let total = count(&mut conn, "SELECT COUNT(*) FROM logs", "total_count").await;
        store::close_quietly(conn).await;
        Ok(total)
    }

    /// Total plus 4xx and 5xx shares
    pub async fn stats(&self) -> Result<Stats> {
        let mut conn = self.store.open().await?;

        let total = count(&mut conn, "SELECT COUNT(*) FROM logs", "stats").await;
        let total_4xx = count(
            &mut conn,
            "SELECT COUNT(*) FROM logs WHERE status >= 400 AND status < 500",
            "stats",
        )
        .await;
        let total_5xx = count(
            &mut conn,
            "SELECT COUNT(*) FROM logs WHERE status >= 500",
            "stats",
        )
        .await;

        store::close_quietly(conn).await;

        Ok(Stats {
            total_logs: total,
            error_4xx_percentage: percentage(total_4xx, total),
            error_5xx_percentage: percentage(total_5xx, total),
        })
    }

    /// Ten most requested endpoints, ties broken by endpoint ascending
    pub async fn top_endpoints(&self) -> Result<Vec<EndpointCount>> {
        let mut conn = self.store.open().await?;
        let rows: Vec<(String, i64)> = or_empty(
            sqlx::query_as::<Sqlite, (String, i64)>(
                "SELECT endpoint, COUNT(*) AS count FROM logs \
                 GROUP BY endpoint ORDER BY count DESC, endpoint ASC LIMIT ?",
            )
            .bind(TOP_N)
            .fetch_all(&mut conn)
            .await,
            "top_endpoints",
        );
        store::close_quietly(conn).await;

        Ok(rows
            .into_iter()
            .map(|(endpoint, count)| EndpointCount { endpoint, count })
            .collect())
    }

    /// Ten busiest client addresses, ties broken by ip ascending
    pub async fn top_ips(&self) -> Result<Vec<IpCount>> {
        let mut conn = self.store.open().await?;
        let rows: Vec<(String, i64)> = or_empty(
            sqlx::query_as::<Sqlite, (String, i64)>(
                "SELECT ip, COUNT(*) AS count FROM logs \
                 GROUP BY ip ORDER BY count DESC, ip ASC LIMIT ?",
            )
            .bind(TOP_N)
            .fetch_all(&mut conn)
            .await,
            "top_ips",
        );
        store::close_quietly(conn).await;

        Ok(rows
            .into_iter()
            .map(|(ip, count)| IpCount { ip, count })
            .collect())
    }

    /// Record counts per time bucket
    pub async fn requests_over_time(&self) -> Result<TimeSeries> {
        let sql = format!(
            "SELECT {expr} AS time_bucket, COUNT(*) AS count FROM logs \
             GROUP BY time_bucket ORDER BY time_bucket ASC",
            expr = self.bucket.sql_expr()
        );

        let mut conn = self.store.open().await?;
        let rows: Vec<(String, i64)> = or_empty(
            sqlx::query_as::<Sqlite, (String, i64)>(&sql).fetch_all(&mut conn).await,
            "requests_over_time",
        );
        store::close_quietly(conn).await;

        let (labels, data) = rows.into_iter().unzip();
        Ok(TimeSeries { labels, data })
    }

    /// Free-text search, routed by [`SearchRoute::classify`]
    pub async fn search(&self, query: &str) -> Result<SearchResult> {
        let mut conn = self.store.open().await?;

        let result = match SearchRoute::classify(query) {
            SearchRoute::ServerErrors => {
                let sql = format!(
                    "SELECT {} FROM logs WHERE status >= 500 ORDER BY id DESC LIMIT ?",
                    schema::RECORD_COLUMNS
                );
                let records = fetch_records(&mut conn, &sql, None).await;
                SearchResult::Logs(records)
            }
            SearchRoute::SecurityAnalysis => {
                SearchResult::Analysis(insights::summary::summarize(&mut conn).await)
            }
            SearchRoute::Substring => {
                let sql = format!(
                    "SELECT {} FROM logs WHERE instr(ip, ?) > 0 OR instr(endpoint, ?) > 0 LIMIT ?",
                    schema::RECORD_COLUMNS
                );
                let records = fetch_records(&mut conn, &sql, Some(query)).await;
                SearchResult::Logs(records)
            }
        };

        store::close_quietly(conn).await;
        Ok(result)
    }
}

async fn count(conn: &mut SqliteConnection, sql: &str, operation: &str) -> i64 {
    or_empty(
        sqlx::query_scalar::<_, i64>(sql).fetch_one(&mut *conn).await,
        operation,
    )
}

/// Run a record query capped at [`SEARCH_LIMIT`]; `needle` binds both substring slots
async fn fetch_records(
    conn: &mut SqliteConnection,
    sql: &str,
    needle: Option<&str>,
) -> Vec<LogRecord> {
    let mut query = sqlx::query::<Sqlite>(sql);
    if let Some(needle) = needle {
        query = query.bind(needle).bind(needle);
    }

    let rows = or_empty(
        query.bind(SEARCH_LIMIT).fetch_all(&mut *conn).await,
        "search",
    );

    rows.iter()
        .filter_map(|row| match LogRecord::from_row(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "skipping undecodable row");
                None
            }
        })
        .collect()
}
