//! Aggregate query tests

mod common;

use common::{record, repeat, seeded_store};
use logsight::query::{BucketKeyExtractor, PrefixBucket, QueryService, SearchResult};
use logsight::store::NewLogRecord;
use logsight::LogStore;
use std::collections::BTreeMap;
use std::sync::Arc;

#[tokio::test]
async fn test_stats_percentages() {
    let (_dir, store) = seeded_store(&[
        record("1.1.1.1", "01/Aug/1995:00:00:01 -0400", "/a", 500),
        record("1.1.1.1", "01/Aug/1995:00:00:02 -0400", "/a", 404),
        record("1.1.1.1", "01/Aug/1995:00:00:03 -0400", "/a", 200),
    ])
    .await;

    let stats = QueryService::new(store).stats().await.unwrap();
    assert_eq!(stats.total_logs, 3);
    assert_eq!(stats.error_4xx_percentage, 33.33);
    assert_eq!(stats.error_5xx_percentage, 33.33);
}

#[tokio::test]
async fn test_stats_on_empty_store() {
    let (_dir, store) = seeded_store(&[]).await;

    let stats = QueryService::new(store).stats().await.unwrap();
    assert_eq!(stats.total_logs, 0);
    assert_eq!(stats.error_4xx_percentage, 0.0);
    assert_eq!(stats.error_5xx_percentage, 0.0);
}

#[tokio::test]
async fn test_error_shares_never_exceed_total() {
    let mut records = repeat(record("a", "t", "/", 503), 7);
    records.extend(repeat(record("a", "t", "/", 401), 5));
    records.extend(repeat(record("a", "t", "/", 499), 1));
    let (_dir, store) = seeded_store(&records).await;

    let stats = QueryService::new(store).stats().await.unwrap();
    assert!(stats.error_4xx_percentage + stats.error_5xx_percentage <= 100.0);
    assert_eq!(stats.error_5xx_percentage, 53.85);
    assert_eq!(stats.error_4xx_percentage, 46.15);
}

#[tokio::test]
async fn test_stats_round_half_to_even() {
    let mut records = repeat(record("a", "t", "/", 404), 1);
    records.extend(repeat(record("a", "t", "/", 503), 5));
    records.extend(repeat(record("a", "t", "/", 200), 26));
    let (_dir, store) = seeded_store(&records).await;

    let stats = QueryService::new(store).stats().await.unwrap();
    assert_eq!(stats.total_logs, 32);
    // 3.125 and 15.625 are exact ties
    assert_eq!(stats.error_4xx_percentage, 3.12);
    assert_eq!(stats.error_5xx_percentage, 15.62);
}

#[tokio::test]
async fn test_missing_database_is_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let queries = QueryService::new(LogStore::new(dir.path().join("missing.db")));

    assert!(queries.stats().await.unwrap_err().is_store_unavailable());
    assert!(queries.search("x").await.unwrap_err().is_store_unavailable());
}

#[tokio::test]
async fn test_top_endpoints_ordering_and_limit() {
    let mut records = Vec::new();
    for i in 0..12 {
        // /p0 gets 12 hits, /p1 11, ... /p11 1
        records.extend(repeat(record("ip", "t", &format!("/p{i}"), 200), 12 - i));
    }
    // Tie with /p10 (2 hits); "/a" sorts first
    records.extend(repeat(record("ip", "t", "/a", 200), 2));
    let (_dir, store) = seeded_store(&records).await;
    let queries = QueryService::new(store);

    let top = queries.top_endpoints().await.unwrap();
    assert_eq!(top.len(), 10);
    assert_eq!(top[0].endpoint, "/p0");
    assert_eq!(top[0].count, 12);
    assert_eq!(top[9].endpoint, "/p9");
    assert!(top.windows(2).all(|w| w[0].count >= w[1].count));

    // Idempotent on an unchanged store
    assert_eq!(queries.top_endpoints().await.unwrap(), top);
}

#[tokio::test]
async fn test_top_ips_tie_break() {
    let mut records = repeat(record("10.0.0.2", "t", "/", 200), 3);
    records.extend(repeat(record("10.0.0.1", "t", "/", 200), 3));
    records.extend(repeat(record("10.0.0.3", "t", "/", 200), 5));
    let (_dir, store) = seeded_store(&records).await;

    let top = QueryService::new(store).top_ips().await.unwrap();
    let ips: Vec<_> = top.iter().map(|c| c.ip.as_str()).collect();
    assert_eq!(ips, vec!["10.0.0.3", "10.0.0.1", "10.0.0.2"]);
    assert_eq!(top[0].count, 5);
}

#[tokio::test]
async fn test_requests_over_time_buckets() {
    let (_dir, store) = seeded_store(&[
        record("a", "01/Aug/1995:01:00:00 -0400", "/", 200),
        record("a", "01/Aug/1995:00:00:01 -0400", "/", 200),
        record("a", "01/Aug/1995:00:00:59 -0400", "/", 200),
    ])
    .await;

    let series = QueryService::new(store).requests_over_time().await.unwrap();
    assert_eq!(series.labels, vec!["01/Aug/1995:00", "01/Aug/1995:01"]);
    assert_eq!(series.data, vec![2, 1]);
}

struct DayBucket;

impl BucketKeyExtractor for DayBucket {
    fn sql_expr(&self) -> String {
        "SUBSTR(timestamp, 1, 11)".to_string()
    }

    fn bucket_key(&self, timestamp: &str) -> String {
        timestamp.chars().take(11).collect()
    }
}

#[tokio::test]
async fn test_custom_bucket_extractor() {
    let (_dir, store) = seeded_store(&[
        record("a", "01/Aug/1995:00:00:01 -0400", "/", 200),
        record("a", "01/Aug/1995:23:00:00 -0400", "/", 200),
        record("a", "02/Aug/1995:00:00:00 -0400", "/", 200),
    ])
    .await;

    let series = QueryService::with_bucket(store, Arc::new(DayBucket))
        .requests_over_time()
        .await
        .unwrap();
    assert_eq!(series.labels, vec!["01/Aug/1995", "02/Aug/1995"]);
    assert_eq!(series.data, vec![2, 1]);
}

/// Grouping in SQL must give the same buckets as `bucket_key` in Rust
async fn assert_extractor_agrees(bucket: Arc<dyn BucketKeyExtractor>, records: &[NewLogRecord]) {
    let mut expected: BTreeMap<String, i64> = BTreeMap::new();
    for record in records {
        *expected.entry(bucket.bucket_key(&record.timestamp)).or_default() += 1;
    }

    let (_dir, store) = seeded_store(records).await;
    let series = QueryService::with_bucket(store, bucket)
        .requests_over_time()
        .await
        .unwrap();

    let actual: BTreeMap<String, i64> = series.labels.into_iter().zip(series.data).collect();
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_sql_buckets_match_bucket_key() {
    let records = vec![
        record("a", "01/Aug/1995:00:00:01 -0400", "/", 200),
        record("a", "01/Aug/1995:00:59:59 -0400", "/", 200),
        record("a", "01/Aug/1995:23:00:00 -0400", "/", 200),
        record("a", "02/Aug/1995:00:00:00 -0400", "/", 200),
        record("a", "01/Aug", "/", 200),
        record("a", "03/Août/1995:07:00:00", "/", 200),
    ];

    assert_extractor_agrees(Arc::new(PrefixBucket::hourly()), &records).await;
    assert_extractor_agrees(Arc::new(PrefixBucket::new(11)), &records).await;
    assert_extractor_agrees(Arc::new(DayBucket), &records).await;
}

#[tokio::test]
async fn test_search_error_returns_recent_server_errors() {
    let (_dir, store) = seeded_store(&[
        record("1.1.1.1", "t1", "/ok", 200),
        record("2.2.2.2", "t2", "/boom", 503),
        record("3.3.3.3", "t3", "/fail", 500),
    ])
    .await;
    let queries = QueryService::new(store);

    let SearchResult::Logs(records) = queries.search("error").await.unwrap() else {
        panic!("expected logs");
    };
    assert_eq!(records.len(), 2);
    // Highest id first
    assert_eq!(records[0].endpoint, "/fail");
    assert_eq!(records[1].status, 503);
    assert_eq!(records[1].ip, "2.2.2.2");
}

#[tokio::test]
async fn test_search_single_503_record() {
    let (_dir, store) = seeded_store(&[record("4.4.4.4", "t", "/x", 503)]).await;

    let json = serde_json::to_value(QueryService::new(store).search("error").await.unwrap())
        .unwrap();
    assert_eq!(json["type"], "logs");
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    let row = &json["data"][0];
    for field in ["id", "ip", "timestamp", "method", "endpoint", "status", "size"] {
        assert!(row.get(field).is_some(), "missing {field}");
    }
    assert_eq!(row["status"], 503);
}

#[tokio::test]
async fn test_search_substring_is_case_sensitive() {
    let (_dir, store) = seeded_store(&[
        record("1.1.1.1", "t", "/Images/logo.gif", 200),
        record("2.2.2.2", "t", "/images/logo.gif", 200),
        record("192.168.0.9", "t", "/", 200),
    ])
    .await;
    let queries = QueryService::new(store);

    let SearchResult::Logs(records) = queries.search("images").await.unwrap() else {
        panic!("expected logs");
    };
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].ip, "2.2.2.2");

    let SearchResult::Logs(records) = queries.search("192.168").await.unwrap() else {
        panic!("expected logs");
    };
    assert_eq!(records.len(), 1);

    // LIKE wildcards are matched literally
    let SearchResult::Logs(records) = queries.search("%").await.unwrap() else {
        panic!("expected logs");
    };
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_search_limits_results() {
    let (_dir, store) = seeded_store(&repeat(record("5.5.5.5", "t", "/x", 200), 60)).await;

    let SearchResult::Logs(records) = QueryService::new(store).search("5.5.5.5").await.unwrap()
    else {
        panic!("expected logs");
    };
    assert_eq!(records.len(), 50);
}

#[tokio::test]
async fn test_search_security_on_empty_store() {
    let (_dir, store) = seeded_store(&[]).await;

    let SearchResult::Analysis(entries) = QueryService::new(store).search("security").await.unwrap()
    else {
        panic!("expected analysis");
    };
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].category, "SQL Injection Attempt");
    assert_eq!(entries[1].category, "Bot Aggregator / Scraping");
    assert_eq!(entries[2].category, "Failed Login Burst");
}
