//! Rule-based detectors behind `/security-insights`
//!
//! These overlap with [`summary`](super::summary) but report per-detector
//! shapes and apply their own thresholds. Each detector opens its own
//! connection.

use super::HEAVY_HITTER_THRESHOLD;
use crate::error::Result;
use crate::store::{self, LogStore};
use serde::Serialize;
use sqlx::sqlite::{Sqlite, SqliteConnection};
use tracing::warn;

/// Above this many matching requests the SQL injection risk is `High`
pub const SQL_INJECTION_HIGH_RISK_THRESHOLD: i64 = 100;
/// Heavy hitters summed into the bot-scraping request count
pub const BOT_SCRAPING_TOP_IPS: i64 = 5;
/// A single ip needs more than this many 401/403 responses to count as a burst
pub const FAILED_LOGIN_BURST_THRESHOLD: i64 = 10;

const SQL_INJECTION_SAMPLE: &str = "Sample malicious request: /api/search?query=SELECT * FROM users";
const SUSPECTED_USER_AGENTS: [&str; 2] = ["Bot/1.0", "Scrapy/1.0"];
const BOT_RECOMMENDATION: &str = "Implement rate limiting and CAPTCHA";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlInjectionReport {
    pub request_count: i64,
    pub sample_malicious_request: String,
    pub unique_ip_count: i64,
    pub risk_level: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BotScrapingReport {
    pub request_count: i64,
    pub suspected_user_agents: Vec<String>,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedLoginBurstReport {
    pub attempt_count: i64,
    pub source_ip: Option<String>,
    pub time_window: String,
    pub alert_message: String,
}

/// All three detector reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityInsights {
    pub sql_injection: SqlInjectionReport,
    pub bot_scraping: BotScrapingReport,
    pub failed_login_burst: FailedLoginBurstReport,
}

/// Run every detector
pub async fn security_insights(store: &LogStore) -> Result<SecurityInsights> {
    Ok(SecurityInsights {
        sql_injection: detect_sql_injection(store).await?,
        bot_scraping: detect_bot_scraping(store).await?,
        failed_login_burst: detect_failed_login_burst(store).await?,
    })
}

/// Requests whose endpoint carries `SELECT`, `UNION` or `DROP`, grouped by ip
pub async fn detect_sql_injection(store: &LogStore) -> Result<SqlInjectionReport> {
    let mut conn = store.open().await?;
    let per_ip = fetch_or_empty::<(i64, String)>(
        &mut conn,
        "SELECT COUNT(*) AS count, ip FROM logs \
         WHERE endpoint LIKE '%SELECT%' OR endpoint LIKE '%UNION%' OR endpoint LIKE '%DROP%' \
         GROUP BY ip",
        None,
    )
    .await;
    store::close_quietly(conn).await;

    let request_count: i64 = per_ip.iter().map(|(count, _)| count).sum();
    let risk_level = if request_count > SQL_INJECTION_HIGH_RISK_THRESHOLD {
        "High"
    } else {
        "Medium"
    };

    Ok(SqlInjectionReport {
        request_count,
        sample_malicious_request: SQL_INJECTION_SAMPLE.to_string(),
        unique_ip_count: per_ip.len() as i64,
        risk_level: risk_level.to_string(),
    })
}

/// Sum of requests from the busiest heavy-hitter ips
pub async fn detect_bot_scraping(store: &LogStore) -> Result<BotScrapingReport> {
    let mut conn = store.open().await?;
    let hitters = fetch_or_empty::<(String, i64)>(
        &mut conn,
        "SELECT ip, COUNT(*) AS count FROM logs \
         GROUP BY ip HAVING count > ? ORDER BY count DESC, ip ASC LIMIT ?",
        Some((HEAVY_HITTER_THRESHOLD, BOT_SCRAPING_TOP_IPS)),
    )
    .await;
    store::close_quietly(conn).await;

    Ok(BotScrapingReport {
        request_count: hitters.iter().map(|(_, count)| count).sum(),
        suspected_user_agents: SUSPECTED_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
        recommendation: BOT_RECOMMENDATION.to_string(),
    })
}

/// The ip with the most 401/403 responses, if it passes the burst threshold
pub async fn detect_failed_login_burst(store: &LogStore) -> Result<FailedLoginBurstReport> {
    let mut conn = store.open().await?;
    let burst = fetch_or_empty::<(String, i64, String, String)>(
        &mut conn,
        "SELECT ip, COUNT(*) AS count, MIN(timestamp) AS start_time, MAX(timestamp) AS end_time \
         FROM logs WHERE status IN (401, 403) \
         GROUP BY ip HAVING count > ? ORDER BY count DESC, ip ASC LIMIT ?",
        Some((FAILED_LOGIN_BURST_THRESHOLD, 1)),
    )
    .await
    .into_iter()
    .next();
    store::close_quietly(conn).await;

    Ok(match burst {
        Some((ip, count, start_time, end_time)) => FailedLoginBurstReport {
            attempt_count: count,
            time_window: format!("{} to {}", start_time, end_time),
            alert_message: format!(
                "Failed login burst detected from IP {} with {} attempts between {} and {}",
                ip, count, start_time, end_time
            ),
            source_ip: Some(ip),
        },
        None => FailedLoginBurstReport {
            attempt_count: 0,
            source_ip: None,
            time_window: "N/A".to_string(),
            alert_message: "No significant failed login bursts detected".to_string(),
        },
    })
}

/// Run a detector query, binding `(threshold, limit)` when given
async fn fetch_or_empty<T>(
    conn: &mut SqliteConnection,
    sql: &str,
    bounds: Option<(i64, i64)>,
) -> Vec<T>
where
    T: for<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> + Send + Unpin,
{
    let mut query = sqlx::query_as::<Sqlite, T>(sql);
    if let Some((threshold, limit)) = bounds {
        query = query.bind(threshold).bind(limit);
    }

    query.fetch_all(&mut *conn).await.unwrap_or_else(|e| {
        warn!(error = %e, "detector query failed");
        Vec::new()
    })
}
