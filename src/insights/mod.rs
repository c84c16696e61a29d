//! Canned security insights over the log store
//!
//! No inference happens here: a handful of fixed SQL scans (keyword
//! pattern matches, per-ip request counts, 401/403 counts) wrapped in static
//! narrative. Two independent presentations exist and are kept separate:
//!
//! - [`summary`]: the three-category list embedded in `/search` responses
//! - [`detectors`]: the per-detector reports served by `/security-insights`

pub mod detectors;
pub mod summary;

pub use detectors::{
    detect_bot_scraping, detect_failed_login_burst, detect_sql_injection, security_insights,
    BotScrapingReport, FailedLoginBurstReport, SecurityInsights, SqlInjectionReport,
};
pub use summary::security_summary;

use serde::Serialize;

/// An ip needs more than this many requests to count as a heavy hitter
pub const HEAVY_HITTER_THRESHOLD: i64 = 1000;

/// One category in the security summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsightEntry {
    pub category: String,
    pub count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    pub risk_level: String,
    pub insight: String,
}
