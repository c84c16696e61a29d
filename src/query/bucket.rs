//! Time bucketing for the requests-over-time view
//!
//! Timestamps are stored as the log wrote them, so buckets come from the text
//! itself. An extractor supplies the SQL expression used for grouping and the
//! equivalent Rust function for a single value; both must agree.

/// Maps a raw timestamp string onto its bucket label
pub trait BucketKeyExtractor: Send + Sync {
    /// SQL expression over the `timestamp` column yielding the bucket label
    fn sql_expr(&self) -> String;

    /// Bucket label for one timestamp
    fn bucket_key(&self, timestamp: &str) -> String;
}

/// Buckets by the first `width` characters of the timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixBucket {
    width: usize,
}

impl PrefixBucket {
    /// Width of `DD/Mon/YYYY:HH`
    pub const HOURLY_WIDTH: usize = 14;

    pub fn new(width: usize) -> Self {
        Self { width: width.max(1) }
    }

    /// Hour granularity for common-log-format timestamps
    /// (`01/Aug/1995:00:00:17 -0400` → `01/Aug/1995:00`)
    pub fn hourly() -> Self {
        Self::new(Self::HOURLY_WIDTH)
    }

    pub fn width(&self) -> usize {
        self.width
    }
}

impl Default for PrefixBucket {
    fn default() -> Self {
        Self::hourly()
    }
}

impl BucketKeyExtractor for PrefixBucket {
    fn sql_expr(&self) -> String {
        format!("SUBSTR(timestamp, 1, {})", self.width)
    }

    fn bucket_key(&self, timestamp: &str) -> String {
        // SUBSTR counts characters, not bytes
        timestamp.chars().take(self.width).collect()
    }
}
