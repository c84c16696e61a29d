//! Tab-separated access-log parsing
//!
//! A file starts with a header row naming its columns. Six source columns are
//! recognized and mapped onto [`NewLogRecord`] fields:
//!
//! | source     | field       | default |
//! |------------|-------------|---------|
//! | `host`     | `ip`        | required |
//! | `time`     | `timestamp` | required |
//! | `method`   | `method`    | `GET` |
//! | `url`      | `endpoint`  | `/` |
//! | `response` | `status`    | `200` |
//! | `bytes`    | `size`      | `0` (also for `-`) |
//!
//! Every data row yields a [`RowOutcome`]; nothing here returns an error.

use crate::store::NewLogRecord;
use std::borrow::Cow;
use std::fmt;

pub const FIELD_DELIMITER: char = '\t';
pub const DEFAULT_METHOD: &str = "GET";
pub const DEFAULT_ENDPOINT: &str = "/";
pub const DEFAULT_STATUS: i64 = 200;
pub const DEFAULT_SIZE: i64 = 0;
/// Marker used by access logs when the response size is unknown
pub const UNKNOWN_SIZE: &str = "-";

/// Source columns the parser understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceField {
    Host,
    Time,
    Method,
    Url,
    Response,
    Bytes,
}

impl SourceField {
    pub const ALL: [SourceField; 6] = [
        SourceField::Host,
        SourceField::Time,
        SourceField::Method,
        SourceField::Url,
        SourceField::Response,
        SourceField::Bytes,
    ];

    pub fn column_name(self) -> &'static str {
        match self {
            SourceField::Host => "host",
            SourceField::Time => "time",
            SourceField::Method => "method",
            SourceField::Url => "url",
            SourceField::Response => "response",
            SourceField::Bytes => "bytes",
        }
    }

    fn from_column(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.column_name() == name)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Why a data row was not persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// `host` empty after trimming
    MissingIp,
    /// `time` empty after trimming
    MissingTimestamp,
    /// Row too short to carry a value for a required text column
    Truncated { expected: usize, found: usize },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MissingIp => write!(f, "missing ip"),
            RejectReason::MissingTimestamp => write!(f, "missing timestamp"),
            RejectReason::Truncated { expected, found } => {
                write!(f, "truncated row: {} of {} columns", found, expected)
            }
        }
    }
}

/// Result of normalizing a single data row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Accepted(NewLogRecord),
    Rejected(RejectReason),
}

/// Column layout taken from a file's header row
#[derive(Debug, Clone)]
pub struct HeaderLayout {
    columns: Vec<String>,
    positions: [Option<usize>; 6],
}

impl HeaderLayout {
    /// Parse a header line. Returns `None` when the line carries no column names.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_start_matches('\u{feff}');
        if line.trim().is_empty() {
            return None;
        }

        let columns: Vec<String> = line
            .split(FIELD_DELIMITER)
            .map(|name| name.trim().to_string())
            .collect();

        // Later duplicates win, matching dict-style header readers
        let mut positions = [None; 6];
        for (idx, name) in columns.iter().enumerate() {
            if let Some(field) = SourceField::from_column(name) {
                positions[field.index()] = Some(idx);
            }
        }

        Some(Self { columns, positions })
    }

    /// Column names as they appeared in the header
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Whether the header names the given source column
    pub fn has(&self, field: SourceField) -> bool {
        self.positions[field.index()].is_some()
    }

    /// Look up a field in a split row.
    ///
    /// Outer `None`: the header has no such column. Inner `None`: the header
    /// has it but the row is too short to reach it.
    fn cell<'a>(&self, cells: &[&'a str], field: SourceField) -> Option<Option<&'a str>> {
        self.positions[field.index()].map(|idx| cells.get(idx).copied())
    }

    /// Normalize one data row
    pub fn parse_row(&self, line: &str) -> RowOutcome {
        let cells: Vec<&str> = line.split(FIELD_DELIMITER).collect();

        let text = |field: SourceField, default: &str| -> Result<String, RejectReason> {
            match self.cell(&cells, field) {
                None => Ok(default.to_string()),
                Some(Some(value)) => Ok(value.trim().to_string()),
                Some(None) => Err(RejectReason::Truncated {
                    expected: self.columns.len(),
                    found: cells.len(),
                }),
            }
        };

        let ip = match text(SourceField::Host, "") {
            Ok(value) => value,
            Err(reason) => return RowOutcome::Rejected(reason),
        };
        let timestamp = match text(SourceField::Time, "") {
            Ok(value) => value,
            Err(reason) => return RowOutcome::Rejected(reason),
        };
        let method = match text(SourceField::Method, DEFAULT_METHOD) {
            Ok(value) => value,
            Err(reason) => return RowOutcome::Rejected(reason),
        };
        let endpoint = match text(SourceField::Url, DEFAULT_ENDPOINT) {
            Ok(value) => value,
            Err(reason) => return RowOutcome::Rejected(reason),
        };

        let status = coerce_status(self.cell(&cells, SourceField::Response).flatten());
        let size = coerce_size(self.cell(&cells, SourceField::Bytes).flatten());

        if ip.is_empty() {
            return RowOutcome::Rejected(RejectReason::MissingIp);
        }
        if timestamp.is_empty() {
            return RowOutcome::Rejected(RejectReason::MissingTimestamp);
        }

        RowOutcome::Accepted(NewLogRecord {
            ip,
            timestamp,
            method,
            endpoint,
            status,
            size,
        })
    }
}

/// Integer status code, `200` when absent or not a number
pub fn coerce_status(raw: Option<&str>) -> i64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_STATUS)
}

/// Response size in bytes, `0` when absent, not a number, or `-`
pub fn coerce_size(raw: Option<&str>) -> i64 {
    match raw.map(str::trim) {
        None | Some("") | Some(UNKNOWN_SIZE) => DEFAULT_SIZE,
        Some(value) => value.parse::<i64>().unwrap_or(DEFAULT_SIZE),
    }
}

/// Decode one raw line, dropping invalid UTF-8 and the line terminator
pub fn decode_line(bytes: &[u8]) -> Cow<'_, str> {
    let mut end = bytes.len();
    while end > 0 && matches!(bytes[end - 1], b'\n' | b'\r') {
        end -= 1;
    }

    let bytes = &bytes[..end];
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Cow::Borrowed(text);
    }

    // Keep every valid run, skip only the invalid sequences between them
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    Cow::Owned(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KAGGLE_HEADER: &str =
        "host\tlogname\ttime\tmethod\turl\tresponse\tbytes\treferer\tuseragent";

    fn layout() -> HeaderLayout {
        HeaderLayout::parse(KAGGLE_HEADER).unwrap()
    }

    fn accepted(outcome: RowOutcome) -> NewLogRecord {
        match outcome {
            RowOutcome::Accepted(record) => record,
            RowOutcome::Rejected(reason) => panic!("row rejected: {reason}"),
        }
    }

    #[test]
    fn test_header_detects_columns() {
        let header = layout();
        assert_eq!(header.columns().len(), 9);
        for field in SourceField::ALL {
            assert!(header.has(field), "{:?}", field);
        }
        assert!(HeaderLayout::parse("").is_none());
        assert!(HeaderLayout::parse("  \t ").is_none());
    }

    #[test]
    fn test_header_strips_bom() {
        let header = HeaderLayout::parse("\u{feff}host\ttime").unwrap();
        assert!(header.has(SourceField::Host));
        assert_eq!(header.columns()[0], "host");
    }

    #[test]
    fn test_full_row() {
        let record = accepted(layout().parse_row(
            "199.72.81.55\t-\t01/Jul/1995:00:00:01 -0400\tGET\t/history/apollo/\t200\t6245\t-\t-",
        ));
        assert_eq!(record.ip, "199.72.81.55");
        assert_eq!(record.timestamp, "01/Jul/1995:00:00:01 -0400");
        assert_eq!(record.method, "GET");
        assert_eq!(record.endpoint, "/history/apollo/");
        assert_eq!(record.status, 200);
        assert_eq!(record.size, 6245);
    }

    #[test]
    fn test_fields_are_trimmed() {
        let header = HeaderLayout::parse("host\ttime\tmethod\turl").unwrap();
        let record = accepted(header.parse_row("  1.2.3.4 \t t1 \t POST \t /a "));
        assert_eq!(record.ip, "1.2.3.4");
        assert_eq!(record.timestamp, "t1");
        assert_eq!(record.method, "POST");
        assert_eq!(record.endpoint, "/a");
    }

    #[test]
    fn test_missing_columns_take_defaults() {
        let header = HeaderLayout::parse("host\ttime").unwrap();
        let record = accepted(header.parse_row("1.2.3.4\t01/Aug/1995:00:00:01"));
        assert_eq!(record.method, "GET");
        assert_eq!(record.endpoint, "/");
        assert_eq!(record.status, 200);
        assert_eq!(record.size, 0);
    }

    #[test]
    fn test_empty_ip_or_timestamp_rejected() {
        let header = layout();
        assert_eq!(
            header.parse_row("\t-\t01/Aug/1995:00:00:02\tGET\t/\t200\t1\t-\t-"),
            RowOutcome::Rejected(RejectReason::MissingIp)
        );
        assert_eq!(
            header.parse_row("  \t-\t01/Aug/1995:00:00:02\tGET\t/\t200\t1\t-\t-"),
            RowOutcome::Rejected(RejectReason::MissingIp)
        );
        assert_eq!(
            header.parse_row("1.2.3.4\t-\t \tGET\t/\t200\t1\t-\t-"),
            RowOutcome::Rejected(RejectReason::MissingTimestamp)
        );

        let no_host = HeaderLayout::parse("time\turl").unwrap();
        assert_eq!(
            no_host.parse_row("01/Aug/1995:00:00:02\t/"),
            RowOutcome::Rejected(RejectReason::MissingIp)
        );
    }

    #[test]
    fn test_truncated_row_rejected() {
        let outcome = layout().parse_row("1.2.3.4\t-\t01/Aug/1995:00:00:01");
        assert_eq!(
            outcome,
            RowOutcome::Rejected(RejectReason::Truncated {
                expected: 9,
                found: 3
            })
        );
    }

    #[test]
    fn test_short_row_missing_only_numeric_cells() {
        let header = HeaderLayout::parse("host\ttime\tmethod\turl\tresponse\tbytes").unwrap();
        let record = accepted(header.parse_row("1.2.3.4\tt\tGET\t/x"));
        assert_eq!(record.status, 200);
        assert_eq!(record.size, 0);
    }

    #[test]
    fn test_extra_cells_ignored() {
        let header = HeaderLayout::parse("host\ttime").unwrap();
        let record = accepted(header.parse_row("1.2.3.4\tt\textra\tmore"));
        assert_eq!(record.ip, "1.2.3.4");
    }

    #[test]
    fn test_status_coercion() {
        assert_eq!(coerce_status(Some("404")), 404);
        assert_eq!(coerce_status(Some(" 503 ")), 503);
        assert_eq!(coerce_status(Some("abc")), 200);
        assert_eq!(coerce_status(Some("")), 200);
        assert_eq!(coerce_status(Some("20.0")), 200);
        assert_eq!(coerce_status(None), 200);
    }

    #[test]
    fn test_size_coercion() {
        assert_eq!(coerce_size(Some("1024")), 1024);
        assert_eq!(coerce_size(Some("-")), 0);
        assert_eq!(coerce_size(Some(" - ")), 0);
        assert_eq!(coerce_size(Some("")), 0);
        assert_eq!(coerce_size(Some("12kb")), 0);
        assert_eq!(coerce_size(None), 0);
    }

    #[test]
    fn test_decode_line_strips_terminators_and_invalid_bytes() {
        assert_eq!(decode_line(b"a\tb\r\n"), "a\tb");
        assert_eq!(decode_line(b"a\tb\n"), "a\tb");
        assert_eq!(decode_line(b"caf\xff\xfee\n"), "cafe");
        assert_eq!(decode_line(b""), "");
    }

    #[test]
    fn test_decode_line_keeps_valid_replacement_characters() {
        // U+FFFD encoded as valid UTF-8, followed by a stray invalid byte
        assert_eq!(decode_line(b"a\xef\xbf\xbdb\xffc\n"), "a\u{fffd}bc");
        assert_eq!(decode_line("x\u{fffd}y".as_bytes()), "x\u{fffd}y");
    }
}
