//! DDL and fixed statements for the `logs` table

/// Flat fact table. `AUTOINCREMENT` never reuses ids.
pub const CREATE_LOGS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ip TEXT,
        timestamp TEXT,
        method TEXT,
        endpoint TEXT,
        status INTEGER,
        size INTEGER
    )
"#;

/// Secondary indexes backing the aggregate queries
pub const CREATE_INDEXES: [&str; 4] = [
    "CREATE INDEX IF NOT EXISTS idx_status ON logs(status)",
    "CREATE INDEX IF NOT EXISTS idx_timestamp ON logs(timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_endpoint ON logs(endpoint)",
    "CREATE INDEX IF NOT EXISTS idx_ip ON logs(ip)",
];

pub const INSERT_LOG: &str =
    "INSERT INTO logs (ip, timestamp, method, endpoint, status, size) VALUES (?, ?, ?, ?, ?, ?)";

/// Column list in record order, shared by every record-returning query
pub const RECORD_COLUMNS: &str = "id, ip, timestamp, method, endpoint, status, size";

pub const TABLE_INFO: &str = "PRAGMA table_info(logs)";

pub const INDEX_LIST: &str = "PRAGMA index_list(logs)";
