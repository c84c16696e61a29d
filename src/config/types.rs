use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Log store location
    pub database: DatabaseConfig,

    /// Ingestion settings
    pub ingest: IngestConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the API listens on
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/logs.db"),
        }
    }
}

/// Ingestion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Directory scanned for log files
    pub data_dir: PathBuf,

    /// File extension filter, without the leading dot
    pub extension: String,

    /// Stop after this many accepted records (`None` = no limit).
    ///
    /// Files and `LOGSIGHT__INGEST__LIMIT` spell no limit as `"none"`.
    #[serde(with = "limit_setting")]
    pub limit: Option<u64>,

    /// Records buffered before each bulk insert
    pub batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            extension: "tsv".to_string(),
            limit: Some(1_000_000),
            batch_size: 10_000,
        }
    }
}

/// `limit` as either a count or the `"none"` keyword
mod limit_setting {
    use serde::{de, Deserialize, Deserializer, Serializer};

    const NO_LIMIT: &str = "none";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Count(u64),
        Text(String),
    }

    pub fn serialize<S>(limit: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match limit {
            Some(count) => serializer.serialize_u64(*count),
            None => serializer.serialize_str(NO_LIMIT),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Count(count) => Ok(Some(count)),
            Raw::Text(text) => {
                let text = text.trim();
                if text.eq_ignore_ascii_case(NO_LIMIT) || text.eq_ignore_ascii_case("unlimited")
                {
                    return Ok(None);
                }
                text.parse().map(Some).map_err(|_| {
                    de::Error::custom(format!(
                        "invalid ingest limit `{}`, expected a count or \"none\"",
                        text
                    ))
                })
            }
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive
    pub level: String,

    /// Directory for rolling log files
    pub dir: PathBuf,

    /// `daily`, `hourly` or `never`
    pub rotation: String,

    /// Write to stderr
    pub console: bool,

    /// Write to rolling files under `dir`
    pub file: bool,

    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: PathBuf::from("logs"),
            rotation: "daily".to_string(),
            console: true,
            file: false,
            json: false,
        }
    }
}
