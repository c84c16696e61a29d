//! Application configuration
//!
//! Defaults, then an optional TOML file, then `LOGSIGHT__*` environment
//! variables. The binary applies CLI flags last.

pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::{AppConfig, DatabaseConfig, IngestConfig, LoggingConfig, ServerConfig};

use std::path::Path;

impl AppConfig {
    /// Render a commented sample configuration file
    pub fn sample_toml() -> anyhow::Result<String> {
        let body = toml::to_string_pretty(&AppConfig::default())?;

        Ok(format!(
            r#"# logsight configuration
#
# Save as logsight.toml (or config/logsight.toml), or pass --config <path>.
# Every key can be overridden from the environment, e.g.
#   LOGSIGHT__DATABASE__PATH=/var/lib/logsight/logs.db
#   LOGSIGHT__INGEST__LIMIT=50000
#
# [server]   bind_addr   address the HTTP API listens on
# [database] path        SQLite file holding the logs table
# [ingest]   data_dir    directory scanned for log files
#            extension   file extension filter (no dot)
#            limit       stop after this many accepted records, or "none"
#            batch_size  records per bulk insert transaction
# [logging]  level       trace | debug | info | warn | error
#            rotation    daily | hourly | never

{}"#,
            body
        ))
    }

    /// Write the sample configuration to `path`
    pub fn write_sample(path: &Path) -> anyhow::Result<()> {
        std::fs::write(path, Self::sample_toml()?)?;
        tracing::info!(path = %path.display(), "sample configuration written");
        Ok(())
    }
}
