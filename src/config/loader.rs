use super::types::AppConfig;
use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};

/// Configuration loader with builder pattern
///
/// Sources are layered in order: built-in defaults, a TOML file, then
/// `LOGSIGHT__SECTION__KEY` environment variables.
pub struct ConfigLoader {
    config_file: Option<String>,
    load_env: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            config_file: None,
            load_env: false,
        }
    }

    /// Load configuration from file
    pub fn load_from_file(mut self, path: Option<&str>) -> Self {
        self.config_file = path.map(String::from);
        self
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Result<AppConfig> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&AppConfig::default()).context("Failed to serialize defaults")?,
        );

        if let Some(config_path) = &self.config_file {
            // An explicit path must exist
            builder = builder.add_source(File::with_name(config_path).required(true));
        } else {
            builder = builder
                .add_source(File::with_name("logsight").required(false))
                .add_source(File::with_name("config/logsight").required(false));
        }

        if self.load_env {
            builder = builder.add_source(
                Environment::with_prefix("LOGSIGHT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config: AppConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        validate(&config)?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(config: &AppConfig) -> Result<()> {
    if config.ingest.batch_size == 0 {
        bail!("ingest.batch_size must be greater than zero");
    }
    if config.ingest.extension.trim_start_matches('.').is_empty() {
        bail!("ingest.extension must not be empty");
    }
    if !matches!(
        config.logging.rotation.as_str(),
        "daily" | "hourly" | "never"
    ) {
        bail!(
            "logging.rotation must be daily, hourly or never (got {})",
            config.logging.rotation
        );
    }
    Ok(())
}
