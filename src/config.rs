use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{DiaryError, Result};

/// Application configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Local diary database
    pub database: DatabaseConfig,
    /// Log output
    pub logging: LoggingConfig,
    /// Chat-completion endpoint used for emotion reports
    pub analysis: AnalysisConfig,
}

/// Local diary database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path
    pub path: String,
    /// Pool size
    pub max_connections: u32,
    /// How long a connection waits on a locked database
    pub busy_timeout_ms: u64,
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Console format, "text" or "json"
    pub format: String,
    /// Optional rolling JSON log file
    pub file_path: Option<String>,
}

/// Chat-completion endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Scheme and host, without the `/v1/chat/completions` path
    pub api_base: String,
    /// Bearer token; falls back to `OPENAI_API_KEY`
    pub api_key: Option<String>,
    /// Model name sent with every request
    pub model: String,
    /// Sampling temperature
    pub temperature: f64,
    /// Request timeout
    pub timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/diary.db".to_string(),
            max_connections: 4,
            busy_timeout_ms: 5000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file_path: None,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com".to_string(),
            api_key: None,
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

impl AppConfig {
    /// Load configuration with precedence: defaults, `config/default`,
    /// `config/local`, the explicit file, then `ONEFRAME_*` variables.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("ONEFRAME")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: Self = config.try_deserialize()?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(invalid("database.path must not be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(invalid("database.max_connections must be greater than 0"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(invalid(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level, valid_levels
            )));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(invalid(format!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format, valid_formats
            )));
        }

        if !self.analysis.api_base.starts_with("http://") && !self.analysis.api_base.starts_with("https://") {
            return Err(invalid(format!("analysis.api_base must be an http(s) URL: {}", self.analysis.api_base)));
        }
        if self.analysis.model.trim().is_empty() {
            return Err(invalid("analysis.model must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.analysis.temperature) {
            return Err(invalid("analysis.temperature must be between 0 and 2"));
        }
        if self.analysis.timeout_secs == 0 {
            return Err(invalid("analysis.timeout_secs must be greater than 0"));
        }

        Ok(())
    }

    /// Get the API key from config or the `OPENAI_API_KEY` environment variable
    pub fn api_key(&self) -> Option<String> {
        self.analysis
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }
}

fn invalid(message: impl Into<String>) -> DiaryError {
    DiaryError::InvalidConfig(message.into())
}
