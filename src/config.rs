use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides the LLM API key
pub const LLM_API_KEY_ENV: &str = "LLM_API_KEY";
/// Environment variable that overrides the database path
pub const DATABASE_PATH_ENV: &str = "DATABASE_PATH";

/// Application configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite storage
    pub database: DatabaseConfig,
    /// Log level, format and optional file
    pub logging: LoggingConfig,
    /// Text-completion service
    pub llm: LlmConfig,
    /// Workflow tuning
    pub analysis: AnalysisConfig,
}

/// SQLite database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// File path, optionally `sqlite:` prefixed
    pub path: String,
    /// Pool size
    pub max_connections: u32,
    /// Wait for a pooled connection before failing
    pub connection_timeout_secs: u64,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter level when `RUST_LOG` is unset
    pub level: String,
    /// `json` or `text`
    pub format: String,
    /// Daily-rotated JSON log file
    pub file_path: Option<String>,
}

/// Settings for the text-completion service shared by classifier and extractors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible API root, without the `/chat/completions` suffix
    pub base_url: String,
    /// Bearer token; empty sends no auth header
    pub api_key: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Budget for a single attempt
    pub timeout_secs: u64,
    /// Extra attempts after the first one fails or times out
    pub max_retries: u32,
    /// Base pause between attempts, multiplied by the attempt number
    pub retry_backoff_ms: u64,
    /// Sampling temperature, 0-2
    pub temperature: f32,
    /// Reply length cap passed to the service
    pub max_tokens: u32,
    /// Replies longer than this are truncated before JSON scanning
    pub max_reply_chars: usize,
}

/// Orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Messages fetched for window analysis
    pub window_size: usize,
    /// Pause between users in batch analysis
    pub batch_delay_ms: u64,
    /// Send `nutrition` labels from the pair workflow to the nutrition extractor
    pub route_nutrition: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/fitcoach.db".to_string(),
            max_connections: 8,
            connection_timeout_secs: 30,
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

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://open.bigmodel.cn/api/paas/v4".to_string(),
            api_key: String::new(),
            model: "glm-4-flash".to_string(),
            timeout_secs: 20,
            max_retries: 1,
            retry_backoff_ms: 500,
            temperature: 0.1,
            max_tokens: 1024,
            max_reply_chars: 32_000,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            batch_delay_ms: 1000,
            route_nutrition: true,
        }
    }
}

impl LlmConfig {
    /// Per-attempt time budget
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Pause before retry number `attempt` (1-based)
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, optionally layering an explicit file on top of the defaults
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            // Start with default values
            .add_source(Config::try_from(&Self::default()).context("Failed to serialize default configuration")?)
            // Add config files if they exist
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("fitcoach").required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            // Add environment variables with prefix, e.g. FITCOACH__LLM__MODEL
            .add_source(Environment::with_prefix("FITCOACH").separator("__").try_parsing(true))
            .build()
            .context("Failed to load configuration")?;

        let mut app_config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        if let Ok(key) = std::env::var(LLM_API_KEY_ENV) {
            app_config.llm.api_key = key;
        }
        if let Ok(path) = std::env::var(DATABASE_PATH_ENV) {
            app_config.database.path = path;
        }

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate database config
        if self.database.path.trim().is_empty() {
            return Err(anyhow::anyhow!("database path cannot be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("max_connections must be greater than 0"));
        }
        if self.database.connection_timeout_secs == 0 {
            return Err(anyhow::anyhow!("connection_timeout_secs must be greater than 0"));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        // Validate LLM config
        if self.llm.base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("llm base_url cannot be empty"));
        }
        if self.llm.model.trim().is_empty() {
            return Err(anyhow::anyhow!("llm model cannot be empty"));
        }
        if self.llm.timeout_secs == 0 {
            return Err(anyhow::anyhow!("llm timeout_secs must be greater than 0"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(anyhow::anyhow!(
                "llm temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            ));
        }
        if self.llm.max_tokens == 0 {
            return Err(anyhow::anyhow!("llm max_tokens must be greater than 0"));
        }
        if self.llm.max_reply_chars == 0 {
            return Err(anyhow::anyhow!("llm max_reply_chars must be greater than 0"));
        }

        // Validate analysis config
        if self.analysis.window_size == 0 {
            return Err(anyhow::anyhow!("window_size must be greater than 0"));
        }

        Ok(())
    }
}
