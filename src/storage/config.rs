//! Configuration Loading
//!
//! Builds the `AppConfig` from defaults, an optional JSON file and
//! environment overrides, in that order. Read once at startup.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::models::settings::AppConfig;
use crate::utils::error::{AppError, AppResult};

/// Environment variable naming the optional JSON config file
pub const CONFIG_PATH_ENV: &str = "WFM_CHAT_CONFIG";

/// Configuration service holding the resolved settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: Option<PathBuf>,
    config: AppConfig,
}

impl ConfigService {
    /// Load configuration from the process environment.
    ///
    /// `.env` files should be loaded before calling this.
    pub fn load() -> AppResult<Self> {
        let path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Load configuration with an explicit file path and variable lookup.
    pub fn load_with<F>(config_path: Option<PathBuf>, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match &config_path {
            Some(path) => Self::load_from_file(path)?,
            None => AppConfig::default(),
        };
        Self::apply_env(&mut config, lookup)?;
        config.validate().map_err(AppError::validation)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> AppResult<AppConfig> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Apply environment overrides on top of `config`.
    pub fn apply_env<F>(config: &mut AppConfig, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("ANTHROPIC_API_KEY") {
            config.anthropic_api_key = Some(v);
        }
        if let Some(v) = get("ANTHROPIC_BASE_URL") {
            config.anthropic_base_url = Some(v);
        }
        if let Some(v) = get("WFM_MODEL") {
            config.model = v;
        }
        if let Some(v) = get("MONGODB_CONNECTION_STRING") {
            config.mongodb_connection_string = v;
        }
        if let Some(v) = get("WFM_DATABASE") {
            config.database = v;
        }
        if let Some(v) = get("WFM_MCP_COMMAND") {
            config.mcp_command = v;
        }
        if let Some(v) = get("WFM_MCP_URL") {
            config.mcp_url = Some(v);
        }
        if let Some(v) = get("WFM_BIND_ADDRESS") {
            config.bind_address = v;
        }
        if let Some(v) = get("WFM_TOOL_TIMEOUT_SECS") {
            config.tool_timeout_secs = parse_var("WFM_TOOL_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("WFM_MAX_EXCHANGES") {
            config.max_exchanges = parse_var("WFM_MAX_EXCHANGES", &v)?;
        }
        if let Some(v) = get("WFM_MODEL_MAX_RETRIES") {
            config.model_max_retries = parse_var("WFM_MODEL_MAX_RETRIES", &v)?;
        }
        if let Some(v) = get("WFM_HISTORY_MAX_MESSAGES") {
            config.history_max_messages = parse_var("WFM_HISTORY_MAX_MESSAGES", &v)?;
        }
        if let Some(v) = get("WFM_HISTORY_MAX_CHARS") {
            config.history_max_chars = parse_var("WFM_HISTORY_MAX_CHARS", &v)?;
        }
        if let Some(v) = get("WFM_MAX_SESSIONS") {
            config.max_sessions = parse_var("WFM_MAX_SESSIONS", &v)?;
        }

        Ok(())
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// Path of the config file that was read, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Consume the service, returning the configuration
    pub fn into_config(self) -> AppConfig {
        self.config
    }
}

fn parse_var<T>(key: &str, value: &str) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| AppError::config(format!("{} must be a number ('{}'): {}", key, value, e)))
}
