//! taskchat configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::api::ApiError;
use crate::plan::DEFAULT_PREVIEW_LIMIT;

const LOCAL_CONFIG: &str = ".taskchat.yml";

/// Main taskchat configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend API configuration
    pub api: ApiConfig,

    /// Chat presentation
    pub chat: ChatConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Fails fast when the access token variable is not set.
    pub fn validate(&self) -> Result<()> {
        debug!("validate: called");
        if std::env::var(&self.api.token_env).is_err() {
            return Err(eyre::eyre!(
                "API token not found. Set the {} environment variable.",
                self.api.token_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        debug!(?config_path, "load: called");
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::candidates() {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are ignored here; `load` reports them once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let paths = match config_path {
            Some(path) => vec![path.clone()],
            None => Self::candidates(),
        };
        paths
            .iter()
            .filter(|p| p.exists())
            .find_map(|p| Self::load_from_file(p).ok())
            .and_then(|config| config.log_level)
    }

    /// Project-local config, then the user config
    fn candidates() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("taskchat").join("taskchat.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API base URL, including the `/api` prefix
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable holding the access token
    #[serde(rename = "token-env")]
    pub token_env: String,

    /// Environment variable holding the refresh token (optional)
    #[serde(rename = "refresh-token-env")]
    pub refresh_token_env: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            token_env: "TASKCHAT_TOKEN".to_string(),
            refresh_token_env: "TASKCHAT_REFRESH_TOKEN".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl ApiConfig {
    /// Access token from the environment
    pub fn access_token(&self) -> Result<String, ApiError> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::MissingToken(self.token_env.clone()))
    }

    /// Refresh token from the environment, if one is set
    pub fn refresh_token(&self) -> Option<String> {
        std::env::var(&self.refresh_token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }
}

/// Chat presentation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Items shown per plan section before collapsing
    #[serde(rename = "preview-limit")]
    pub preview_limit: usize,

    /// Show the raw plan JSON under the summary by default
    #[serde(rename = "show-raw-plan")]
    pub show_raw_plan: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            show_raw_plan: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.api.base_url, "http://localhost:8000/api");
        assert_eq!(config.api.token_env, "TASKCHAT_TOKEN");
        assert_eq!(config.api.timeout_ms, 30_000);
        assert_eq!(config.chat.preview_limit, 6);
        assert!(!config.chat.show_raw_plan);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
api:
  base-url: https://tasks.example.com/api
  token-env: MY_TOKEN
  refresh-token-env: MY_REFRESH
  timeout-ms: 5000

chat:
  preview-limit: 3
  show-raw-plan: true

log-level: debug
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.api.base_url, "https://tasks.example.com/api");
        assert_eq!(config.api.token_env, "MY_TOKEN");
        assert_eq!(config.api.refresh_token_env, "MY_REFRESH");
        assert_eq!(config.api.timeout_ms, 5000);
        assert_eq!(config.chat.preview_limit, 3);
        assert!(config.chat.show_raw_plan);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
chat:
  preview-limit: 10
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        // Specified value
        assert_eq!(config.chat.preview_limit, 10);

        // Defaults for unspecified
        assert!(!config.chat.show_raw_plan);
        assert_eq!(config.api.base_url, "http://localhost:8000/api");
        assert_eq!(config.api.refresh_token_env, "TASKCHAT_REFRESH_TOKEN");
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "api:\n  base-url: http://127.0.0.1:9000/api\nlog-level: warn").unwrap();
        let path = file.path().to_path_buf();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.api.base_url, "http://127.0.0.1:9000/api");
        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("warn"));
    }

    #[test]
    fn test_load_explicit_path_errors() {
        let missing = PathBuf::from("/nonexistent/taskchat.yml");
        assert!(Config::load(Some(&missing)).is_err());
        assert!(Config::load_log_level(Some(&missing)).is_none());

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "api: [not, a, map]").unwrap();
        assert!(Config::load(Some(&file.path().to_path_buf())).is_err());
    }

    #[test]
    #[serial]
    fn test_tokens_from_environment() {
        let api = ApiConfig {
            token_env: "TASKCHAT_TEST_TOKEN".to_string(),
            refresh_token_env: "TASKCHAT_TEST_REFRESH".to_string(),
            ..Default::default()
        };

        unsafe {
            std::env::remove_var("TASKCHAT_TEST_TOKEN");
            std::env::remove_var("TASKCHAT_TEST_REFRESH");
        }
        assert!(matches!(api.access_token(), Err(ApiError::MissingToken(name)) if name == "TASKCHAT_TEST_TOKEN"));
        assert!(api.refresh_token().is_none());

        unsafe {
            std::env::set_var("TASKCHAT_TEST_TOKEN", "abc");
            std::env::set_var("TASKCHAT_TEST_REFRESH", "  ");
        }
        assert_eq!(api.access_token().unwrap(), "abc");
        assert!(api.refresh_token().is_none());

        unsafe {
            std::env::remove_var("TASKCHAT_TEST_TOKEN");
            std::env::remove_var("TASKCHAT_TEST_REFRESH");
        }
    }

    #[test]
    #[serial]
    fn test_validate_requires_token() {
        let config = Config {
            api: ApiConfig {
                token_env: "TASKCHAT_TEST_VALIDATE".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        unsafe { std::env::remove_var("TASKCHAT_TEST_VALIDATE") };
        assert!(config.validate().is_err());

        unsafe { std::env::set_var("TASKCHAT_TEST_VALIDATE", "token") };
        assert!(config.validate().is_ok());
        unsafe { std::env::remove_var("TASKCHAT_TEST_VALIDATE") };
    }
}
