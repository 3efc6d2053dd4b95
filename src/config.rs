//! Centralized configuration management for ourclass

use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Result, Context};

use crate::models::DEFAULT_SCHOOL_SUFFIX;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_LOG_FILE: &str = "ourclass.log";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend API configuration
    pub api: ApiConfig,
    /// HTTP client configuration
    pub http: HttpConfig,
    /// Institutional suffix stripped from and re-appended to school names
    pub school_suffix: String,
    /// Log file written by both CLI and TUI modes
    pub log_file: PathBuf,
}

/// Backend endpoints and credentials
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL the `/schools/search` and `/classrooms` paths are joined onto
    pub base_url: String,
    /// Bearer token forwarded on every request (optional)
    pub token: Option<String>,
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            token: None,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            http: HttpConfig::default(),
            school_suffix: DEFAULT_SCHOOL_SUFFIX.to_string(),
            log_file: DEFAULT_LOG_FILE.into(),
        }
    }
}

fn default_user_agent() -> String {
    format!("ourclass/{}", env!("CARGO_PKG_VERSION"))
}

impl Config {
    /// Load configuration from environment variables and defaults
    pub fn from_env() -> Result<Self> {
        let api = ApiConfig {
            base_url: std::env::var("OURCLASS_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            token: std::env::var("OURCLASS_API_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
        };

        let http = HttpConfig {
            timeout_seconds: parse_env_var("OURCLASS_HTTP_TIMEOUT_SECONDS")?.unwrap_or(30),
            user_agent: std::env::var("OURCLASS_USER_AGENT")
                .unwrap_or_else(|_| default_user_agent()),
        };

        let school_suffix = std::env::var("OURCLASS_SCHOOL_SUFFIX")
            .unwrap_or_else(|_| DEFAULT_SCHOOL_SUFFIX.to_string());

        let log_file = std::env::var("OURCLASS_LOG_FILE")
            .unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string())
            .into();

        Ok(Config {
            api,
            http,
            school_suffix,
            log_file,
        })
    }

    /// Get HTTP timeout as Duration
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }

    /// Base URL without a trailing slash
    pub fn api_base_url(&self) -> &str {
        self.api.base_url.trim_end_matches('/')
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(self.api_base_url())
            .with_context(|| format!("Invalid API base URL: {}", self.api.base_url))?;

        if self.http.timeout_seconds == 0 {
            return Err(anyhow::anyhow!("HTTP timeout must be at least one second"));
        }

        if self.school_suffix.trim().is_empty() {
            return Err(anyhow::anyhow!("School suffix must not be empty"));
        }

        // Check if parent directory of the log file exists
        if let Some(parent) = self.log_file.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(anyhow::anyhow!(
                    "Log file parent directory does not exist: {}",
                    parent.display()
                ));
            }
        }

        Ok(())
    }
}

/// Helper function to parse environment variable as a specific type
fn parse_env_var<T>(var_name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display + Send + Sync + std::error::Error + 'static,
{
    match std::env::var(var_name) {
        Ok(val) => val.parse().map(Some).with_context(|| {
            format!("Failed to parse environment variable {} = '{}'", var_name, val)
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.api_base_url(), "http://localhost:8080/api");
        assert_eq!(config.school_suffix, "초등학교");
        assert_eq!(config.http.timeout_seconds, 30);
        assert!(config.http.user_agent.starts_with("ourclass/"));
        assert!(config.api.token.is_none());
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        // Should not fail for default values
        config.validate().unwrap();
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.http.timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.school_suffix = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_file_parent_must_exist() {
        let temp_dir = TempDir::new().unwrap();

        let mut config = Config::default();
        config.log_file = temp_dir.path().join("ourclass.log");
        config.validate().unwrap();

        config.log_file = temp_dir.path().join("missing").join("ourclass.log");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let mut config = Config::default();
        config.api.base_url = "https://example.com/api/".to_string();
        assert_eq!(config.api_base_url(), "https://example.com/api");
    }
}
