//! Client configuration file handling

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ReportClientError, Result};

/// Default analysis server
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
/// Comparison report endpoint
pub const DEFAULT_REPORT_PATH: &str = "/video-analysis/rag/generate-comparison-report";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Settings for [`ReportClient`](crate::ReportClient)
///
/// Every key is optional in the TOML file:
///
/// ```toml
/// base_url = "http://analysis.local:8000"
/// connect_timeout_secs = 5
/// bearer_token = "secret"
/// report_path = "/video-analysis/rag/generate-comparison-report"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Analysis server URL
    pub base_url: String,
    /// Connection setup timeout; the streamed body itself is never timed out
    pub connect_timeout_secs: u64,
    /// Sent as `Authorization: Bearer <token>` when set
    pub bearer_token: Option<String>,
    /// Path of the streaming report endpoint
    pub report_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            bearer_token: None,
            report_path: DEFAULT_REPORT_PATH.to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from the default config file, or defaults if absent
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReportClientError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            ReportClientError::config(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ReportClientError::config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ReportClientError::config("Could not determine config directory"))?
            .join("vidan");

        Ok(config_dir.join("stream.toml"))
    }

    /// Override the server URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
