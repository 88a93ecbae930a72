//! Client configuration: a TOML file with environment overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use store::models::pagination::DEFAULT_PAGE_SIZE;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Origin the `/api/...` paths are resolved against.
    pub base_url: String,
    pub page_size: u64,
    /// No timeout unless set; the HTTP client default applies.
    pub request_timeout_secs: Option<u64>,
    /// Sent as `X-CSRFToken` on POST/PUT/PATCH/DELETE.
    pub csrf_token: Option<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_secs: None,
            csrf_token: None,
        }
    }
}

impl AdminConfig {
    /// Read `path` (if it exists) and apply `ADMIN_*` environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = if path.exists() {
            info!(path = %path.display(), "loading admin config");
            Self::from_toml(&std::fs::read_to_string(path)?)?
        } else {
            Self::default()
        };
        config.with_env_overrides(|name| std::env::var(name).ok())
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply overrides looked up through `lookup`, so tests need not touch the process env.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup("ADMIN_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(value) = lookup("ADMIN_PAGE_SIZE") {
            self.page_size = value
                .parse()
                .ok()
                .filter(|size| *size > 0)
                .ok_or(ConfigError::InvalidEnv {
                    name: "ADMIN_PAGE_SIZE",
                    value,
                })?;
        }
        if let Some(token) = lookup("ADMIN_CSRF_TOKEN") {
            self.csrf_token = Some(token);
        }
        Ok(self)
    }
}
