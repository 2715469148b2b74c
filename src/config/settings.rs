//! Configuration settings structure
//!
//! Defines the main settings structure and loading logic for the pod client.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Largest accepted `stream.gap_step_secs` (one century)
pub const MAX_GAP_STEP_SECS: i64 = 100 * 365 * 24 * 60 * 60;

/// Main configuration settings for the pod client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// HTTP transport configuration
    pub http: HttpSettings,
    /// CSRF token configuration
    pub token: TokenSettings,
    /// Sign-in/sign-out endpoints
    pub session: SessionSettings,
    /// Stream synchronization configuration
    pub stream: StreamSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// HTTP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// User agent sent with every request
    pub user_agent: String,
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Scheme prepended to a pod address given without one
    pub default_scheme: String,
}

/// CSRF token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    /// Page the token is scraped from
    pub source: String,
    /// Header carrying the token on write requests
    pub header: String,
}

/// Authentication endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub sign_in_path: String,
    pub sign_out_path: String,
    /// Page embedding the current user's attributes
    pub user_info_path: String,
}

/// Stream synchronization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// How far back (seconds) a retry probes past an unproductive watermark
    pub gap_step_secs: i64,
    /// Unproductive iterations tolerated by a full crawl before it stops
    pub retry_budget: u32,
    /// Send the `_` nonce with older-page requests
    pub cache_bust: bool,
    /// Point-read path for purge; `{id}` is replaced by the item identifier
    pub item_path: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,
    /// Enable verbose logging
    pub verbose: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: format!("diaspora-pod-client/{}", crate::utils::VERSION),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            default_scheme: "https".to_string(),
        }
    }
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            source: "stream".to_string(),
            header: "x-csrf-token".to_string(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            sign_in_path: "users/sign_in".to_string(),
            sign_out_path: "users/sign_out".to_string(),
            user_info_path: "bookmarklet".to_string(),
        }
    }
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            gap_step_secs: 3_000_000,
            retry_budget: 2,
            cache_bust: true,
            item_path: "posts/{id}.json".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            verbose: false,
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Settings {
    /// Create new settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from environment variables
    pub fn from_env() -> crate::Result<Self> {
        Self::default().merge_with_env()
    }

    /// Apply `POD_*` environment overrides on top of these settings
    pub fn merge_with_env(mut self) -> crate::Result<Self> {
        if let Ok(agent) = std::env::var("POD_USER_AGENT") {
            self.http.user_agent = agent;
        }

        if let Ok(timeout) = std::env::var("POD_TIMEOUT") {
            self.http.timeout_secs = timeout
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid timeout: {}", e)))?;
        }

        if let Ok(scheme) = std::env::var("POD_DEFAULT_SCHEME") {
            self.http.default_scheme = scheme;
        }

        if let Ok(source) = std::env::var("POD_TOKEN_SOURCE") {
            self.token.source = source;
        }

        if let Ok(budget) = std::env::var("POD_STREAM_RETRY_BUDGET") {
            self.stream.retry_budget = budget
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid retry budget: {}", e)))?;
        }

        if let Ok(level) = std::env::var("POD_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(self)
    }

    /// Reject settings the session layer cannot work with
    pub fn validate(&self) -> crate::Result<()> {
        if self.http.timeout_secs == 0 {
            return Err(crate::Error::config("http.timeout_secs must be positive"));
        }
        if !matches!(self.http.default_scheme.as_str(), "http" | "https") {
            return Err(crate::Error::config(format!(
                "Unsupported default scheme: {}",
                self.http.default_scheme
            )));
        }
        if self.token.source.trim().is_empty() {
            return Err(crate::Error::config("token.source must not be empty"));
        }
        if reqwest::header::HeaderName::from_bytes(self.token.header.as_bytes()).is_err() {
            return Err(crate::Error::config(format!(
                "Invalid token header name: {}",
                self.token.header
            )));
        }
        if self.stream.gap_step_secs <= 0 || self.stream.gap_step_secs > MAX_GAP_STEP_SECS {
            return Err(crate::Error::config(format!(
                "stream.gap_step_secs must be between 1 and {}",
                MAX_GAP_STEP_SECS
            )));
        }
        if !self.stream.item_path.contains("{id}") {
            return Err(crate::Error::config(
                "stream.item_path must contain an {id} placeholder",
            ));
        }
        Ok(())
    }
}
