//! Application configuration.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sigfeed_client::ApiClientConfig;
use sigfeed_core::Language;
use sigfeed_dashboard::DashboardConfig;
use sigfeed_sync::SyncConfig;
use sigfeed_ws::ConnectionConfig;
use std::path::Path;
use std::time::Duration;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SIGFEED_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub language: LanguageConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// REST API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Env var holding the bearer token issued by the auth provider.
    #[serde(default = "default_auth_token_env")]
    pub auth_token_env: String,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_auth_token_env() -> String {
    "SIGFEED_API_TOKEN".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            auth_token_env: default_auth_token_env(),
        }
    }
}

impl ApiConfig {
    /// Bearer token from the environment, if set and non-empty.
    pub fn auth_token(&self) -> Option<String> {
        std::env::var(&self.auth_token_env)
            .ok()
            .filter(|t| !t.is_empty())
    }

    pub fn client_config(&self) -> ApiClientConfig {
        ApiClientConfig {
            base_url: self.base_url.clone(),
            request_timeout_ms: self.request_timeout_ms,
            auth_token: self.auth_token(),
        }
    }
}

/// Push channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default = "default_push_enabled")]
    pub enabled: bool,
    #[serde(default = "default_push_url")]
    pub url: String,
    /// Maximum reconnection attempts (0 = infinite).
    #[serde(default)]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
}

fn default_push_enabled() -> bool {
    true
}

fn default_push_url() -> String {
    "ws://localhost:8000/ws".to_string()
}

fn default_reconnect_base_delay_ms() -> u64 {
    1000
}

fn default_reconnect_max_delay_ms() -> u64 {
    60_000
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    10_000
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: default_push_enabled(),
            url: default_push_url(),
            max_reconnect_attempts: 0,
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
        }
    }
}

impl PushConfig {
    pub fn connection_config(&self, auth_token: Option<String>) -> ConnectionConfig {
        ConnectionConfig {
            url: self.url.clone(),
            auth_token,
            max_reconnect_attempts: self.max_reconnect_attempts,
            reconnect_base_delay_ms: self.reconnect_base_delay_ms,
            reconnect_max_delay_ms: self.reconnect_max_delay_ms,
            heartbeat_interval_ms: self.heartbeat_interval_ms,
            heartbeat_timeout_ms: self.heartbeat_timeout_ms,
        }
    }
}

/// Collaborator call timeouts for the caches (0 = wait forever).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_timeout_ms")]
    pub enrichment_timeout_ms: u64,
    #[serde(default = "default_cache_timeout_ms")]
    pub translation_timeout_ms: u64,
}

fn default_cache_timeout_ms() -> u64 {
    15_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enrichment_timeout_ms: default_cache_timeout_ms(),
            translation_timeout_ms: default_cache_timeout_ms(),
        }
    }
}

impl CacheConfig {
    pub fn enrichment_timeout(&self) -> Option<Duration> {
        millis_or_none(self.enrichment_timeout_ms)
    }

    pub fn translation_timeout(&self) -> Option<Duration> {
        millis_or_none(self.translation_timeout_ms)
    }
}

fn millis_or_none(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Initial display language.
    #[serde(default)]
    pub display: Language,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Config path: CLI arg > `SIGFEED_CONFIG` > `config/default.toml`.
    pub fn resolve_path(cli: Option<String>) -> String {
        cli.or_else(|| std::env::var(CONFIG_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load `path` if it exists. `Ok(None)` means the file is missing.
    pub fn load(path: &str) -> AppResult<Option<Self>> {
        if !Path::new(path).exists() {
            return Ok(None);
        }
        Self::from_file(path).map(Some)
    }

    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        if self.api.base_url.is_empty() {
            return Err(AppError::Config("api.base_url must be set".into()));
        }
        if self.push.enabled && self.push.url.is_empty() {
            return Err(AppError::Config(
                "push.url must be set when push is enabled".into(),
            ));
        }
        if self.dashboard.enabled && self.dashboard.port == 0 {
            return Err(AppError::Config("dashboard.port must be non-zero".into()));
        }
        Ok(())
    }
}
