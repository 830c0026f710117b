//! Application configuration module
//!
//! Provides configuration types shared by the server binary and the client
//! half. Values come from three layers, later ones winning:
//!
//! 1. built-in defaults ([`AppConfig::default`]),
//! 2. an optional TOML file ([`AppConfig::from_file`]),
//! 3. environment variables ([`AppConfig::apply_env`]).

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEV_JWT_SECRET: &str = "boardsync-dev-secret-change-me";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address the server listens on
    pub bind_addr: String,
    /// Capacity of the publish queue
    pub queue_capacity: usize,
    /// Outbound frame buffer per connection
    pub session_buffer: usize,
    /// Server-side validity window of a revert token
    pub revert_ttl_secs: u64,
    /// How often expired revert tokens are swept
    pub revert_sweep_interval_secs: u64,
    /// HS256 secret used to decode bearer tokens
    pub jwt_secret: String,
    /// Server URL (client side)
    pub server_url: Option<String>,
    /// User-facing undo countdown (client side)
    pub undo_window_secs: u64,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            queue_capacity: 1024,
            session_buffer: 256,
            revert_ttl_secs: 30,
            revert_sweep_interval_secs: 60,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            server_url: None,
            undo_window_secs: 10,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        if self.queue_capacity == 0 {
            return Err(ConfigError::invalid("queue_capacity", "must be greater than zero"));
        }
        if self.session_buffer == 0 {
            return Err(ConfigError::invalid("session_buffer", "must be greater than zero"));
        }
        if self.revert_ttl_secs == 0 {
            return Err(ConfigError::invalid("revert_ttl_secs", "must be greater than zero"));
        }
        if self.revert_sweep_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "revert_sweep_interval_secs",
                "must be greater than zero",
            ));
        }
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingValue("jwt_secret"));
        }
        if let Some(url) = &self.server_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
        }
        Ok(())
    }

    /// Parsed listen address
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_addr
            .parse()
            .map_err(|e| ConfigError::invalid("bind_addr", format!("{}", e)))
    }

    pub fn revert_ttl(&self) -> Duration {
        Duration::from_secs(self.revert_ttl_secs)
    }

    pub fn revert_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.revert_sweep_interval_secs)
    }

    pub fn undo_window(&self) -> Duration {
        Duration::from_secs(self.undo_window_secs)
    }

    /// Whether the built-in development secret is still in use
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Load a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// `~/.config/boardsync/config.toml` (platform equivalent)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("boardsync").join("config.toml"))
    }

    /// Override fields from environment variables.
    ///
    /// `BOARDSYNC_BIND_ADDR` wins over `SERVER_PORT`, which only replaces the
    /// port of the current bind address.
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Ok(addr) = std::env::var("BOARDSYNC_BIND_ADDR") {
            self.bind_addr = addr;
        } else if let Ok(port) = std::env::var("SERVER_PORT") {
            let port: u16 = port
                .parse()
                .map_err(|_| ConfigError::invalid("SERVER_PORT", format!("'{}' is not a port", port)))?;
            let host = self
                .bind_addr
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            self.bind_addr = format!("{}:{}", host, port);
        }
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.jwt_secret = secret;
        }
        if let Some(capacity) = env_number("BOARDSYNC_QUEUE_CAPACITY")? {
            self.queue_capacity = capacity as usize;
        }
        if let Some(ttl) = env_number("BOARDSYNC_REVERT_TTL_SECS")? {
            self.revert_ttl_secs = ttl;
        }
        if let Ok(url) = std::env::var("BOARDSYNC_SERVER_URL") {
            self.server_url = Some(url);
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = level;
        }
        Ok(self)
    }
}

fn env_number(key: &'static str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::invalid(key, format!("'{}' is not a number", raw))),
        Err(_) => Ok(None),
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    bind_addr: Option<String>,
    queue_capacity: Option<usize>,
    session_buffer: Option<usize>,
    revert_ttl_secs: Option<u64>,
    jwt_secret: Option<String>,
    server_url: Option<String>,
    undo_window_secs: Option<u64>,
}

impl AppConfigBuilder {
    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = Some(addr.into());
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    pub fn session_buffer(mut self, buffer: usize) -> Self {
        self.session_buffer = Some(buffer);
        self
    }

    pub fn revert_ttl_secs(mut self, secs: u64) -> Self {
        self.revert_ttl_secs = Some(secs);
        self
    }

    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.jwt_secret = Some(secret.into());
        self
    }

    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    pub fn undo_window_secs(mut self, secs: u64) -> Self {
        self.undo_window_secs = Some(secs);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let defaults = AppConfig::default();
        let config = AppConfig {
            bind_addr: self.bind_addr.unwrap_or(defaults.bind_addr),
            queue_capacity: self.queue_capacity.unwrap_or(defaults.queue_capacity),
            session_buffer: self.session_buffer.unwrap_or(defaults.session_buffer),
            revert_ttl_secs: self.revert_ttl_secs.unwrap_or(defaults.revert_ttl_secs),
            jwt_secret: self.jwt_secret.unwrap_or(defaults.jwt_secret),
            server_url: self.server_url.or(defaults.server_url),
            undo_window_secs: self.undo_window_secs.unwrap_or(defaults.undo_window_secs),
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}
