//! Configuration loading and typed config structures for Geobin.
//!
//! The configuration lives in `geobin-config.yaml` in the working
//! directory (or wherever `GEOBIN_CONFIG` points). Every section is
//! optional; a missing file means all defaults.
//!
//! Environment variables override YAML values:
//! - `REDIS_HOST` overrides `storage.redis_host`
//! - `REDIS_PASS` overrides `storage.redis_pass`
//! - `GEOBIN_PORT` overrides `server.port`

use std::path::{Path, PathBuf};

use geobin_detect::DetectOptions;
use serde::Deserialize;

/// Default config file name, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "geobin-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but cannot be used.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level Geobin configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GeobinConfig {
    /// Listen address.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend and Redis connection.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Bin naming and lifetime.
    #[serde(default)]
    pub bins: BinsConfig,

    /// Request limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Geo-detection hardening.
    #[serde(default)]
    pub detect: DetectConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GeobinConfig {
    /// Load from `GEOBIN_CONFIG`, else [`DEFAULT_CONFIG_PATH`].
    ///
    /// A missing file is not an error: defaults are used, with environment
    /// overrides still applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("GEOBIN_CONFIG")
            .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
        if path.exists() {
            Self::from_file(&path)
        } else {
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string, without env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from `lookup` (an environment-like source).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("REDIS_HOST") {
            self.storage.redis_host = host;
        }
        if let Some(pass) = lookup("REDIS_PASS") {
            self.storage.redis_pass = Some(pass).filter(|p| !p.is_empty());
        }
        if let Some(port) = lookup("GEOBIN_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }
}

/// Listen address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Which [`geobin_db::BinStore`] backend to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Redis sorted sets and pub/sub.
    #[default]
    Redis,
    /// In-process storage; bins are lost on restart.
    Memory,
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: StorageBackend,

    /// Redis `host:port`.
    #[serde(default = "default_redis_host")]
    pub redis_host: String,

    /// Redis password, if the server requires one.
    #[serde(default)]
    pub redis_pass: Option<String>,

    /// Redis logical database.
    #[serde(default)]
    pub redis_db: u8,
}

impl StorageConfig {
    /// `redis://[:pass@]host/db` for [`geobin_db::RedisStore::connect`].
    pub fn redis_url(&self) -> String {
        match &self.redis_pass {
            Some(pass) => format!("redis://:{pass}@{}/{}", self.redis_host, self.redis_db),
            None => format!("redis://{}/{}", self.redis_host, self.redis_db),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            redis_host: default_redis_host(),
            redis_pass: None,
            redis_db: 0,
        }
    }
}

/// Bin naming and lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BinsConfig {
    /// Characters bin names are drawn from.
    #[serde(default = "default_name_alphabet")]
    pub name_alphabet: String,

    /// Length of generated bin names.
    #[serde(default = "default_name_length")]
    pub name_length: usize,

    /// Hours a bin lives after creation.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u32,
}

impl Default for BinsConfig {
    fn default() -> Self {
        Self {
            name_alphabet: default_name_alphabet(),
            name_length: default_name_length(),
            ttl_hours: default_ttl_hours(),
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LimitsConfig {
    /// Requests per second allowed on each rate-limited route. 0 disables.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Largest accepted request body, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Geo-detection hardening. Both limits are off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct DetectConfig {
    /// Cap on concurrently classifying traversal units.
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    /// Deepest path length that is still visited.
    #[serde(default)]
    pub max_depth: Option<usize>,
}

impl From<DetectConfig> for DetectOptions {
    fn from(config: DetectConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency,
            max_depth: config.max_depth,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG`
    /// is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8080
}

fn default_redis_host() -> String {
    String::from("localhost:6379")
}

fn default_name_alphabet() -> String {
    String::from("abcdefghijklmnopqrstuvwxyz0123456789")
}

const fn default_name_length() -> usize {
    10
}

const fn default_ttl_hours() -> u32 {
    48
}

const fn default_requests_per_second() -> u32 {
    1
}

const fn default_max_body_bytes() -> usize {
    1_048_576
}

fn default_log_level() -> String {
    String::from("info")
}
