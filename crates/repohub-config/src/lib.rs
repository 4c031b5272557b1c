//! # RepoHub Config - Configuration Management
//!
//! Handles configuration loading from an optional file plus environment
//! variables (`REPOHUB__SECTION__KEY` overrides).

use std::path::Path;

use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub service: ServiceTimeouts,
    #[serde(default)]
    pub breaker: BreakerSettings,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "memory" or "postgres"
    #[serde(default = "default_backend")]
    pub backend: String,

    pub connection_string: Option<String>,
}

fn default_backend() -> String {
    "memory".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// "memory" or "redis"
    #[serde(default = "default_cache_driver")]
    pub driver: String,

    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    #[serde(default = "default_cache_ttl_seconds")]
    pub ttl_seconds: u64,
}

fn default_cache_driver() -> String {
    "memory".to_string()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_cache_ttl_seconds() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// "log" or "kafka"
    #[serde(default = "default_events_driver")]
    pub driver: String,

    #[serde(default = "default_brokers")]
    pub brokers: String,

    /// Spawn the background consumer that mirrors domain events into
    /// notifications
    #[serde(default)]
    pub consumer_enabled: bool,

    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,
}

fn default_events_driver() -> String {
    "log".to_string()
}

fn default_brokers() -> String {
    "127.0.0.1:9092".to_string()
}

fn default_consumer_group() -> String {
    "user-group".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotifyConfig {
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceTimeouts {
    #[serde(default = "default_timeout_ms")]
    pub storage_timeout_ms: u64,

    #[serde(default = "default_timeout_ms")]
    pub publish_timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerSettings {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    #[serde(default = "default_reset_interval_secs")]
    pub reset_interval_secs: u64,
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_cooldown_secs() -> u64 {
    10
}

fn default_reset_interval_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// "pretty", "compact", or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { backend: default_backend(), connection_string: None }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            driver: default_cache_driver(),
            redis_url: default_redis_url(),
            ttl_seconds: default_cache_ttl_seconds(),
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            driver: default_events_driver(),
            brokers: default_brokers(),
            consumer_enabled: false,
            consumer_group: default_consumer_group(),
        }
    }
}

impl Default for ServiceTimeouts {
    fn default() -> Self {
        Self {
            storage_timeout_ms: default_timeout_ms(),
            publish_timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_secs: default_cooldown_secs(),
            reset_interval_secs: default_reset_interval_secs(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: default_log_level(), log_format: default_log_format() }
    }
}

/// Configuration that loaded but cannot be run
#[derive(Debug, Error)]
pub enum InvalidConfig {
    #[error("unknown store backend '{0}' (expected 'memory' or 'postgres')")]
    UnknownBackend(String),

    #[error("unknown cache driver '{0}' (expected 'memory' or 'redis')")]
    UnknownCacheDriver(String),

    #[error("unknown events driver '{0}' (expected 'log' or 'kafka')")]
    UnknownEventsDriver(String),

    #[error("store backend 'postgres' requires store.connection_string")]
    MissingConnectionString,

    #[error("telegram notification requires both bot token and chat id")]
    PartialTelegramConfig,
}

impl Config {
    /// Cross-field checks serde cannot express
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        match self.store.backend.as_str() {
            "memory" | "postgres" | "postgresql" | "pg" => {}
            other => return Err(InvalidConfig::UnknownBackend(other.to_string())),
        }
        if self.store.backend != "memory" && self.store.connection_string.is_none() {
            return Err(InvalidConfig::MissingConnectionString);
        }
        match self.cache.driver.as_str() {
            "memory" | "redis" => {}
            other => return Err(InvalidConfig::UnknownCacheDriver(other.to_string())),
        }
        match self.events.driver.as_str() {
            "log" | "kafka" => {}
            other => return Err(InvalidConfig::UnknownEventsDriver(other.to_string())),
        }
        if self.notify.telegram_bot_token.is_some() != self.notify.telegram_chat_id.is_some() {
            return Err(InvalidConfig::PartialTelegramConfig);
        }
        Ok(())
    }
}

/// Load configuration from file and environment
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let builder = ConfigBuilder::builder()
        .add_source(File::from(path.as_ref()).required(false))
        .add_source(Environment::with_prefix("REPOHUB").separator("__"))
        .build()?;

    builder.try_deserialize()
}

/// Load configuration with defaults
pub fn load_or_default<P: AsRef<Path>>(path: P) -> Config {
    load(path).unwrap_or_default()
}
