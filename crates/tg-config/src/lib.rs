//! Tollgate Configuration
//!
//! Configuration is resolved once at process start:
//! 1. Built-in defaults
//! 2. Optional TOML file (path from `TG_CONFIG`)
//! 3. Environment overrides (`TG_*` plus the legacy deployment names)
//!
//! ## Environment Variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `TG_HTTP_BIND` | `http.bind` |
//! | `TG_RPC_BIND` | `rpc.bind` |
//! | `TG_TOKEN_BYTES` | `tokens.bytes` |
//! | `TOKEN_LENGTH` | `tokens.bytes` (hex characters, halved) |
//! | `TG_ACCESS_TTL` / `ACCESS_TOKEN_LIFE_TIME` | `tokens.access_ttl_secs` |
//! | `TG_REFRESH_TTL` / `REFRESH_TOKEN_LIFE_TIME` | `tokens.refresh_ttl_secs` |
//! | `TG_CONFIRM_TTL` / `CONFIRM_TOKEN_LIFE_TIME` | `tokens.confirm_ttl_secs` |
//! | `TG_CONFIRM_BASE_URL` / `CONFIRM_ADDRESS` | `confirm.base_url` |
//! | `TG_STORE_BACKEND` | `store.backend` |
//! | `TG_DATABASE_URL` / `DATABASE_URL` | `store.url` |
//! | `TG_NOTIFY_BACKEND` | `notify.backend` |
//! | `TG_AMQP_URL` / `MESSAGE_QUEUE_URL` | `notify.url` |
//! | `TG_HASH_WORKERS` | `hashing.workers` |

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthServerConfig {
    pub http: HttpConfig,
    pub rpc: RpcConfig,
    pub tokens: TokenConfig,
    pub confirm: ConfirmConfig,
    pub store: StoreConfig,
    pub notify: NotifyConfig,
    pub hashing: HashingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0:8080".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub bind: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0:5300".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Random bytes per token; the token string is twice as long (hex).
    pub bytes: usize,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    pub confirm_ttl_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            bytes: 32,
            access_ttl_secs: 15 * 60,
            refresh_ttl_secs: 30 * 24 * 3600,
            confirm_ttl_secs: 24 * 3600,
        }
    }
}

impl TokenConfig {
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs)
    }

    pub fn confirm_ttl(&self) -> Duration {
        Duration::from_secs(self.confirm_ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmConfig {
    /// Confirmation links are `{base_url}/{token}`.
    pub base_url: String,
}

impl Default for ConfirmConfig {
    fn default() -> Self {
        Self { base_url: "http://localhost:8080/confirm".to_string() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub url: String,
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Postgres,
            url: "postgres://localhost:5432/tollgate".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyBackend {
    #[default]
    Amqp,
    Log,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub backend: NotifyBackend,
    pub url: String,
    pub queue: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            backend: NotifyBackend::Amqp,
            url: "amqp://localhost:5672/%2f".to_string(),
            queue: "sms_messages".to_string(),
        }
    }
}

/// Argon2id cost and the size of the blocking pool that runs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    pub workers: usize,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
            workers: 4,
        }
    }
}

impl AuthServerConfig {
    /// Defaults, then `TG_CONFIG` file if set, then process environment.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var("TG_CONFIG") {
            Ok(path) if !path.is_empty() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        info!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from `lookup` (the process environment in production).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some((_, v)) = first_set(&lookup, &["TG_HTTP_BIND"]) {
            self.http.bind = v;
        }
        if let Some((_, v)) = first_set(&lookup, &["TG_RPC_BIND"]) {
            self.rpc.bind = v;
        }
        if let Some((key, v)) = first_set(&lookup, &["TG_TOKEN_BYTES"]) {
            self.tokens.bytes = parse_number(&key, &v)?;
        } else if let Some((key, v)) = first_set(&lookup, &["TOKEN_LENGTH"]) {
            let chars: usize = parse_number(&key, &v)?;
            self.tokens.bytes = (chars + 1) / 2;
        }
        if let Some((key, v)) = first_set(&lookup, &["TG_ACCESS_TTL", "ACCESS_TOKEN_LIFE_TIME"]) {
            self.tokens.access_ttl_secs = parse_duration(&key, &v)?.as_secs();
        }
        if let Some((key, v)) = first_set(&lookup, &["TG_REFRESH_TTL", "REFRESH_TOKEN_LIFE_TIME"]) {
            self.tokens.refresh_ttl_secs = parse_duration(&key, &v)?.as_secs();
        }
        if let Some((key, v)) = first_set(&lookup, &["TG_CONFIRM_TTL", "CONFIRM_TOKEN_LIFE_TIME"]) {
            self.tokens.confirm_ttl_secs = parse_duration(&key, &v)?.as_secs();
        }
        if let Some((_, v)) = first_set(&lookup, &["TG_CONFIRM_BASE_URL", "CONFIRM_ADDRESS"]) {
            self.confirm.base_url = v;
        }
        if let Some((key, v)) = first_set(&lookup, &["TG_STORE_BACKEND"]) {
            self.store.backend = match v.to_lowercase().as_str() {
                "postgres" => StoreBackend::Postgres,
                "memory" => StoreBackend::Memory,
                _ => return Err(ConfigError::InvalidValue { key, value: v }),
            };
        }
        if let Some((_, v)) = first_set(&lookup, &["TG_DATABASE_URL", "DATABASE_URL"]) {
            self.store.url = v;
        }
        if let Some((key, v)) = first_set(&lookup, &["TG_NOTIFY_BACKEND"]) {
            self.notify.backend = match v.to_lowercase().as_str() {
                "amqp" => NotifyBackend::Amqp,
                "log" => NotifyBackend::Log,
                _ => return Err(ConfigError::InvalidValue { key, value: v }),
            };
        }
        if let Some((_, v)) = first_set(&lookup, &["TG_AMQP_URL", "MESSAGE_QUEUE_URL"]) {
            self.notify.url = v;
        }
        if let Some((key, v)) = first_set(&lookup, &["TG_HASH_WORKERS"]) {
            self.hashing.workers = parse_number(&key, &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.tokens.bytes == 0 {
            return Err(ConfigError::Invalid("tokens.bytes must be greater than zero".into()));
        }
        if self.tokens.access_ttl_secs == 0
            || self.tokens.refresh_ttl_secs == 0
            || self.tokens.confirm_ttl_secs == 0
        {
            return Err(ConfigError::Invalid("token lifetimes must be greater than zero".into()));
        }
        if self.confirm.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("confirm.base_url must be set".into()));
        }
        if self.hashing.workers == 0 {
            return Err(ConfigError::Invalid("hashing.workers must be greater than zero".into()));
        }
        Ok(())
    }
}

/// First key in `keys` that `lookup` resolves, with its value.
fn first_set<F>(lookup: &F, keys: &[&str]) -> Option<(String, String)>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .find_map(|key| lookup(*key).map(|value| (key.to_string(), value)))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Parse a duration: plain seconds (`90`) or one or more `<digits><unit>`
/// parts (`15m`, `30d`, `1h30m`, `720h0m0s`, `500ms`). Units are `ms`, `s`,
/// `m`, `h` and `d`. Fractional amounts and signs are rejected.
pub fn parse_duration(key: &str, value: &str) -> Result<Duration> {
    let invalid = || ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }
    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed.parse().map(Duration::from_secs).map_err(|_| invalid());
    }

    let mut total = Duration::ZERO;
    let mut rest = trimmed;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (digits, tail) = rest.split_at(digits_end);
        let amount: u64 = digits.parse().map_err(|_| invalid())?;

        let unit_end = tail.find(|c: char| c.is_ascii_digit()).unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_end);
        let part = match unit {
            "ms" => Some(Duration::from_millis(amount)),
            "s" => Some(Duration::from_secs(amount)),
            "m" => amount.checked_mul(60).map(Duration::from_secs),
            "h" => amount.checked_mul(3600).map(Duration::from_secs),
            "d" => amount.checked_mul(86_400).map(Duration::from_secs),
            _ => None,
        }
        .ok_or_else(invalid)?;

        total = total.checked_add(part).ok_or_else(invalid)?;
        rest = next;
    }
    Ok(total)
}
