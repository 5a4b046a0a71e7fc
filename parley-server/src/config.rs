use crate::room::{RetryPolicy, RoomPolicy};
use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Relay configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub room: RoomConfig,
    pub relay: RelayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub service_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            service_name: "parley-relay".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub redis_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Redis,
            redis_url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    pub ttl_secs: u64,
    pub keepalive_secs: u64,
    pub worker_idle_secs: u64,
    pub store_retries: usize,
    pub retry_min_delay_ms: u64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 15 * 60,
            keepalive_secs: 15,
            worker_idle_secs: 60,
            store_retries: 3,
            retry_min_delay_ms: 50,
        }
    }
}

impl RoomConfig {
    pub fn policy(&self) -> RoomPolicy {
        let min_delay = Duration::from_millis(self.retry_min_delay_ms);
        RoomPolicy {
            ttl: Duration::from_secs(self.ttl_secs),
            retry: RetryPolicy {
                max_retries: self.store_retries,
                min_delay,
                max_delay: (min_delay * 20).max(min_delay),
            },
        }
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs.max(1))
    }

    pub fn worker_idle(&self) -> Duration {
        Duration::from_secs(self.worker_idle_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub provider_sid: Option<String>,
    pub provider_token: Option<String>,
    pub provider_base_url: String,
    pub provider_timeout_secs: u64,
    pub stun_url: String,
    /// Comma separated static TURN urls.
    pub turn_urls: Option<String>,
    pub turn_username: Option<String>,
    pub turn_credential: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            provider_sid: None,
            provider_token: None,
            provider_base_url: "https://api.twilio.com".to_string(),
            provider_timeout_secs: 5,
            stun_url: "stun:stun.l.google.com:19302".to_string(),
            turn_urls: None,
            turn_username: None,
            turn_credential: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file_path: None,
        }
    }
}

/// Environment names honored for compatibility with existing deployments.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("PORT", "server.port"),
    ("TWILIO_SID", "relay.provider_sid"),
    ("TWILIO_AUTH", "relay.provider_token"),
    ("TURN_URLS", "relay.turn_urls"),
    ("TURN_USERNAME", "relay.turn_username"),
    ("TURN_PASSWORD", "relay.turn_credential"),
];

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Legacy environment names (`PORT`, `REDIS_URL`, `TWILIO_SID`, ...)
    /// 2. `PARLEY_SECTION__KEY` environment variables
    /// 3. Config file (if provided; a missing file is an error)
    /// 4. Defaults
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        Self::load_with_env(config_file, std::env::vars().collect())
    }

    pub fn load_with_env(
        config_file: Option<&str>,
        vars: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("PARLEY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(Some(vars.clone())),
        );

        let legacy = |name: &str| vars.get(name).filter(|v| !v.trim().is_empty()).cloned();
        for (name, key) in LEGACY_ENV {
            builder = builder.set_override_option(*key, legacy(name))?;
        }
        let redis_url = legacy("REDIS_URL")
            .or_else(|| legacy("REDIS_ADDR").map(|addr| format!("redis://{addr}")));
        builder = builder.set_override_option("store.redis_url", redis_url)?;

        builder.build()?.try_deserialize()
    }

    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
