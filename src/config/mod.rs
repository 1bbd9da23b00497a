//! Configuration management for the AgriCool server
//!
//! Precedence, lowest to highest: built-in defaults, optional TOML file,
//! `AGRICOOL_*` environment variables, command-line flags (applied by the
//! binary after loading).

use crate::error::{AgriError, Result};
use serde::{Deserialize, Serialize};
use std::{env, path::Path, time::Duration};
use url::Url;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP listener configuration
    pub http: HttpConfig,

    /// Relational store configuration
    pub database: DatabaseConfig,

    /// MQTT broker configuration
    pub mqtt: MqttConfig,

    /// Automatic misting thresholds
    pub automation: AutomationConfig,

    /// Notification retention
    pub notifications: NotificationConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: String,

    /// Listen port
    pub port: u16,

    /// SSE keep-alive interval
    #[serde(with = "humantime_serde")]
    pub sse_keepalive: Duration,

    /// Capacity of the real-time broadcast channel
    pub broadcast_capacity: usize,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite://data/agricool.db` or `sqlite::memory:`
    pub url: String,

    /// Maximum pooled connections (forced to 1 for in-memory databases)
    pub max_connections: u32,
}

/// MQTT broker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Connect to a broker at all
    pub enabled: bool,

    /// Primary broker URL (`mqtt://host:port`)
    pub primary_url: String,

    /// Broker used when the primary never connects
    pub fallback_url: Option<String>,

    /// Client identifier; the fallback connection appends `-fallback`
    pub client_id: String,

    /// Topic prefix for sensor, pump and mode topics
    pub topic_prefix: String,

    /// Time allowed for the primary broker to acknowledge the connection
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Delay between reconnection attempts
    #[serde(with = "humantime_serde")]
    pub reconnect_period: Duration,

    /// MQTT keep-alive
    #[serde(with = "humantime_serde")]
    pub keep_alive: Duration,
}

/// Automatic misting thresholds (heat index, °C)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Request the pump ON at or above this heat index
    pub on_threshold: f64,

    /// Request the pump OFF at or below this heat index
    pub off_threshold: f64,
}

/// Notification retention configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Notifications older than this many days are pruned
    pub retention_days: u32,

    /// How often the retention task runs
    #[serde(with = "humantime_serde")]
    pub prune_interval: Duration,

    /// Default page size for notification listings
    pub default_limit: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable structured JSON logging
    pub json_format: bool,

    /// Log to file (path)
    pub file: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            sse_keepalive: Duration::from_secs(15),
            broadcast_capacity: 256,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/agricool.db".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            primary_url: "mqtt://agricool-mqtt:1883".to_string(),
            fallback_url: Some("mqtt://192.168.1.3:1883".to_string()),
            client_id: "agricool-backend".to_string(),
            topic_prefix: "agricool".to_string(),
            connect_timeout: Duration::from_secs(10),
            reconnect_period: Duration::from_secs(5),
            keep_alive: Duration::from_secs(30),
        }
    }
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            on_threshold: 32.0,
            off_threshold: 29.0,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            retention_days: 30,
            prune_interval: Duration::from_secs(6 * 3600),
            default_limit: 50,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            file: None,
        }
    }
}

impl MqttConfig {
    /// Topic the field device publishes readings on
    pub fn sensor_topic(&self) -> String {
        format!("{}/sensors", self.topic_prefix)
    }

    /// Topic pump commands are published on
    pub fn pump_topic(&self) -> String {
        format!("{}/pump/set", self.topic_prefix)
    }

    /// Topic mode changes are published on
    pub fn mode_topic(&self) -> String {
        format!("{}/mode/set", self.topic_prefix)
    }
}

impl ServerConfig {
    /// Configuration for tests and offline runs: in-memory store, no broker
    pub fn offline() -> Self {
        let mut config = Self::default();
        config.database.url = "sqlite::memory:".to_string();
        config.mqtt.enabled = false;
        config
    }

    /// Load a TOML file; missing sections fall back to defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AgriError::config(format!("Cannot read config file {}: {e}", path.display()))
        })?;
        toml::from_str(&contents)
            .map_err(|e| AgriError::config(format!("Invalid config file {}: {e}", path.display())))
    }

    /// Load defaults (or the given file) and apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env_overrides()
    }

    /// Load configuration from environment variables on top of defaults
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `AGRICOOL_*` environment variables
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(host) = env::var("AGRICOOL_HOST") {
            self.http.host = host;
        }

        // Plain PORT is honoured for container platforms
        if let Some(port) = env::var("AGRICOOL_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.http.port = port
                .parse()
                .map_err(|e| AgriError::config(format!("Invalid AGRICOOL_PORT: {e}")))?;
        }

        if let Ok(url) = env::var("AGRICOOL_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(primary) = env::var("AGRICOOL_MQTT_PRIMARY") {
            self.mqtt.primary_url = primary;
        }

        if let Ok(fallback) = env::var("AGRICOOL_MQTT_FALLBACK") {
            self.mqtt.fallback_url = if fallback.trim().is_empty() {
                None
            } else {
                Some(fallback)
            };
        }

        if let Ok(prefix) = env::var("AGRICOOL_MQTT_PREFIX") {
            self.mqtt.topic_prefix = prefix;
        }

        if let Ok(enabled) = env::var("AGRICOOL_MQTT_ENABLED") {
            self.mqtt.enabled = enabled.to_lowercase() != "false";
        }

        if let Ok(on) = env::var("AGRICOOL_AUTO_ON") {
            self.automation.on_threshold = on
                .parse()
                .map_err(|e| AgriError::config(format!("Invalid AGRICOOL_AUTO_ON: {e}")))?;
        }

        if let Ok(off) = env::var("AGRICOOL_AUTO_OFF") {
            self.automation.off_threshold = off
                .parse()
                .map_err(|e| AgriError::config(format!("Invalid AGRICOOL_AUTO_OFF: {e}")))?;
        }

        if let Ok(days) = env::var("AGRICOOL_NOTIFICATION_RETENTION_DAYS") {
            self.notifications.retention_days = days.parse().map_err(|e| {
                AgriError::config(format!("Invalid AGRICOOL_NOTIFICATION_RETENTION_DAYS: {e}"))
            })?;
        }

        if let Ok(level) = env::var("RUST_LOG") {
            self.logging.level = level;
        }

        Ok(self)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.http.port == 0 {
            return Err(AgriError::config("HTTP port must be greater than zero"));
        }

        if self.database.url.trim().is_empty() {
            return Err(AgriError::config("Database URL cannot be empty"));
        }

        if self.mqtt.enabled {
            parse_broker_url(&self.mqtt.primary_url)?;
            if let Some(fallback) = &self.mqtt.fallback_url {
                parse_broker_url(fallback)?;
            }
            if self.mqtt.client_id.is_empty() {
                return Err(AgriError::config("MQTT client id cannot be empty"));
            }
        }

        if self.automation.off_threshold >= self.automation.on_threshold {
            return Err(AgriError::config(format!(
                "Auto off threshold ({}) must be below the on threshold ({})",
                self.automation.off_threshold, self.automation.on_threshold
            )));
        }

        Ok(())
    }
}

/// Split an `mqtt://host:port` URL into host and port (default 1883)
pub fn parse_broker_url(raw: &str) -> Result<(String, u16)> {
    let url = Url::parse(raw)
        .map_err(|e| AgriError::config(format!("Invalid broker URL '{raw}': {e}")))?;

    if url.scheme() != "mqtt" && url.scheme() != "tcp" {
        return Err(AgriError::config(format!(
            "Broker URL '{raw}' must use the mqtt:// scheme"
        )));
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| AgriError::config(format!("Broker URL '{raw}' has no host")))?;

    Ok((host.to_string(), url.port().unwrap_or(1883)))
}
