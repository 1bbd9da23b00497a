//! Logging setup with optional daily file rotation
//!
//! - stderr and/or file output
//! - `EnvFilter` directives from `RUST_LOG`
//! - optional JSON formatting for log shippers
//! - payload sanitization so passwords never reach the logs

use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::error::{AgriError, Result};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level when `RUST_LOG` has no directive for a target
    pub level: Level,

    /// Log to file (rotated daily)
    pub file_path: Option<PathBuf>,

    /// Log to stderr
    pub stderr: bool,

    /// Emit JSON lines instead of the compact human format
    pub json: bool,

    /// Include thread IDs
    pub thread_ids: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file_path: None,
            stderr: true,
            json: false,
            thread_ids: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(rust_log) = std::env::var("RUST_LOG") {
            config.level = parse_level(&rust_log).unwrap_or(Level::INFO);
        }

        if let Ok(log_file) = std::env::var("AGRICOOL_LOG_FILE") {
            config.file_path = Some(PathBuf::from(log_file));
        }

        if let Ok(log_stderr) = std::env::var("AGRICOOL_LOG_STDERR") {
            config.stderr = log_stderr.to_lowercase() != "false";
        }

        if let Ok(json) = std::env::var("AGRICOOL_LOG_JSON") {
            config.json = json.to_lowercase() == "true";
        }

        config
    }

    /// Environment first, then the `[logging]` section of the config file
    pub fn from_settings(settings: &LoggingConfig) -> Self {
        let mut config = Self::from_env();
        if let Some(level) = parse_level(&settings.level) {
            config.level = level;
        }
        if config.file_path.is_none() {
            config.file_path = settings.file.as_ref().map(PathBuf::from);
        }
        config.json |= settings.json_format;
        config
    }

    /// Force debug level (the `--debug` flag)
    pub fn with_debug(mut self, debug: bool) -> Self {
        if debug {
            self.level = Level::DEBUG;
        }
        self
    }
}

/// Pick the most verbose level mentioned in a `RUST_LOG` string
fn parse_level(directives: &str) -> Option<Level> {
    let lower = directives.to_lowercase();
    [
        ("trace", Level::TRACE),
        ("debug", Level::DEBUG),
        ("info", Level::INFO),
        ("warn", Level::WARN),
        ("error", Level::ERROR),
    ]
    .into_iter()
    .find(|(name, _)| lower.contains(name))
    .map(|(_, level)| level)
}

/// Initialize the global subscriber with the given configuration
pub fn init_logging(config: LogConfig) -> Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(config.level.into())
        .from_env_lossy();

    let stderr_layer = config.stderr.then(|| {
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .with_thread_ids(config.thread_ids);
        if config.json {
            layer.json().boxed()
        } else {
            layer.compact().boxed()
        }
    });

    let file_layer = match &config.file_path {
        Some(file_path) => {
            if let Some(parent) = file_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let file_appender = tracing_appender::rolling::daily(
                file_path
                    .parent()
                    .unwrap_or_else(|| std::path::Path::new(".")),
                file_path
                    .file_name()
                    .unwrap_or_else(|| std::ffi::OsStr::new("agricool.log")),
            );

            let layer = fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_thread_ids(config.thread_ids);
            Some(if config.json {
                layer.json().boxed()
            } else {
                layer.boxed()
            })
        }
        None => None,
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AgriError::config(format!("Failed to install log subscriber: {e}")))
}

/// Replace sensitive fields in a JSON payload before it is logged
pub fn sanitize_payload(payload: &serde_json::Value) -> serde_json::Value {
    match payload {
        serde_json::Value::Object(map) => {
            let mut sanitized = serde_json::Map::new();
            for (key, value) in map {
                if is_sensitive_field(key) {
                    sanitized.insert(key.clone(), serde_json::Value::String("***".to_string()));
                } else {
                    sanitized.insert(key.clone(), sanitize_payload(value));
                }
            }
            serde_json::Value::Object(sanitized)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(sanitize_payload).collect())
        }
        other => other.clone(),
    }
}

fn is_sensitive_field(key: &str) -> bool {
    let key = key.to_lowercase();
    key.contains("password") || key.contains("secret") || key.contains("token")
}
