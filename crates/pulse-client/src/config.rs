//! Client configuration loading from file and environment variables.

use pulse_feed::FeedConfig;
use pulse_session::ProviderConfig;
use serde::Deserialize;
use thiserror::Error;

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Identity provider credentials. Absent credentials mean degraded mode.
    #[serde(default)]
    pub identity: ProviderConfig,

    /// Feed loader settings.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "pulse_session=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `PULSE_API_KEY`, `PULSE_AUTH_DOMAIN`, `PULSE_PROJECT_ID`,
///   `PULSE_STORAGE_BUCKET`, `PULSE_MESSAGING_SENDER_ID`, `PULSE_APP_ID`
///   override the matching `identity.*` field
/// - `PULSE_POLL_INTERVAL_SECS` overrides `identity.poll_interval_secs`
/// - `PULSE_FEED_ENDPOINT` overrides `feed.endpoint`
/// - `PULSE_FEED_LIMIT` overrides `feed.limit`
/// - `PULSE_FEED_TIMEOUT_MS` overrides `feed.timeout_ms`
/// - `PULSE_LOG_LEVEL` overrides `logging.level`
/// - `PULSE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());

    Ok(config)
}

/// Applies `PULSE_*` overrides using `lookup` to read variables.
///
/// Unparseable numeric values are ignored and the file value is kept.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let identity = &mut config.identity;
    for (name, field) in [
        ("PULSE_API_KEY", &mut identity.api_key),
        ("PULSE_AUTH_DOMAIN", &mut identity.auth_domain),
        ("PULSE_PROJECT_ID", &mut identity.project_id),
        ("PULSE_STORAGE_BUCKET", &mut identity.storage_bucket),
        ("PULSE_MESSAGING_SENDER_ID", &mut identity.messaging_sender_id),
        ("PULSE_APP_ID", &mut identity.app_id),
    ] {
        if let Some(value) = lookup(name) {
            *field = value;
        }
    }

    if let Some(secs) = lookup("PULSE_POLL_INTERVAL_SECS") {
        if let Ok(parsed) = secs.parse() {
            config.identity.poll_interval_secs = parsed;
        }
    }
    if let Some(endpoint) = lookup("PULSE_FEED_ENDPOINT") {
        config.feed.endpoint = Some(endpoint).filter(|e| !e.trim().is_empty());
    }
    if let Some(limit) = lookup("PULSE_FEED_LIMIT") {
        if let Ok(parsed) = limit.parse() {
            config.feed.limit = parsed;
        }
    }
    if let Some(timeout) = lookup("PULSE_FEED_TIMEOUT_MS") {
        if let Ok(parsed) = timeout.parse() {
            config.feed.timeout_ms = parsed;
        }
    }
    if let Some(level) = lookup("PULSE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("PULSE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
