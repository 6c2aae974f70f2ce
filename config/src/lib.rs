//! Process settings for the router, read from `ROUTER_*` environment
//! variables with sensible defaults. The binary loads `.env` (if any) before
//! calling [`Settings::from_env`], so existing env always wins.

use std::env;
use std::str::FromStr;

use thiserror::Error;

/// Environment variable prefix for every setting.
pub const ENV_PREFIX: &str = "ROUTER_";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// All process settings. Defaults match a single-instance deployment with a
/// ConfigMap-mounted catalog at `/config/agents.yaml`.
#[derive(Clone, Debug)]
pub struct Settings {
    // Server
    pub host: String,
    pub port: u16,
    pub log_level: String,

    // Agent catalog
    pub config_path: String,

    // Embeddings
    pub embedding_model: String,

    // Retry
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,

    // Sticky sessions
    pub session_enabled: bool,
    pub session_timeout_min: u64,
    pub session_drift_threshold: f32,

    // Observability
    pub audit_enabled: bool,
    pub audit_log_level: String,
    pub stream_buffer_enabled: bool,
    pub stream_buffer_max_size: usize,

    // Hot reload
    pub hot_reload_enabled: bool,
    pub hot_reload_debounce_seconds: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            host: "0.0.0.0".to_string(),
            port: 9010,
            log_level: "info".to_string(),
            config_path: "/config/agents.yaml".to_string(),
            embedding_model: "all-MiniLM-L6-v2".to_string(),
            retry_attempts: 2,
            retry_backoff_ms: 500,
            session_enabled: true,
            session_timeout_min: 30,
            session_drift_threshold: 0.5,
            audit_enabled: true,
            audit_log_level: "info".to_string(),
            stream_buffer_enabled: true,
            stream_buffer_max_size: 1_000_000,
            hot_reload_enabled: true,
            hot_reload_debounce_seconds: 1.0,
        }
    }
}

impl Settings {
    /// Reads settings from the process environment. Unset variables fall back
    /// to defaults; set-but-malformed values are errors rather than silently
    /// ignored.
    pub fn from_env() -> Result<Settings, SettingsError> {
        let defaults = Settings::default();
        Ok(Settings {
            host: read_string("HOST", defaults.host),
            port: read_parsed("PORT", defaults.port)?,
            log_level: read_level("LOG_LEVEL", defaults.log_level)?,
            config_path: read_string("CONFIG_PATH", defaults.config_path),
            embedding_model: read_string("EMBEDDING_MODEL", defaults.embedding_model),
            retry_attempts: read_parsed("RETRY_ATTEMPTS", defaults.retry_attempts)?,
            retry_backoff_ms: read_parsed("RETRY_BACKOFF_MS", defaults.retry_backoff_ms)?,
            session_enabled: read_bool("SESSION_ENABLED", defaults.session_enabled)?,
            session_timeout_min: read_parsed("SESSION_TIMEOUT_MIN", defaults.session_timeout_min)?,
            session_drift_threshold: read_unit_interval(
                "SESSION_DRIFT_THRESHOLD",
                defaults.session_drift_threshold,
            )?,
            audit_enabled: read_bool("AUDIT_ENABLED", defaults.audit_enabled)?,
            audit_log_level: read_level("AUDIT_LOG_LEVEL", defaults.audit_log_level)?,
            stream_buffer_enabled: read_bool(
                "STREAM_BUFFER_ENABLED",
                defaults.stream_buffer_enabled,
            )?,
            stream_buffer_max_size: read_parsed(
                "STREAM_BUFFER_MAX_SIZE",
                defaults.stream_buffer_max_size,
            )?,
            hot_reload_enabled: read_bool("HOT_RELOAD_ENABLED", defaults.hot_reload_enabled)?,
            hot_reload_debounce_seconds: read_parsed(
                "HOT_RELOAD_DEBOUNCE_SECONDS",
                defaults.hot_reload_debounce_seconds,
            )?,
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}{key}")).ok()
}

fn read_string(key: &str, default: String) -> String {
    var(key).unwrap_or(default)
}

fn read_parsed<T: FromStr>(key: &str, default: T) -> Result<T, SettingsError> {
    match var(key) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|_| SettingsError::Invalid {
            key: format!("{ENV_PREFIX}{key}"),
            value: raw,
            reason: format!("expected {}", std::any::type_name::<T>()),
        }),
    }
}

fn read_bool(key: &str, default: bool) -> Result<bool, SettingsError> {
    match var(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(SettingsError::Invalid {
                key: format!("{ENV_PREFIX}{key}"),
                value: raw,
                reason: "expected a boolean".to_string(),
            }),
        },
    }
}

fn read_unit_interval(key: &str, default: f32) -> Result<f32, SettingsError> {
    let value: f32 = read_parsed(key, default)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(SettingsError::Invalid {
            key: format!("{ENV_PREFIX}{key}"),
            value: value.to_string(),
            reason: "expected a value in [0, 1]".to_string(),
        });
    }
    Ok(value)
}

fn read_level(key: &str, default: String) -> Result<String, SettingsError> {
    match var(key) {
        None => Ok(default),
        Some(raw) => {
            let level = raw.trim().to_ascii_lowercase();
            match level.as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(level),
                _ => Err(SettingsError::Invalid {
                    key: format!("{ENV_PREFIX}{key}"),
                    value: raw,
                    reason: "expected trace|debug|info|warn|error".to_string(),
                }),
            }
        }
    }
}
