//! Application-level configuration loading, including external host settings.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SKIRMISH_BACK_CONFIG_PATH";

const DEFAULT_HOST_BASE_URL: &str = "http://localhost:5000/api";
const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HOST_POLL_SECS: u64 = 5;
const DEFAULT_SSE_CAPACITY: usize = 16;

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Connection settings for the external resource host.
    pub host: HostSettings,
    /// How long a start request may wait for the per-game lock.
    pub lock_timeout: Duration,
    /// Interval between host connectivity probes.
    pub host_poll_interval: Duration,
    /// Broadcast channel capacity for the events SSE stream.
    pub sse_capacity: usize,
}

/// Where and how to reach the external resource host.
#[derive(Debug, Clone)]
pub struct HostSettings {
    /// Base URL of the host API, without trailing slash.
    pub base_url: String,
    /// Optional API key sent with every request.
    pub api_key: Option<String>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in
    /// defaults when the file is absent or malformed.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), host = %config.host.base_url, "loaded configuration");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "config file not found; using built-in defaults");
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: HostSettings {
                base_url: DEFAULT_HOST_BASE_URL.into(),
                api_key: None,
            },
            lock_timeout: Duration::from_secs(DEFAULT_LOCK_TIMEOUT_SECS),
            host_poll_interval: Duration::from_secs(DEFAULT_HOST_POLL_SECS),
            sse_capacity: DEFAULT_SSE_CAPACITY,
        }
    }
}

/// JSON representation of the configuration file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    host: Option<RawHost>,
    lock_timeout_secs: Option<u64>,
    host_poll_secs: Option<u64>,
    sse_capacity: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawHost {
    base_url: Option<String>,
    api_key: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        let host = match raw.host {
            Some(host) => HostSettings {
                base_url: host.base_url.unwrap_or(defaults.host.base_url),
                api_key: host.api_key,
            },
            None => defaults.host,
        };

        Self {
            host,
            lock_timeout: raw
                .lock_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.lock_timeout),
            host_poll_interval: raw
                .host_poll_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.host_poll_interval),
            sse_capacity: raw.sse_capacity.unwrap_or(defaults.sse_capacity),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_config_fills_missing_fields_with_defaults() {
        let raw: RawConfig = serde_json::from_str(r#"{"host":{"base_url":"http://h:9/api"}}"#)
            .expect("valid raw config");
        let config: AppConfig = raw.into();
        assert_eq!(config.host.base_url, "http://h:9/api");
        assert_eq!(config.lock_timeout, Duration::from_secs(30));
        assert_eq!(config.sse_capacity, DEFAULT_SSE_CAPACITY);
    }

    #[test]
    fn empty_raw_config_matches_defaults() {
        let raw: RawConfig = serde_json::from_str("{}").expect("valid raw config");
        let config: AppConfig = raw.into();
        assert_eq!(config.host.base_url, DEFAULT_HOST_BASE_URL);
        assert!(config.host.api_key.is_none());
    }
}
