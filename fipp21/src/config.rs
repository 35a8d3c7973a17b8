//! Client configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::api::{ApiClient, ApiError};
use crate::realtime::dispatcher::DEFAULT_CONNECT_TIMEOUT;
use crate::realtime::{DispatcherConfig, ReconnectPolicy};

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_PUSH_URL: &str = "ws://localhost:5000";
pub const DEFAULT_STATE_PATH: &str = ".fipp21/session.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Complete client configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the HTTP API
    pub api_base_url: String,
    /// Push endpoint URL
    pub push_url: String,
    /// Limit on each HTTP request
    pub request_timeout: Duration,
    /// Where the session is persisted between runs
    pub state_path: PathBuf,
    /// Push reconnection policy
    pub reconnect: ReconnectPolicy,
    /// Limit on each push handshake
    pub connect_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            push_url: DEFAULT_PUSH_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            reconnect: ReconnectPolicy::default(),
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `api_override` - Optional API URL override (from CLI args)
    /// * `push_override` - Optional push URL override (from CLI args)
    /// * `state_override` - Optional state file override (from CLI args)
    ///
    /// Unparseable numeric values fall back to their defaults. Call
    /// [`validate`](Self::validate) afterwards.
    pub fn from_env(
        api_override: Option<String>,
        push_override: Option<String>,
        state_override: Option<PathBuf>,
    ) -> Self {
        let defaults = ReconnectPolicy::default();

        let api_base_url = api_override
            .or_else(|| std::env::var("FIPP21_API_URL").ok())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let push_url = push_override
            .or_else(|| std::env::var("FIPP21_PUSH_URL").ok())
            .unwrap_or_else(|| DEFAULT_PUSH_URL.to_string());

        let state_path = state_override
            .or_else(|| std::env::var("FIPP21_STATE_PATH").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH));

        let reconnect = ReconnectPolicy {
            initial_delay: Duration::from_millis(parse_env_or(
                "FIPP21_RECONNECT_INITIAL_MS",
                defaults.initial_delay.as_millis() as u64,
            )),
            max_delay: Duration::from_millis(parse_env_or(
                "FIPP21_RECONNECT_MAX_MS",
                defaults.max_delay.as_millis() as u64,
            )),
            multiplier: parse_env_or("FIPP21_RECONNECT_MULTIPLIER", defaults.multiplier),
            jitter: parse_env_or("FIPP21_RECONNECT_JITTER", defaults.jitter),
            max_attempts: std::env::var("FIPP21_RECONNECT_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok()),
        };

        ClientConfig {
            api_base_url,
            push_url,
            request_timeout: Duration::from_secs(parse_env_or(
                "FIPP21_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            state_path,
            reconnect,
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
        }
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !has_scheme(&self.api_base_url, &["http://", "https://"]) {
            return Err(ConfigError::Invalid {
                var: "FIPP21_API_URL".to_string(),
                reason: format!("Must start with http:// or https:// (got {})", self.api_base_url),
            });
        }

        if !has_scheme(&self.push_url, &["ws://", "wss://"]) {
            return Err(ConfigError::Invalid {
                var: "FIPP21_PUSH_URL".to_string(),
                reason: format!("Must start with ws:// or wss:// (got {})", self.push_url),
            });
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: "FIPP21_REQUEST_TIMEOUT_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.state_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired {
                var: "FIPP21_STATE_PATH".to_string(),
                hint: format!("Leave unset to use {}", DEFAULT_STATE_PATH),
            });
        }

        if self.reconnect.initial_delay.is_zero() {
            return Err(ConfigError::Invalid {
                var: "FIPP21_RECONNECT_INITIAL_MS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.reconnect.max_delay < self.reconnect.initial_delay {
            return Err(ConfigError::Invalid {
                var: "FIPP21_RECONNECT_MAX_MS".to_string(),
                reason: format!(
                    "Must be at least the initial delay ({} ms)",
                    self.reconnect.initial_delay.as_millis()
                ),
            });
        }

        if self.reconnect.multiplier.is_nan() || self.reconnect.multiplier < 1.0 {
            return Err(ConfigError::Invalid {
                var: "FIPP21_RECONNECT_MULTIPLIER".to_string(),
                reason: "Must be at least 1.0".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.reconnect.jitter) {
            return Err(ConfigError::Invalid {
                var: "FIPP21_RECONNECT_JITTER".to_string(),
                reason: "Must be between 0.0 and 1.0".to_string(),
            });
        }

        if self.reconnect.max_attempts == Some(0) {
            return Err(ConfigError::Invalid {
                var: "FIPP21_RECONNECT_MAX_ATTEMPTS".to_string(),
                reason: "Must be greater than 0, or unset to retry forever".to_string(),
            });
        }

        Ok(())
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            endpoint: self.push_url.clone(),
            reconnect: self.reconnect.clone(),
            connect_timeout: self.connect_timeout,
        }
    }

    pub fn api_client(&self) -> Result<ApiClient, ApiError> {
        ApiClient::with_timeout(self.api_base_url.clone(), self.request_timeout)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn has_scheme(url: &str, schemes: &[&str]) -> bool {
    schemes
        .iter()
        .any(|scheme| url.len() > scheme.len() && url.starts_with(scheme))
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 9] = [
        "FIPP21_API_URL",
        "FIPP21_PUSH_URL",
        "FIPP21_REQUEST_TIMEOUT_SECS",
        "FIPP21_STATE_PATH",
        "FIPP21_RECONNECT_INITIAL_MS",
        "FIPP21_RECONNECT_MAX_MS",
        "FIPP21_RECONNECT_MULTIPLIER",
        "FIPP21_RECONNECT_JITTER",
        "FIPP21_RECONNECT_MAX_ATTEMPTS",
    ];

    fn clear_env() {
        for var in VARS {
            // SAFETY: env-mutating tests are serialized with #[serial]
            unsafe { std::env::remove_var(var) };
        }
    }

    fn set_env(key: &str, value: &str) {
        // SAFETY: env-mutating tests are serialized with #[serial]
        unsafe { std::env::set_var(key, value) };
    }

    #[test]
    #[serial]
    fn test_defaults_without_environment() {
        clear_env();
        let config = ClientConfig::from_env(None, None, None);

        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.push_url, DEFAULT_PUSH_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.state_path, PathBuf::from(DEFAULT_STATE_PATH));
        assert_eq!(config.reconnect, ReconnectPolicy::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_environment_overrides_defaults() {
        clear_env();
        set_env("FIPP21_API_URL", "https://api.example.com");
        set_env("FIPP21_RECONNECT_INITIAL_MS", "500");
        set_env("FIPP21_RECONNECT_MAX_ATTEMPTS", "4");
        set_env("FIPP21_RECONNECT_JITTER", "0");

        let config = ClientConfig::from_env(None, None, None);
        clear_env();

        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.reconnect.initial_delay, Duration::from_millis(500));
        assert_eq!(config.reconnect.max_attempts, Some(4));
        assert_eq!(config.reconnect.jitter, 0.0);
    }

    #[test]
    #[serial]
    fn test_cli_overrides_beat_environment() {
        clear_env();
        set_env("FIPP21_API_URL", "http://from-env:1");
        set_env("FIPP21_STATE_PATH", "/tmp/env.json");

        let config = ClientConfig::from_env(
            Some("http://from-cli:2".to_string()),
            Some("ws://from-cli:2".to_string()),
            Some(PathBuf::from("/tmp/cli.json")),
        );
        clear_env();

        assert_eq!(config.api_base_url, "http://from-cli:2");
        assert_eq!(config.push_url, "ws://from-cli:2");
        assert_eq!(config.state_path, PathBuf::from("/tmp/cli.json"));
    }

    #[test]
    #[serial]
    fn test_unparseable_number_falls_back() {
        clear_env();
        set_env("FIPP21_REQUEST_TIMEOUT_SECS", "soon");
        let config = ClientConfig::from_env(None, None, None);
        clear_env();

        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_validate_rejects_wrong_push_scheme() {
        let config = ClientConfig {
            push_url: "http://localhost:5000".to_string(),
            ..ClientConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "FIPP21_PUSH_URL"));
    }

    #[test]
    fn test_validate_rejects_bad_reconnect_policy() {
        let mut config = ClientConfig::default();
        config.reconnect.jitter = 1.5;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.reconnect.max_delay = Duration::from_millis(10);
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.reconnect.multiplier = 0.5;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.reconnect.max_attempts = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dispatcher_config_carries_policy() {
        let config = ClientConfig {
            reconnect: ReconnectPolicy::fixed(Duration::from_secs(3)),
            ..ClientConfig::default()
        };
        let dispatcher = config.dispatcher_config();
        assert_eq!(dispatcher.endpoint, DEFAULT_PUSH_URL);
        assert_eq!(dispatcher.reconnect, ReconnectPolicy::fixed(Duration::from_secs(3)));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            var: "FIPP21_API_URL".to_string(),
            reason: "Must start with http://".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("FIPP21_API_URL"));
        assert!(msg.contains("http://"));
    }
}
