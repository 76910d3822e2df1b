//! Client configuration.
//!
//! Values come from defaults, a YAML document, or `PANGGIL_*` environment
//! variables. Validation happens once, before any request is sent.

use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use crate::transport::{default_user_agent, TransportConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Environment variable names.
pub mod vars {
    pub const PANGGIL_TIMEOUT_MS: &str = "PANGGIL_TIMEOUT_MS";
    pub const PANGGIL_RETRY_INTERVAL_MS: &str = "PANGGIL_RETRY_INTERVAL_MS";
    pub const PANGGIL_RETRY_ATTEMPTS: &str = "PANGGIL_RETRY_ATTEMPTS";
    pub const PANGGIL_CONNECT_TIMEOUT_MS: &str = "PANGGIL_CONNECT_TIMEOUT_MS";
    pub const PANGGIL_USER_AGENT: &str = "PANGGIL_USER_AGENT";
}

/// Client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Delay between attempts in milliseconds.
    pub retry_interval_ms: u64,
    /// Total attempts per call, including the first.
    pub retry_attempts: u32,
    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Maximum idle connections per host.
    pub pool_max_idle_per_host: usize,
    /// Enable gzip decompression.
    pub gzip: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 1_000,
            retry_interval_ms: 500,
            retry_attempts: 1,
            connect_timeout_ms: 10_000,
            user_agent: default_user_agent(),
            pool_max_idle_per_host: 10,
            gzip: true,
        }
    }
}

impl ClientConfig {
    /// Parse a YAML document; missing keys keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Build from defaults overridden by `PANGGIL_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = parse_var(vars::PANGGIL_TIMEOUT_MS)? {
            config.timeout_ms = v;
        }
        if let Some(v) = parse_var(vars::PANGGIL_RETRY_INTERVAL_MS)? {
            config.retry_interval_ms = v;
        }
        if let Some(v) = parse_var(vars::PANGGIL_RETRY_ATTEMPTS)? {
            config.retry_attempts = v;
        }
        if let Some(v) = parse_var(vars::PANGGIL_CONNECT_TIMEOUT_MS)? {
            config.connect_timeout_ms = v;
        }
        if let Ok(agent) = env::var(vars::PANGGIL_USER_AGENT) {
            config.user_agent = agent;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make every call fail or hang.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry_policy().validate()
    }

    /// The retry policy described by this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(self.timeout_ms),
            interval: Duration::from_millis(self.retry_interval_ms),
            max_attempts: self.retry_attempts,
        }
    }

    /// Settings for the reqwest transport.
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            user_agent: self.user_agent.clone(),
            pool_max_idle_per_host: self.pool_max_idle_per_host,
            gzip: self.gzip,
        }
    }
}

fn parse_var<T: std::str::FromStr>(var: &str) -> Result<Option<T>, ConfigError> {
    match env::var(var) {
        Ok(v) => v.trim().parse().map(Some).map_err(|_| ConfigError::InvalidEnv {
            var: var.to_string(),
            message: format!("expected a non-negative integer, got {:?}", v),
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-wide.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for var in [
            vars::PANGGIL_TIMEOUT_MS,
            vars::PANGGIL_RETRY_INTERVAL_MS,
            vars::PANGGIL_RETRY_ATTEMPTS,
            vars::PANGGIL_CONNECT_TIMEOUT_MS,
            vars::PANGGIL_USER_AGENT,
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout_ms, 1_000);
        assert_eq!(config.retry_interval_ms, 500);
        assert_eq!(config.retry_attempts, 1);
        assert!(config.user_agent.starts_with("panggil-http/"));
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ClientConfig::from_yaml_str(
            r#"
timeout_ms: 2500
retry_attempts: 3
"#,
        )
        .unwrap();

        assert_eq!(config.timeout_ms, 2500);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_interval_ms, 500);
        assert!(config.gzip);
    }

    #[test]
    fn test_yaml_rejects_invalid_values() {
        let result = ClientConfig::from_yaml_str("retry_attempts: 0");
        assert!(matches!(result, Err(ConfigError::InvalidRetry { attempts: 0, .. })));

        let result = ClientConfig::from_yaml_str("timeout_ms: [1, 2]");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_config_serializes_to_yaml() {
        let yaml = serde_yaml::to_string(&ClientConfig::default()).unwrap();
        assert!(yaml.contains("timeout_ms: 1000"));
        assert!(yaml.contains("retry_interval_ms: 500"));
    }

    #[test]
    fn test_transport_config_mapping() {
        let config = ClientConfig {
            connect_timeout_ms: 250,
            gzip: false,
            ..ClientConfig::default()
        };

        let transport = config.transport_config();
        assert_eq!(transport.connect_timeout, Duration::from_millis(250));
        assert!(!transport.gzip);
    }

    #[test]
    fn test_config_from_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        env::set_var(vars::PANGGIL_TIMEOUT_MS, "3000");
        env::set_var(vars::PANGGIL_RETRY_ATTEMPTS, "4");
        env::set_var(vars::PANGGIL_USER_AGENT, "custom/1.0");

        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.timeout_ms, 3000);
        assert_eq!(config.retry_attempts, 4);
        assert_eq!(config.retry_interval_ms, 500);
        assert_eq!(config.user_agent, "custom/1.0");

        clear_env();
    }

    #[test]
    fn test_config_from_env_invalid_value() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        env::set_var(vars::PANGGIL_RETRY_INTERVAL_MS, "soon");
        let result = ClientConfig::from_env();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnv { ref var, .. }) if var == vars::PANGGIL_RETRY_INTERVAL_MS
        ));

        env::set_var(vars::PANGGIL_RETRY_INTERVAL_MS, "0");
        assert!(ClientConfig::from_env().is_err());

        clear_env();
    }
}
