//! Configuration Module
//!
//! Handles loading and managing toolkit configuration from environment
//! variables. Invalid values fail at construction via [`Config::validate`]
//! rather than surfacing later inside component operations.

use std::env;
use std::time::Duration;

use crate::error::{Error, Result};

/// Toolkit configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Session store settings
    pub session: SessionConfig,
    /// Connection pool settings
    pub pool: PoolConfig,
    /// Cache TTL purge interval in seconds
    pub cache_sweep_interval: u64,
    /// Session reaper interval in seconds
    pub session_sweep_interval: u64,
    /// Adaptive rate-limiter adjustment interval in seconds
    pub adjust_interval: u64,
}

/// Session store settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum number of concurrent sessions before LRU eviction kicks in
    pub max_sessions: usize,
    /// Session lifetime
    pub session_ttl: Duration,
}

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Hard cap on live connections
    pub max_connections: usize,
    /// Connections created eagerly at pool construction
    pub min_connections: usize,
    /// How long `acquire` waits for a free connection before giving up
    pub acquire_timeout: Duration,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_SESSIONS` - Maximum concurrent sessions (default: 10000)
    /// - `SESSION_TTL` - Session lifetime in seconds (default: 86400)
    /// - `MAX_CONNECTIONS` - Connection pool cap (default: 10)
    /// - `MIN_CONNECTIONS` - Pre-warmed connections (default: 3)
    /// - `ACQUIRE_TIMEOUT_MS` - Pool acquire timeout in milliseconds (default: 5000)
    /// - `CACHE_SWEEP_INTERVAL` - Cache purge frequency in seconds (default: 60)
    /// - `SESSION_SWEEP_INTERVAL` - Session reap frequency in seconds (default: 300)
    /// - `ADJUST_INTERVAL` - Adaptive retune frequency in seconds (default: 10)
    pub fn from_env() -> Self {
        Self {
            session: SessionConfig {
                max_sessions: env_parse("MAX_SESSIONS", 10_000),
                session_ttl: Duration::from_secs(env_parse("SESSION_TTL", 86_400)),
            },
            pool: PoolConfig {
                max_connections: env_parse("MAX_CONNECTIONS", 10),
                min_connections: env_parse("MIN_CONNECTIONS", 3),
                acquire_timeout: Duration::from_millis(env_parse("ACQUIRE_TIMEOUT_MS", 5_000)),
            },
            cache_sweep_interval: env_parse("CACHE_SWEEP_INTERVAL", 60),
            session_sweep_interval: env_parse("SESSION_SWEEP_INTERVAL", 300),
            adjust_interval: env_parse("ADJUST_INTERVAL", 10),
        }
    }

    /// Validates the loaded configuration.
    ///
    /// Zero capacities, zero TTLs, and a min-connections count above the pool
    /// cap are rejected here so misconfiguration never reaches an operation.
    pub fn validate(&self) -> Result<()> {
        if self.session.max_sessions == 0 {
            return Err(Error::InvalidConfig("MAX_SESSIONS must be > 0".into()));
        }
        if self.session.session_ttl.is_zero() {
            return Err(Error::InvalidConfig("SESSION_TTL must be > 0".into()));
        }
        if self.pool.max_connections == 0 {
            return Err(Error::InvalidConfig("MAX_CONNECTIONS must be > 0".into()));
        }
        if self.pool.min_connections > self.pool.max_connections {
            return Err(Error::InvalidConfig(
                "MIN_CONNECTIONS cannot exceed MAX_CONNECTIONS".into(),
            ));
        }
        if self.cache_sweep_interval == 0
            || self.session_sweep_interval == 0
            || self.adjust_interval == 0
        {
            return Err(Error::InvalidConfig(
                "Sweep intervals must be > 0 seconds".into(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig {
                max_sessions: 10_000,
                session_ttl: Duration::from_secs(86_400),
            },
            pool: PoolConfig {
                max_connections: 10,
                min_connections: 3,
                acquire_timeout: Duration::from_millis(5_000),
            },
            cache_sweep_interval: 60,
            session_sweep_interval: 300,
            adjust_interval: 10,
        }
    }
}

/// Parses an environment variable, falling back to a default.
fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.session.max_sessions, 10_000);
        assert_eq!(config.session.session_ttl, Duration::from_secs(86_400));
        assert_eq!(config.pool.max_connections, 10);
        assert_eq!(config.pool.min_connections, 3);
        assert_eq!(config.cache_sweep_interval, 60);
        assert_eq!(config.session_sweep_interval, 300);
        assert_eq!(config.adjust_interval, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("MAX_SESSIONS");
        env::remove_var("SESSION_TTL");
        env::remove_var("MAX_CONNECTIONS");
        env::remove_var("MIN_CONNECTIONS");
        env::remove_var("ACQUIRE_TIMEOUT_MS");

        let config = Config::from_env();
        assert_eq!(config.session.max_sessions, 10_000);
        assert_eq!(config.pool.acquire_timeout, Duration::from_millis(5_000));
    }

    #[test]
    fn test_config_rejects_zero_sessions() {
        let mut config = Config::default();
        config.session.max_sessions = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_config_rejects_min_above_max_connections() {
        let mut config = Config::default();
        config.pool.min_connections = 20;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_config_rejects_zero_sweep_interval() {
        let mut config = Config::default();
        config.cache_sweep_interval = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
