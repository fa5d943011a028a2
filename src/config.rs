//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Signing secret used when `JWT_SECRET` is not set. Development only.
pub const DEV_JWT_SECRET: &str = "reno-dev-secret-change-me";

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Interval in seconds between sweeps of expired cache entries
    pub sweep_interval: u64,
    /// HMAC secret for signing access and refresh tokens
    pub jwt_secret: String,
    /// Access token lifetime in seconds
    pub access_token_ttl: u64,
    /// Refresh token lifetime in seconds
    pub refresh_token_ttl: u64,
    /// TTL in seconds of cached GET responses
    pub response_cache_ttl: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `DEFAULT_TTL` - Default cache TTL in seconds (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SWEEP_INTERVAL` - Expired entry sweep frequency in seconds (default: 60)
    /// - `JWT_SECRET` - Token signing secret (default: development secret)
    /// - `ACCESS_TOKEN_TTL` - Access token lifetime in seconds (default: 900)
    /// - `REFRESH_TOKEN_TTL` - Refresh token lifetime in seconds (default: 604800)
    /// - `RESPONSE_CACHE_TTL` - Cached GET response lifetime in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            default_ttl: env_or("DEFAULT_TTL", defaults.default_ttl),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            sweep_interval: env_or("SWEEP_INTERVAL", defaults.sweep_interval),
            jwt_secret: env::var("JWT_SECRET")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.jwt_secret),
            access_token_ttl: env_or("ACCESS_TOKEN_TTL", defaults.access_token_ttl),
            refresh_token_ttl: env_or("REFRESH_TOKEN_TTL", defaults.refresh_token_ttl),
            response_cache_ttl: env_or("RESPONSE_CACHE_TTL", defaults.response_cache_ttl),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }

    pub fn response_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.response_cache_ttl)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval.max(1))
    }

    /// True when tokens are signed with the built-in development secret.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: crate::cache::DEFAULT_CAPACITY,
            default_ttl: crate::cache::DEFAULT_TTL_SECS,
            server_port: 3000,
            sweep_interval: crate::cache::DEFAULT_SWEEP_INTERVAL_SECS,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            access_token_ttl: 15 * 60,
            refresh_token_ttl: 7 * 24 * 60 * 60,
            response_cache_ttl: 60,
        }
    }
}
