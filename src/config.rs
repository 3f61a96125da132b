//! Runtime configuration loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration. Every value has a default so the service starts
/// with no environment at all (in-memory storage, development secret).
#[derive(Debug, Clone)]
pub struct Config {
    /// Socket address the HTTP server binds to
    pub bind_addr: String,
    /// PostgreSQL connection string; in-memory storage is used when unset
    pub database_url: Option<String>,
    /// HMAC secret used to sign access and refresh tokens
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    /// Expiry applied to every cached item projection
    pub cache_ttl_seconds: u64,
}

impl Config {
    /// Loads configuration from the environment.
    ///
    /// - `BIND_ADDR` (default `0.0.0.0:3000`)
    /// - `DATABASE_URL` (optional)
    /// - `JWT_SECRET`
    /// - `ACCESS_TOKEN_MINUTES` (default 5)
    /// - `REFRESH_TOKEN_DAYS` (default 1)
    /// - `CACHE_TTL_SECONDS` (default 600)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            access_token_minutes: parse_var("ACCESS_TOKEN_MINUTES")
                .unwrap_or(defaults.access_token_minutes),
            refresh_token_days: parse_var("REFRESH_TOKEN_DAYS")
                .unwrap_or(defaults.refresh_token_days),
            cache_ttl_seconds: parse_var("CACHE_TTL_SECONDS")
                .unwrap_or(defaults.cache_ttl_seconds),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            database_url: None,
            jwt_secret: "your-secret-key-change-in-production".to_string(),
            access_token_minutes: 5,
            refresh_token_days: 1,
            cache_ttl_seconds: 600,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|value| value.parse().ok())
}
