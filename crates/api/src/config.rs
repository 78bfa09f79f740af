//! Process configuration read from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Stream endpoint tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    /// Interval between keepalive comments.
    pub keepalive: Duration,
    /// Reconnect hint sent as the first frame.
    pub retry: Duration,
    /// Per-connection event buffer.
    pub buffer: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            keepalive: Duration::from_secs(15),
            retry: Duration::from_millis(5000),
            buffer: 256,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub stream: StreamSettings,
    pub database_url: Option<String>,
}

impl ApiConfig {
    /// Config with defaults and the given secret; used by tests and embedders.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: jwt_secret.into(),
            stream: StreamSettings::default(),
            database_url: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = parse_or(&lookup, "BIND_ADDR", || DEFAULT_BIND_ADDR.parse().ok())?;

        let jwt_secret = lookup("JWT_SECRET").filter(|s| !s.is_empty()).unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEFAULT_JWT_SECRET.to_string()
        });

        let defaults = StreamSettings::default();
        let keepalive_secs: u64 = parse_or(&lookup, "SSE_KEEPALIVE_SECS", || Some(defaults.keepalive.as_secs()))?;
        let retry_ms: u64 = parse_or(&lookup, "SSE_RETRY_MS", || Some(defaults.retry.as_millis() as u64))?;
        let buffer: usize = parse_or(&lookup, "SSE_BUFFER", || Some(defaults.buffer))?;

        if keepalive_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "SSE_KEEPALIVE_SECS",
                value: "0".to_string(),
            });
        }
        if buffer == 0 {
            return Err(ConfigError::Invalid {
                name: "SSE_BUFFER",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            bind_addr,
            jwt_secret,
            stream: StreamSettings {
                keepalive: Duration::from_secs(keepalive_secs),
                retry: Duration::from_millis(retry_ms),
                buffer,
            },
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
        })
    }
}

fn parse_or<F, T, D>(lookup: &F, name: &'static str, default: D) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    D: FnOnce() -> Option<T>,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => default().ok_or(ConfigError::Invalid {
            name,
            value: String::new(),
        }),
    }
}
