use std::net::SocketAddr;
use std::time::Duration;

use reqwest::Url;
use tracing::Level;

use crate::error::ConfigError;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/caption";
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 3000);

/// Largest image accepted by intake, in bytes (10 MiB).
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: Url,
    pub bind: SocketAddr,
    /// `None` keeps requests unbounded.
    pub timeout: Option<Duration>,
    pub log_level: Level,
}

impl ClientConfig {
    pub fn new(
        endpoint: &str,
        bind: SocketAddr,
        timeout_secs: Option<u64>,
        log_level: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: parse_endpoint(endpoint)?,
            bind,
            timeout: timeout_secs.filter(|secs| *secs > 0).map(Duration::from_secs),
            log_level: log_level
                .parse()
                .map_err(|_| ConfigError::LogLevel(log_level.to_string()))?,
        })
    }

    /// Config pointing at `endpoint` with every other knob at its default.
    pub fn for_endpoint(endpoint: &str) -> Result<Self, ConfigError> {
        Self::new(endpoint, SocketAddr::from(DEFAULT_BIND_ADDR), None, "info")
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::Endpoint {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Endpoint {
            url: raw.to_string(),
            reason: format!("unsupported scheme {other:?}"),
        }),
    }
}
