use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use chat_relay::PollPolicy;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Expected env var: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    pub api_key: String,
    pub assistant_id: String,
    pub base_url: String,
    pub listen: SocketAddr,
    pub poll_interval: Duration,
    pub poll_max_attempts: u32,
    pub http_timeout: Duration,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads every setting through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
        // The standalone server historically read ASSISTANT_ID.
        let assistant_id = get("OPENAI_ASSISTANT_ID")
            .or_else(|| get("ASSISTANT_ID"))
            .ok_or(ConfigError::Missing("OPENAI_ASSISTANT_ID"))?;
        let base_url =
            get("OPENAI_BASE_URL").unwrap_or_else(|| openai_api::DEFAULT_BASE_URL.to_string());

        let ip: IpAddr = parse_or(&get, "RELAY_BIND_ADDR", IpAddr::from([0, 0, 0, 0]))?;
        let port: u16 = parse_or(&get, "PORT", 3001)?;
        let poll_interval_ms: u64 = parse_or(&get, "RELAY_POLL_INTERVAL_MS", 900)?;
        let poll_max_attempts: u32 = parse_or(&get, "RELAY_POLL_MAX_ATTEMPTS", 40)?;
        if poll_max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "RELAY_POLL_MAX_ATTEMPTS",
                value: "0".to_string(),
            });
        }
        let http_timeout_s: u64 = parse_or(&get, "RELAY_HTTP_TIMEOUT_SECS", 60)?;

        Ok(RelayConfig {
            api_key,
            assistant_id,
            base_url,
            listen: SocketAddr::new(ip, port),
            poll_interval: Duration::from_millis(poll_interval_ms),
            poll_max_attempts,
            http_timeout: Duration::from_secs(http_timeout_s),
        })
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: self.poll_interval,
            max_attempts: self.poll_max_attempts,
        }
    }
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
