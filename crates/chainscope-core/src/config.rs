//! Environment configuration.
//!
//! Provider keys and endpoints read `CHAINSCOPE_<NAME>` first and fall back
//! to the bare `<NAME>`. Tuning knobs exist only in prefixed form. Empty
//! values count as unset.

use std::time::Duration;

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::fallback::DEFAULT_ATTEMPT_TIMEOUT;
use crate::ValidationError;

const PREFIX: &str = "CHAINSCOPE_";

#[derive(Debug, Clone, PartialEq)]
pub struct ChainscopeConfig {
    pub etherscan_api_key: Option<String>,
    pub coingecko_api_key: Option<String>,
    pub dune_api_key: Option<String>,
    pub rpc_url: Option<String>,
    /// Chain id the node at `rpc_url` serves. Without it the node only
    /// answers requests that name no chain.
    pub rpc_chain_id: Option<u64>,
    pub circuit_breaker: CircuitBreakerConfig,
    pub attempt_timeout: Duration,
}

impl Default for ChainscopeConfig {
    fn default() -> Self {
        Self {
            etherscan_api_key: None,
            coingecko_api_key: None,
            dune_api_key: None,
            rpc_url: None,
            rpc_chain_id: None,
            circuit_breaker: CircuitBreakerConfig::default(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl ChainscopeConfig {
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(&format!("{PREFIX}{name}"))
                .filter(|value| !value.trim().is_empty())
                .or_else(|| lookup(name).filter(|value| !value.trim().is_empty()))
                .map(|value| value.trim().to_owned())
        };
        let read_prefixed = |name: &str| {
            lookup(&format!("{PREFIX}{name}"))
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let defaults = CircuitBreakerConfig::default();
        let failure_threshold = match read_prefixed("CB_FAILURE_THRESHOLD") {
            Some(value) => parse_positive(&value, "CHAINSCOPE_CB_FAILURE_THRESHOLD")
                .and_then(|threshold| {
                    u32::try_from(threshold).map_err(|_| ValidationError::InvalidConfig {
                        key: "CHAINSCOPE_CB_FAILURE_THRESHOLD",
                        value: value.clone(),
                    })
                })?,
            None => defaults.failure_threshold,
        };
        let recovery_time = match read_prefixed("CB_RECOVERY_MS") {
            Some(value) => Duration::from_millis(parse_u64(&value, "CHAINSCOPE_CB_RECOVERY_MS")?),
            None => defaults.recovery_time,
        };
        let attempt_timeout = match read_prefixed("PROVIDER_TIMEOUT_MS") {
            Some(value) => {
                Duration::from_millis(parse_positive(&value, "CHAINSCOPE_PROVIDER_TIMEOUT_MS")?)
            }
            None => DEFAULT_ATTEMPT_TIMEOUT,
        };
        let rpc_chain_id = read("RPC_CHAIN_ID")
            .map(|value| parse_chain_id(&value))
            .transpose()?;

        Ok(Self {
            etherscan_api_key: read("ETHERSCAN_API_KEY"),
            coingecko_api_key: read("COINGECKO_API_KEY"),
            dune_api_key: read("DUNE_API_KEY"),
            rpc_url: read("RPC_URL"),
            rpc_chain_id,
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold,
                recovery_time,
            },
            attempt_timeout,
        })
    }
}

fn parse_u64(value: &str, key: &'static str) -> Result<u64, ValidationError> {
    value.parse::<u64>().map_err(|_| ValidationError::InvalidConfig {
        key,
        value: value.to_owned(),
    })
}

fn parse_positive(value: &str, key: &'static str) -> Result<u64, ValidationError> {
    match parse_u64(value, key)? {
        0 => Err(ValidationError::InvalidConfig {
            key,
            value: value.to_owned(),
        }),
        parsed => Ok(parsed),
    }
}

/// Decimal or `0x` hex.
fn parse_chain_id(value: &str) -> Result<u64, ValidationError> {
    const KEY: &str = "CHAINSCOPE_RPC_CHAIN_ID";
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse::<u64>().ok(),
    };

    parsed
        .filter(|chain_id| *chain_id > 0)
        .ok_or_else(|| ValidationError::InvalidConfig {
            key: KEY,
            value: value.to_owned(),
        })
}
