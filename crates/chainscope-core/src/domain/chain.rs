use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// EVM chains with known identifiers across the supported services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Optimism,
    Bsc,
    Polygon,
    ZkSync,
    Base,
    Arbitrum,
    Avalanche,
    Linea,
    Scroll,
}

impl Chain {
    pub const ALL: [Self; 10] = [
        Self::Ethereum,
        Self::Optimism,
        Self::Bsc,
        Self::Polygon,
        Self::ZkSync,
        Self::Base,
        Self::Arbitrum,
        Self::Avalanche,
        Self::Linea,
        Self::Scroll,
    ];

    pub const fn chain_id(self) -> u64 {
        match self {
            Self::Ethereum => 1,
            Self::Optimism => 10,
            Self::Bsc => 56,
            Self::Polygon => 137,
            Self::ZkSync => 324,
            Self::Base => 8453,
            Self::Arbitrum => 42161,
            Self::Avalanche => 43114,
            Self::Linea => 59144,
            Self::Scroll => 534352,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ethereum => "ethereum",
            Self::Optimism => "optimism",
            Self::Bsc => "bsc",
            Self::Polygon => "polygon",
            Self::ZkSync => "zksync",
            Self::Base => "base",
            Self::Arbitrum => "arbitrum",
            Self::Avalanche => "avalanche",
            Self::Linea => "linea",
            Self::Scroll => "scroll",
        }
    }

    /// Chain prefix used in DefiLlama coin keys (`<prefix>:<address>`).
    pub const fn defillama_key(self) -> &'static str {
        match self {
            Self::Ethereum => "ethereum",
            Self::Optimism => "optimism",
            Self::Bsc => "bsc",
            Self::Polygon => "polygon",
            Self::ZkSync => "era",
            Self::Base => "base",
            Self::Arbitrum => "arbitrum",
            Self::Avalanche => "avax",
            Self::Linea => "linea",
            Self::Scroll => "scroll",
        }
    }

    /// Asset platform slug used by CoinGecko's contract lookups.
    pub const fn coingecko_platform(self) -> &'static str {
        match self {
            Self::Ethereum => "ethereum",
            Self::Optimism => "optimistic-ethereum",
            Self::Bsc => "binance-smart-chain",
            Self::Polygon => "polygon-pos",
            Self::ZkSync => "zksync",
            Self::Base => "base",
            Self::Arbitrum => "arbitrum-one",
            Self::Avalanche => "avalanche",
            Self::Linea => "linea",
            Self::Scroll => "scroll",
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|chain| chain.chain_id() == chain_id)
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::Ethereum
    }
}

impl Display for Chain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(ValidationError::EmptyChain);
        }

        if let Ok(chain_id) = normalized.parse::<u64>() {
            return Self::from_chain_id(chain_id).ok_or(ValidationError::UnknownChain {
                value: normalized,
            });
        }

        match normalized.as_str() {
            "ethereum" | "eth" | "mainnet" => Ok(Self::Ethereum),
            "optimism" | "op" => Ok(Self::Optimism),
            "bsc" | "bnb" | "binance" => Ok(Self::Bsc),
            "polygon" | "matic" => Ok(Self::Polygon),
            "zksync" | "zksync era" | "era" => Ok(Self::ZkSync),
            "base" => Ok(Self::Base),
            "arbitrum" | "arbitrum one" | "arb" => Ok(Self::Arbitrum),
            "avalanche" | "avax" => Ok(Self::Avalanche),
            "linea" => Ok(Self::Linea),
            "scroll" => Ok(Self::Scroll),
            _ => Err(ValidationError::UnknownChain { value: normalized }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_aliases_and_ids() {
        assert_eq!("Arbitrum".parse::<Chain>(), Ok(Chain::Arbitrum));
        assert_eq!("mainnet".parse::<Chain>(), Ok(Chain::Ethereum));
        assert_eq!("8453".parse::<Chain>(), Ok(Chain::Base));
    }

    #[test]
    fn rejects_unknown_chain_id() {
        let err = "999999".parse::<Chain>().expect_err("must fail");
        assert!(matches!(err, ValidationError::UnknownChain { .. }));
    }

    #[test]
    fn chain_ids_are_unique() {
        for chain in Chain::ALL {
            assert_eq!(Chain::from_chain_id(chain.chain_id()), Some(chain));
        }
    }
}
