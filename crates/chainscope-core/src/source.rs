use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical provider identifiers. The string form doubles as the
/// circuit-breaker key, so it must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Etherscan,
    Defillama,
    Coingecko,
    Growthepie,
    Blobscan,
    Dune,
    Rpc,
}

impl ProviderId {
    pub const ALL: [Self; 7] = [
        Self::Rpc,
        Self::Etherscan,
        Self::Coingecko,
        Self::Defillama,
        Self::Growthepie,
        Self::Blobscan,
        Self::Dune,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Etherscan => "etherscan",
            Self::Defillama => "defillama",
            Self::Coingecko => "coingecko",
            Self::Growthepie => "growthepie",
            Self::Blobscan => "blobscan",
            Self::Dune => "dune",
            Self::Rpc => "rpc",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "etherscan" => Ok(Self::Etherscan),
            "defillama" => Ok(Self::Defillama),
            "coingecko" => Ok(Self::Coingecko),
            "growthepie" => Ok(Self::Growthepie),
            "blobscan" => Ok(Self::Blobscan),
            "dune" => Ok(Self::Dune),
            "rpc" => Ok(Self::Rpc),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_ids_case_insensitively() {
        assert_eq!("DefiLlama".parse::<ProviderId>(), Ok(ProviderId::Defillama));
        assert_eq!(" rpc ".parse::<ProviderId>(), Ok(ProviderId::Rpc));
    }

    #[test]
    fn rejects_unknown_provider() {
        let err = "polygon".parse::<ProviderId>().expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidSource { .. }));
    }

    #[test]
    fn display_matches_breaker_key() {
        for id in ProviderId::ALL {
            assert_eq!(id.to_string(), id.as_str());
        }
    }
}
