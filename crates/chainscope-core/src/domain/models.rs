use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::{Chain, ProviderId, UtcDateTime, ValidationError};

/// Checked `0x`-prefixed 20-byte address, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if !looks_like_address(trimmed) || !trimmed[2..].chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(ValidationError::InvalidAddress {
                value: trimmed.to_owned(),
            });
        }

        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Address {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structural contract-address check: `0x` prefix and 42 characters total.
pub fn looks_like_address(value: &str) -> bool {
    value.len() == 42 && (value.starts_with("0x") || value.starts_with("0X"))
}

/// Checked `0x`-prefixed 32-byte transaction hash, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxHash(String);

impl TxHash {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let valid = trimmed.len() == 66
            && (trimmed.starts_with("0x") || trimmed.starts_with("0X"))
            && trimmed[2..].chars().all(|ch| ch.is_ascii_hexdigit());
        if !valid {
            return Err(ValidationError::InvalidHash {
                value: trimmed.to_owned(),
            });
        }

        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TxHash {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TxHash> for String {
    fn from(value: TxHash) -> Self {
        value.0
    }
}

impl Display for TxHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Checked `0x`-prefixed byte string (calldata, storage slots).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub struct HexData(String);

impl HexData {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .filter(|digits| digits.len() % 2 == 0)
            .filter(|digits| digits.chars().all(|ch| ch.is_ascii_hexdigit()))
            .ok_or_else(|| ValidationError::InvalidHexData {
                value: trimmed.to_owned(),
            })?;

        Ok(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }

    /// Left-pads a storage slot or quantity to 32 bytes.
    pub fn slot(position: u64) -> Self {
        Self(format!("0x{position:064x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<HexData> for String {
    fn from(value: HexData) -> Self {
        value.0
    }
}

impl Display for HexData {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps common ticker symbols onto market-data coin ids; other names pass
/// through lowercased.
pub fn canonical_coin_id(name: &str) -> String {
    let lowered = name.trim().to_ascii_lowercase();
    let id = match lowered.as_str() {
        "eth" | "ether" => "ethereum",
        "btc" => "bitcoin",
        "usdc" => "usd-coin",
        "usdt" => "tether",
        "dai" => "dai",
        "weth" => "weth",
        "wbtc" => "wrapped-bitcoin",
        "sol" => "solana",
        "matic" | "pol" => "polygon-ecosystem-token",
        "arb" => "arbitrum",
        "op" => "optimism",
        "link" => "chainlink",
        "uni" => "uniswap",
        "bnb" => "binancecoin",
        "avax" => "avalanche-2",
        other => other,
    };
    id.to_owned()
}

/// Price lookup target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenQuery {
    /// Human-readable token id or name, e.g. `ethereum`, `usd-coin`.
    Name(String),
    /// Contract address on a specific chain.
    Contract { chain: Chain, address: Address },
}

impl TokenQuery {
    /// Classifies `input` as a contract address (structurally) or a name.
    pub fn parse(input: &str, chain: Chain) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyTokenQuery);
        }

        if looks_like_address(trimmed) {
            return Ok(Self::Contract {
                chain,
                address: Address::parse(trimmed)?,
            });
        }

        Ok(Self::Name(canonical_coin_id(trimmed)))
    }

    pub const fn is_contract(&self) -> bool {
        matches!(self, Self::Contract { .. })
    }
}

impl Display for TokenQuery {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Contract { chain, address } => write!(f, "{chain}:{address}"),
        }
    }
}

/// Canonical spot price shared by every price provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPrice {
    pub price: f64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_24h_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap_usd: Option<f64>,
    /// When the provider last updated the quote, if it says.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<UtcDateTime>,
}

impl NormalizedPrice {
    pub fn usd(price: f64) -> Self {
        Self {
            price,
            currency: String::from("USD"),
            change_24h_percent: None,
            market_cap_usd: None,
            as_of: None,
        }
    }
}

/// Canonical total-value-locked figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTvl {
    pub tvl_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<BTreeMap<String, f64>>,
}

/// Canonical recent-blob statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBlobStats {
    pub recent_blob_count: u64,
    pub average_blob_size_bytes: f64,
}

/// A routed result with provenance: which provider answered and how many
/// fallbacks were needed to get there.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Routed<T> {
    pub data: T,
    pub source: ProviderId,
    pub fallbacks_used: usize,
}

impl<T> Routed<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Routed<U> {
        Routed {
            data: f(self.data),
            source: self.source,
            fallbacks_used: self.fallbacks_used,
        }
    }
}

/// Block selector for on-chain reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockTag {
    #[default]
    Latest,
    Earliest,
    Pending,
    Number(u64),
}

impl BlockTag {
    pub fn to_rpc(self) -> String {
        match self {
            Self::Latest => String::from("latest"),
            Self::Earliest => String::from("earliest"),
            Self::Pending => String::from("pending"),
            Self::Number(number) => format!("{number:#x}"),
        }
    }

    pub const fn is_fixed(self) -> bool {
        matches!(self, Self::Number(_) | Self::Earliest)
    }
}

impl FromStr for BlockTag {
    type Err = ValidationError;

    /// `latest`, `earliest`, `pending`, a decimal height or a `0x` quantity.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "latest" => Ok(Self::Latest),
            "earliest" => Ok(Self::Earliest),
            "pending" => Ok(Self::Pending),
            other if other.starts_with("0x") => {
                let number = parse_hex_quantity(other)
                    .ok()
                    .and_then(|number| u64::try_from(number).ok());
                number.map(Self::Number).ok_or_else(|| ValidationError::InvalidBlockTag {
                    value: trimmed.to_owned(),
                })
            }
            other => other
                .parse::<u64>()
                .map(Self::Number)
                .map_err(|_| ValidationError::InvalidBlockTag {
                    value: trimmed.to_owned(),
                }),
        }
    }
}

impl Serialize for BlockTag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_rpc())
    }
}

/// Log query accepted by both the node and the explorer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub from_block: BlockTag,
    pub to_block: BlockTag,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<Option<String>>,
}

/// Native balance in wei.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountBalance {
    pub address: Address,
    #[serde(serialize_with = "serialize_u128_decimal")]
    pub wei: u128,
}

/// Parses `0x`-prefixed JSON-RPC quantities.
pub fn parse_hex_quantity(value: &str) -> Result<u128, ValidationError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| ValidationError::InvalidHexQuantity {
            value: value.to_owned(),
        })?;

    if digits.is_empty() {
        return Ok(0);
    }

    u128::from_str_radix(digits, 16).map_err(|_| ValidationError::InvalidHexQuantity {
        value: value.to_owned(),
    })
}

fn serialize_u128_decimal<S>(value: &u128, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}

/// One row of a health check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceHealth {
    pub source: ProviderId,
    pub healthy: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Health report across every configured provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub checked_at: UtcDateTime,
    pub sources: Vec<SourceHealth>,
}

impl HealthReport {
    pub fn healthy_count(&self) -> usize {
        self.sources.iter().filter(|source| source.healthy).count()
    }
}

/// One provider's answer in a side-by-side comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceQuote {
    pub source: ProviderId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Side-by-side comparison of every price-capable provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceComparison {
    pub sources: Vec<SourceQuote>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    /// `(max - min) / mean * 100` across providers that returned a value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_variance_percent: Option<f64>,
}

impl PriceComparison {
    pub fn from_quotes(sources: Vec<SourceQuote>) -> Self {
        let values = sources
            .iter()
            .filter_map(|quote| quote.value)
            .collect::<Vec<_>>();

        if values.is_empty() {
            return Self {
                sources,
                mean: None,
                max_variance_percent: None,
            };
        }

        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let max = values.iter().copied().fold(f64::MIN, f64::max);
        let min = values.iter().copied().fold(f64::MAX, f64::min);
        let max_variance_percent = (mean > 0.0).then(|| (max - min) / mean * 100.0);

        Self {
            sources,
            mean: Some(mean),
            max_variance_percent,
        }
    }
}
