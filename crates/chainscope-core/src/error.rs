use thiserror::Error;

/// Validation and contract errors exposed by `chainscope-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("token query cannot be empty")]
    EmptyTokenQuery,
    #[error("chain name cannot be empty")]
    EmptyChain,
    #[error("protocol slug cannot be empty")]
    EmptyProtocol,
    #[error("unknown chain '{value}'")]
    UnknownChain { value: String },
    #[error("invalid source '{value}', expected one of etherscan, defillama, coingecko, growthepie, blobscan, dune, rpc")]
    InvalidSource { value: String },

    #[error("address must be 0x-prefixed and 42 characters: '{value}'")]
    InvalidAddress { value: String },
    #[error("transaction hash must be 0x-prefixed and 66 characters: '{value}'")]
    InvalidHash { value: String },
    #[error("hex data must be 0x-prefixed with an even number of hex digits: '{value}'")]
    InvalidHexData { value: String },
    #[error("block tag must be latest, earliest, pending or a block number: '{value}'")]
    InvalidBlockTag { value: String },
    #[error("hex quantity is malformed: '{value}'")]
    InvalidHexQuantity { value: String },
    #[error("multi-balance request must include between 1 and {max} addresses")]
    InvalidAddressCount { max: usize },

    #[error("query id must be a positive integer: '{value}'")]
    InvalidQueryId { value: String },

    #[error("request id must be at least 8 characters")]
    InvalidRequestId,

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("configuration value for '{key}' is invalid: '{value}'")]
    InvalidConfig { key: &'static str, value: String },
}

/// Top-level error type for core operations outside of routing.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
