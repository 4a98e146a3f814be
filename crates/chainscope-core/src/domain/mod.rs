//! # Domain Models
//!
//! Canonical types shared by every provider and the router.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`NormalizedPrice`] | Spot price with optional 24h change and market cap |
//! | [`NormalizedTvl`] | Total value locked with optional breakdown |
//! | [`NormalizedBlobStats`] | Recent blob count and average size |
//! | [`Routed`] | Any of the above plus the answering source and fallback count |
//! | [`TokenQuery`] | Name-or-contract price lookup target |
//! | [`Chain`] | Known EVM chains and their per-service identifiers |
//! | [`Address`] | Checked 20-byte hex address |
//! | [`UtcDateTime`] | UTC timestamp |

mod chain;
mod models;
mod timestamp;

pub use chain::Chain;
pub use models::{
    canonical_coin_id, looks_like_address, parse_hex_quantity, AccountBalance, Address, BlockTag,
    HealthReport, HexData, LogFilter, NormalizedBlobStats, NormalizedPrice, NormalizedTvl,
    PriceComparison, Routed, SourceHealth, SourceQuote, TokenQuery, TxHash,
};
pub use timestamp::UtcDateTime;
