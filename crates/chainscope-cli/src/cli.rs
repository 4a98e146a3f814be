//! CLI argument definitions for chainscope.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `price` | Routed spot price for a token name or contract |
//! | `eth-price` | Routed ETH/USD price |
//! | `l2-tvl` | Routed TVL for an L2 or L1 chain |
//! | `protocol-tvl` | TVL for one DeFi protocol |
//! | `blobs` | Recent blob statistics |
//! | `balance` | Native balance of one or more addresses |
//! | `block-number` | Latest block height |
//! | `block` | Block by tag |
//! | `tx` | Transaction by hash |
//! | `receipt` | Transaction receipt by hash |
//! | `code` | Contract bytecode |
//! | `tx-count` | Account nonce |
//! | `gas-price` | Current gas price in wei |
//! | `query` | Latest stored result of a saved Dune query |
//! | `health` | Probe every configured provider |
//! | `compare` | ETH price from every provider side by side |
//!
//! # Examples
//!
//! ```bash
//! chainscope price usdc --pretty
//! chainscope price 0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48 --chain ethereum
//! chainscope l2-tvl Arbitrum
//! CHAINSCOPE_LOG=debug chainscope balance 0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045
//! ```

use chainscope_core::{BlockTag, Chain};
use clap::{Args, Parser, Subcommand};

/// Smart-routed blockchain and DeFi data.
#[derive(Debug, Parser)]
#[command(
    name = "chainscope",
    author,
    version,
    about = "Smart-routed blockchain and DeFi data",
    long_about = "chainscope answers market, TVL, blob and on-chain queries from several \
redundant providers, falling back when one fails and skipping providers whose circuit is open.\n\
\n\
Provider keys are read from CHAINSCOPE_ETHERSCAN_API_KEY, CHAINSCOPE_COINGECKO_API_KEY, \
CHAINSCOPE_DUNE_API_KEY and CHAINSCOPE_RPC_URL (unprefixed names also work)."
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Per-provider attempt timeout in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Spot price for a token name, symbol or contract address.
    Price(PriceArgs),
    /// ETH/USD price.
    EthPrice,
    /// Total value locked on an L2 or L1 chain.
    L2Tvl(L2TvlArgs),
    /// Total value locked in a DeFi protocol.
    ProtocolTvl(ProtocolTvlArgs),
    /// Recent EIP-4844 blob statistics.
    Blobs,
    /// Native balance of one or more addresses.
    Balance(BalanceArgs),
    /// Latest block height.
    BlockNumber(ChainArgs),
    /// Block by tag or number.
    Block(BlockArgs),
    /// Transaction by hash.
    Tx(HashArgs),
    /// Transaction receipt by hash.
    Receipt(HashArgs),
    /// Contract bytecode at an address.
    Code(AddressArgs),
    /// Number of transactions sent from an address.
    TxCount(AddressArgs),
    /// Current gas price in wei.
    GasPrice(ChainArgs),
    /// Latest stored result of a saved Dune query.
    Query(QueryArgs),
    /// Probe every configured provider.
    Health,
    /// Compare the ETH price across every provider.
    Compare,
}

#[derive(Debug, Args)]
pub struct PriceArgs {
    /// Token id, symbol (eth, usdc) or 0x contract address.
    pub token: String,

    /// Chain for contract lookups.
    #[arg(long, default_value_t = Chain::Ethereum)]
    pub chain: Chain,
}

#[derive(Debug, Args)]
pub struct L2TvlArgs {
    /// Chain name, matched case-insensitively (e.g. Arbitrum, base).
    pub chain: String,
}

#[derive(Debug, Args)]
pub struct ProtocolTvlArgs {
    /// DefiLlama protocol slug (e.g. aave, uniswap).
    pub slug: String,
}

#[derive(Debug, Args)]
pub struct ChainArgs {
    /// Target chain. Defaults to the node's chain, then Ethereum.
    #[arg(long)]
    pub chain: Option<Chain>,
}

#[derive(Debug, Args)]
pub struct BalanceArgs {
    /// One or more 0x addresses (up to 20).
    #[arg(required = true, num_args = 1..)]
    pub addresses: Vec<String>,

    #[command(flatten)]
    pub chain: ChainArgs,

    /// Block tag: latest, earliest, pending or a block number.
    #[arg(long, default_value = "latest")]
    pub block: BlockTag,
}

#[derive(Debug, Args)]
pub struct BlockArgs {
    /// Block tag: latest, earliest, pending or a block number.
    #[arg(default_value = "latest")]
    pub tag: BlockTag,

    /// Include full transaction objects.
    #[arg(long, default_value_t = false)]
    pub full: bool,

    #[command(flatten)]
    pub chain: ChainArgs,
}

#[derive(Debug, Args)]
pub struct HashArgs {
    /// 0x transaction hash.
    pub hash: String,

    #[command(flatten)]
    pub chain: ChainArgs,
}

#[derive(Debug, Args)]
pub struct AddressArgs {
    /// 0x address.
    pub address: String,

    #[command(flatten)]
    pub chain: ChainArgs,

    /// Block tag: latest, earliest, pending or a block number.
    #[arg(long, default_value = "latest")]
    pub block: BlockTag,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Saved query id.
    pub query_id: u64,

    /// Maximum number of rows to return.
    #[arg(long)]
    pub limit: Option<usize>,
}
