use chainscope_core::{Address, Router, TxHash};
use serde::Serialize;

use crate::cli::{AddressArgs, BalanceArgs, BlockArgs, ChainArgs, HashArgs};
use crate::error::CliError;

use super::CommandResult;

/// Quantities beyond `u64` are printed as decimal strings.
#[derive(Debug, Serialize)]
struct GasPrice {
    wei: String,
}

pub async fn balance(args: &BalanceArgs, router: &Router) -> Result<CommandResult, CliError> {
    let addresses = args
        .addresses
        .iter()
        .map(|raw| Address::parse(raw))
        .collect::<Result<Vec<_>, _>>()?;

    match addresses.as_slice() {
        [address] => CommandResult::routed(
            router
                .balance(address, args.chain.chain, args.block)
                .await?,
        ),
        many => CommandResult::routed(
            router
                .multi_balance(many, args.chain.chain, args.block)
                .await?,
        ),
    }
}

pub async fn block_number(args: &ChainArgs, router: &Router) -> Result<CommandResult, CliError> {
    CommandResult::routed(router.block_number(args.chain).await?)
}

pub async fn block(args: &BlockArgs, router: &Router) -> Result<CommandResult, CliError> {
    CommandResult::routed(router.block(args.tag, args.full, args.chain.chain).await?)
}

pub async fn transaction(args: &HashArgs, router: &Router) -> Result<CommandResult, CliError> {
    let hash = TxHash::parse(&args.hash)?;
    CommandResult::routed(router.transaction(&hash, args.chain.chain).await?)
}

pub async fn receipt(args: &HashArgs, router: &Router) -> Result<CommandResult, CliError> {
    let hash = TxHash::parse(&args.hash)?;
    CommandResult::routed(router.receipt(&hash, args.chain.chain).await?)
}

pub async fn code(args: &AddressArgs, router: &Router) -> Result<CommandResult, CliError> {
    let address = Address::parse(&args.address)?;
    CommandResult::routed(router.code(&address, args.chain.chain, args.block).await?)
}

pub async fn transaction_count(
    args: &AddressArgs,
    router: &Router,
) -> Result<CommandResult, CliError> {
    let address = Address::parse(&args.address)?;
    CommandResult::routed(
        router
            .transaction_count(&address, args.chain.chain, args.block)
            .await?,
    )
}

pub async fn gas_price(args: &ChainArgs, router: &Router) -> Result<CommandResult, CliError> {
    let routed = router.gas_price(args.chain).await?;
    CommandResult::routed(routed.map(|wei| GasPrice {
        wei: wei.to_string(),
    }))
}
