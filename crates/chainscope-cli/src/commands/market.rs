use chainscope_core::Router;

use crate::cli::{L2TvlArgs, PriceArgs, ProtocolTvlArgs, QueryArgs};
use crate::error::CliError;

use super::CommandResult;

pub async fn price(args: &PriceArgs, router: &Router) -> Result<CommandResult, CliError> {
    CommandResult::routed(router.price(&args.token, args.chain).await?)
}

pub async fn eth_price(router: &Router) -> Result<CommandResult, CliError> {
    CommandResult::routed(router.eth_price().await?)
}

pub async fn l2_tvl(args: &L2TvlArgs, router: &Router) -> Result<CommandResult, CliError> {
    CommandResult::routed(router.l2_tvl(&args.chain).await?)
}

pub async fn protocol_tvl(
    args: &ProtocolTvlArgs,
    router: &Router,
) -> Result<CommandResult, CliError> {
    CommandResult::routed(router.protocol_tvl(&args.slug).await?)
}

pub async fn blob_stats(router: &Router) -> Result<CommandResult, CliError> {
    let result = CommandResult::routed(router.blob_stats().await?)?;
    if result.route.is_some_and(|(_, fallbacks_used)| fallbacks_used > 0) {
        return Ok(result.with_warning(
            "blob sizes are estimated from daily blob counts at 128 KiB per blob",
        ));
    }
    Ok(result)
}

pub async fn query(args: &QueryArgs, router: &Router) -> Result<CommandResult, CliError> {
    CommandResult::routed(router.query_results(args.query_id, args.limit).await?)
}
