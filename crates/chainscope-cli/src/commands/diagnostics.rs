use chainscope_core::Router;

use crate::error::CliError;

use super::CommandResult;

pub async fn health(router: &Router) -> Result<CommandResult, CliError> {
    let report = router.check_health().await;
    let unhealthy = report.sources.len() - report.healthy_count();

    let result = CommandResult::ok(serde_json::to_value(&report)?);
    if unhealthy > 0 {
        return Ok(result.with_warning(format!("{unhealthy} provider(s) failed their probe")));
    }
    Ok(result)
}

pub async fn compare(router: &Router) -> Result<CommandResult, CliError> {
    let comparison = router.compare_eth_price().await;
    Ok(CommandResult::ok(serde_json::to_value(&comparison)?))
}
