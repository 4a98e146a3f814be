mod diagnostics;
mod market;
mod onchain;

use std::time::{Duration, Instant};

use chainscope_core::{
    ChainscopeConfig, Envelope, EnvelopeError, EnvelopeMeta, ProviderId, RouteError, Routed,
    Router, RouterBuilder,
};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub struct CommandResult {
    pub data: Value,
    pub route: Option<(ProviderId, usize)>,
    pub warnings: Vec<String>,
}

impl CommandResult {
    /// Aggregate result with no single answering provider.
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            route: None,
            warnings: Vec::new(),
        }
    }

    pub fn routed<T: Serialize>(routed: Routed<T>) -> Result<Self, CliError> {
        Ok(Self {
            data: serde_json::to_value(&routed.data)?,
            route: Some((routed.source, routed.fallbacks_used)),
            warnings: Vec::new(),
        })
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let config = ChainscopeConfig::from_env()?;
    let mut builder = RouterBuilder::from_config(&config);
    if let Some(timeout_ms) = cli.timeout_ms {
        builder = builder.with_attempt_timeout(Duration::from_millis(timeout_ms.max(1)));
    }
    let router = builder.build();

    let started = Instant::now();
    let outcome = dispatch(&cli.command, &router).await;
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    tracing::debug!(latency_ms, ok = outcome.is_ok(), "command finished");

    let mut meta = EnvelopeMeta::new(Uuid::new_v4().to_string(), latency_ms)?;

    match outcome {
        Ok(result) => {
            if let Some((source, fallbacks_used)) = result.route {
                meta = meta.with_route(source, fallbacks_used);
            }
            for warning in result.warnings {
                meta.push_warning(warning);
            }
            Ok(Envelope::success(meta, result.data))
        }
        Err(CliError::Route(error @ (RouteError::Exhausted { .. } | RouteError::NoProviders))) => {
            let mut envelope = Envelope::success(meta, Value::Null);
            for entry in EnvelopeError::from_route_error(&error) {
                envelope.push_error(entry);
            }
            eprintln!("error: {error}");
            Ok(envelope)
        }
        Err(error) => Err(error),
    }
}

async fn dispatch(command: &Command, router: &Router) -> Result<CommandResult, CliError> {
    match command {
        Command::Price(args) => market::price(args, router).await,
        Command::EthPrice => market::eth_price(router).await,
        Command::L2Tvl(args) => market::l2_tvl(args, router).await,
        Command::ProtocolTvl(args) => market::protocol_tvl(args, router).await,
        Command::Blobs => market::blob_stats(router).await,
        Command::Query(args) => market::query(args, router).await,
        Command::Balance(args) => onchain::balance(args, router).await,
        Command::BlockNumber(args) => onchain::block_number(args, router).await,
        Command::Block(args) => onchain::block(args, router).await,
        Command::Tx(args) => onchain::transaction(args, router).await,
        Command::Receipt(args) => onchain::receipt(args, router).await,
        Command::Code(args) => onchain::code(args, router).await,
        Command::TxCount(args) => onchain::transaction_count(args, router).await,
        Command::GasPrice(args) => onchain::gas_price(args, router).await,
        Command::Health => diagnostics::health(router).await,
        Command::Compare => diagnostics::compare(router).await,
    }
}
