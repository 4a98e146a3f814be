//! Smart routing across redundant providers.
//!
//! A [`Router`] owns one adapter per provider, one [`CircuitBreakerRegistry`]
//! shared by every operation, and a [`FallbackExecutor`]. Each public
//! operation builds its ordered provider list, runs it through the executor
//! and reports which provider answered.
//!
//! | Operation | Provider order |
//! |-----------|----------------|
//! | price (name) | coingecko, defillama |
//! | price (contract) | defillama, coingecko |
//! | ETH price | etherscan (when keyed), coingecko, defillama |
//! | L2 TVL | growthepie, defillama |
//! | protocol TVL | defillama |
//! | blob stats | blobscan, growthepie |
//! | on-chain reads | rpc (when configured and chain-matched), etherscan (when keyed) |
//! | query results | dune |

mod diagnostics;
mod market;
mod onchain;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::{
    BlobscanAdapter, CoingeckoAdapter, DefillamaAdapter, DuneAdapter, EtherscanAdapter,
    GrowthepieAdapter, RpcNodeAdapter,
};
use crate::circuit_breaker::{CircuitBreakerConfig, CircuitBreakerRegistry};
use crate::config::ChainscopeConfig;
use crate::data_source::{SourceError, SourceFuture};
use crate::fallback::{
    FallbackExecutor, ProviderAttempt, RouteError, Validator, DEFAULT_ATTEMPT_TIMEOUT,
};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::{ProviderId, Routed, ValidationError};

/// Routing entry point.
pub struct Router {
    executor: FallbackExecutor,
    etherscan: EtherscanAdapter,
    coingecko: CoingeckoAdapter,
    defillama: DefillamaAdapter,
    growthepie: GrowthepieAdapter,
    blobscan: BlobscanAdapter,
    dune: DuneAdapter,
    rpc: Option<RpcNodeAdapter>,
}

impl Router {
    /// Builds a router from `CHAINSCOPE_*` environment variables.
    pub fn from_env() -> Result<Self, ValidationError> {
        let config = ChainscopeConfig::from_env()?;
        Ok(RouterBuilder::from_config(&config).build())
    }

    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        self.executor.breakers()
    }

    async fn route<'a, T>(
        &self,
        attempts: Vec<ProviderAttempt<'a, T>>,
        validate: Option<Validator<T>>,
    ) -> Result<Routed<T>, RouteError> {
        let outcome = self.executor.execute(attempts, validate).await?;
        let source = outcome.source_name.parse::<ProviderId>()?;

        Ok(Routed {
            data: outcome.value,
            source,
            fallbacks_used: outcome.fallback_index,
        })
    }
}

/// Wraps a not-yet-polled provider call as a named attempt.
fn attempt<'a, T, F>(provider: ProviderId, call: F) -> ProviderAttempt<'a, T>
where
    F: Future<Output = Result<T, SourceError>> + Send + 'a,
{
    ProviderAttempt::new(provider.as_str(), move || -> SourceFuture<'a, T> {
        Box::pin(call)
    })
}

/// Builder for [`Router`].
///
/// | Setting | Environment variable | Fallback variable |
/// |---------|---------------------|-------------------|
/// | Etherscan key | `CHAINSCOPE_ETHERSCAN_API_KEY` | `ETHERSCAN_API_KEY` |
/// | CoinGecko key | `CHAINSCOPE_COINGECKO_API_KEY` | `COINGECKO_API_KEY` |
/// | Dune key | `CHAINSCOPE_DUNE_API_KEY` | `DUNE_API_KEY` |
/// | Node URL | `CHAINSCOPE_RPC_URL` | `RPC_URL` |
/// | Node chain id | `CHAINSCOPE_RPC_CHAIN_ID` | `RPC_CHAIN_ID` |
///
/// ```rust,ignore
/// use chainscope_core::RouterBuilder;
///
/// let router = RouterBuilder::new()
///     .with_etherscan_key("...")
///     .with_rpc_node("http://127.0.0.1:8545", Some(1))
///     .build();
/// ```
pub struct RouterBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    etherscan_api_key: Option<String>,
    coingecko_api_key: Option<String>,
    dune_api_key: Option<String>,
    rpc_url: Option<String>,
    rpc_chain_id: Option<u64>,
    circuit_breaker: CircuitBreakerConfig,
    breakers: Option<Arc<CircuitBreakerRegistry>>,
    attempt_timeout: Duration,
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self {
            http_client: None,
            etherscan_api_key: None,
            coingecko_api_key: None,
            dune_api_key: None,
            rpc_url: None,
            rpc_chain_id: None,
            circuit_breaker: CircuitBreakerConfig::default(),
            breakers: None,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    pub fn from_config(config: &ChainscopeConfig) -> Self {
        let mut builder = Self::new()
            .with_circuit_breaker(config.circuit_breaker)
            .with_attempt_timeout(config.attempt_timeout);
        builder.etherscan_api_key = config.etherscan_api_key.clone();
        builder.coingecko_api_key = config.coingecko_api_key.clone();
        builder.dune_api_key = config.dune_api_key.clone();
        builder.rpc_url = config.rpc_url.clone();
        builder.rpc_chain_id = config.rpc_chain_id;
        builder
    }

    /// Transport shared by every adapter. Defaults to reqwest.
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn with_etherscan_key(mut self, key: impl Into<String>) -> Self {
        self.etherscan_api_key = Some(key.into());
        self
    }

    pub fn with_coingecko_key(mut self, key: impl Into<String>) -> Self {
        self.coingecko_api_key = Some(key.into());
        self
    }

    pub fn with_dune_key(mut self, key: impl Into<String>) -> Self {
        self.dune_api_key = Some(key.into());
        self
    }

    pub fn with_rpc_node(mut self, url: impl Into<String>, chain_id: Option<u64>) -> Self {
        self.rpc_url = Some(url.into());
        self.rpc_chain_id = chain_id;
        self
    }

    pub fn with_circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = config;
        self
    }

    /// Shares an existing breaker table, e.g. between routers for one tenant.
    pub fn with_breaker_registry(mut self, breakers: Arc<CircuitBreakerRegistry>) -> Self {
        self.breakers = Some(breakers);
        self
    }

    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    pub fn build(self) -> Router {
        let http_client = self
            .http_client
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));
        let breakers = self
            .breakers
            .unwrap_or_else(|| Arc::new(CircuitBreakerRegistry::new(self.circuit_breaker)));

        let rpc = self
            .rpc_url
            .filter(|url| !url.trim().is_empty())
            .map(|url| RpcNodeAdapter::with_http_client(http_client.clone(), url, self.rpc_chain_id));

        Router {
            executor: FallbackExecutor::new(breakers).with_attempt_timeout(self.attempt_timeout),
            etherscan: EtherscanAdapter::with_http_client(
                http_client.clone(),
                self.etherscan_api_key,
            ),
            coingecko: CoingeckoAdapter::with_http_client(
                http_client.clone(),
                self.coingecko_api_key,
            ),
            defillama: DefillamaAdapter::with_http_client(http_client.clone()),
            growthepie: GrowthepieAdapter::with_http_client(http_client.clone()),
            blobscan: BlobscanAdapter::with_http_client(http_client.clone()),
            dune: DuneAdapter::with_http_client(http_client.clone(), self.dune_api_key),
            rpc,
        }
    }
}
