use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Deserialize;

use crate::adapters::Upstream;
use crate::cache::CacheMode;
use crate::data_source::{DataSource, SourceError, SourceFuture};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::provider_policy::ttl;
use crate::{Address, Chain, ProviderId};

const COINS_URL: &str = "https://coins.llama.fi";
const API_URL: &str = "https://api.llama.fi";

/// DeFi aggregator: coin prices, chain TVL and protocol TVL. Keyless.
#[derive(Clone)]
pub struct DefillamaAdapter {
    upstream: Upstream,
}

/// One entry of `/prices/current/{coins}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DefillamaCoinPrice {
    pub price: f64,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub timestamp: Option<u64>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CoinPrices {
    coins: HashMap<String, DefillamaCoinPrice>,
}

/// One row of `/v2/chains`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DefillamaChainTvl {
    pub name: String,
    pub tvl: f64,
    #[serde(default, rename = "tokenSymbol")]
    pub token_symbol: Option<String>,
}

/// One point of a protocol's historical TVL series.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DefillamaTvlPoint {
    pub date: i64,
    #[serde(rename = "totalLiquidityUSD")]
    pub total_liquidity_usd: f64,
}

/// The parts of `/protocol/{slug}` the router uses.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DefillamaProtocol {
    pub name: String,
    #[serde(default, rename = "currentChainTvls")]
    pub current_chain_tvls: BTreeMap<String, f64>,
    #[serde(default)]
    pub tvl: Vec<DefillamaTvlPoint>,
}

impl Default for DefillamaAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()))
    }
}

impl DefillamaAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            upstream: Upstream::new(ProviderId::Defillama, http_client),
        }
    }

    /// Price by market-data coin id, via the `coingecko:<id>` coin key.
    pub async fn coin_price(&self, coin_id: &str) -> Result<DefillamaCoinPrice, SourceError> {
        self.coin_price_with(coin_id, CacheMode::Use).await
    }

    pub async fn coin_price_with(
        &self,
        coin_id: &str,
        mode: CacheMode,
    ) -> Result<DefillamaCoinPrice, SourceError> {
        self.price_for_key(&format!("coingecko:{coin_id}"), mode)
            .await
    }

    /// Price by contract, via the `<chain>:<address>` coin key.
    pub async fn token_price(
        &self,
        chain: Chain,
        address: &Address,
    ) -> Result<DefillamaCoinPrice, SourceError> {
        self.price_for_key(&format!("{}:{address}", chain.defillama_key()), CacheMode::Use)
            .await
    }

    /// Current TVL of every chain DefiLlama tracks.
    pub async fn chains(&self) -> Result<Vec<DefillamaChainTvl>, SourceError> {
        self.upstream
            .fetch_json(
                HttpRequest::get(format!("{API_URL}/v2/chains")),
                ttl::TVL,
                CacheMode::Use,
            )
            .await
    }

    pub async fn protocol(&self, slug: &str) -> Result<DefillamaProtocol, SourceError> {
        let slug = slug.trim().to_ascii_lowercase();
        if slug.is_empty() {
            return Err(SourceError::invalid_request("protocol slug cannot be empty"));
        }

        self.upstream
            .fetch_json(
                HttpRequest::get(format!("{API_URL}/protocol/{}", urlencoding::encode(&slug))),
                ttl::TVL,
                CacheMode::Use,
            )
            .await
    }

    async fn price_for_key(
        &self,
        key: &str,
        mode: CacheMode,
    ) -> Result<DefillamaCoinPrice, SourceError> {
        let mut prices: CoinPrices = self
            .upstream
            .fetch_json(
                HttpRequest::get(format!("{COINS_URL}/prices/current/{key}")),
                ttl::PRICE,
                mode,
            )
            .await?;

        let found = prices.coins.remove(key).or_else(|| {
            prices
                .coins
                .into_iter()
                .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
                .map(|(_, price)| price)
        });

        found.ok_or_else(|| SourceError::invalid_response(format!("defillama has no price for '{key}'")))
    }
}

impl DataSource for DefillamaAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Defillama
    }

    fn probe<'a>(&'a self) -> SourceFuture<'a, ()> {
        Box::pin(async move {
            self.price_for_key("coingecko:ethereum", CacheMode::Bypass)
                .await
                .map(|_| ())
        })
    }
}
