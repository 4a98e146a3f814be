use crate::adapters::{DuneQueryResults, GrowthepieMetric};
use crate::cache::CacheMode;
use crate::data_source::{DataSource, SourceFuture};
use crate::fallback::{ProviderAttempt, RouteError};
use crate::normalize::{self, RawBlobStats, RawPrice, RawTvl};
use crate::routing::{attempt, Router};
use crate::{
    Chain, NormalizedBlobStats, NormalizedPrice, NormalizedTvl, ProviderId, Routed, TokenQuery,
    ValidationError,
};

/// Coin id every price provider uses for ether.
const ETHER_COIN_ID: &str = "ethereum";

impl Router {
    /// Routed spot price for a token name or a contract address on `chain`.
    pub async fn price(
        &self,
        token: &str,
        chain: Chain,
    ) -> Result<Routed<NormalizedPrice>, RouteError> {
        let query = TokenQuery::parse(token, chain)?;
        self.price_for(&query).await
    }

    /// Names are best known to CoinGecko; contracts to DefiLlama.
    pub async fn price_for(
        &self,
        query: &TokenQuery,
    ) -> Result<Routed<NormalizedPrice>, RouteError> {
        let attempts = match query {
            TokenQuery::Name(coin_id) => vec![
                attempt(ProviderId::Coingecko, async move {
                    normalize::price(RawPrice::Coingecko(
                        self.coingecko.simple_price(coin_id).await?,
                    ))
                }),
                attempt(ProviderId::Defillama, async move {
                    normalize::price(RawPrice::Defillama(
                        self.defillama.coin_price(coin_id).await?,
                    ))
                }),
            ],
            TokenQuery::Contract { chain, address } => vec![
                attempt(ProviderId::Defillama, async move {
                    normalize::price(RawPrice::Defillama(
                        self.defillama.token_price(*chain, address).await?,
                    ))
                }),
                attempt(ProviderId::Coingecko, async move {
                    normalize::price(RawPrice::Coingecko(
                        self.coingecko.token_price(*chain, address).await?,
                    ))
                }),
            ],
        };

        self.route(attempts, Some(normalize::validate_price)).await
    }

    /// Routed ETH/USD price. The explorer leads when it has a key.
    pub async fn eth_price(&self) -> Result<Routed<NormalizedPrice>, RouteError> {
        let attempts = self
            .eth_price_calls(CacheMode::Use)
            .into_iter()
            .map(|(provider, call)| ProviderAttempt::new(provider.as_str(), move || call))
            .collect::<Vec<_>>();

        self.route(attempts, Some(normalize::validate_price)).await
    }

    /// Every configured ETH price provider, in routing order.
    pub(super) fn eth_price_calls(
        &self,
        mode: CacheMode,
    ) -> Vec<(ProviderId, SourceFuture<'_, NormalizedPrice>)> {
        let mut calls: Vec<(ProviderId, SourceFuture<'_, NormalizedPrice>)> = Vec::with_capacity(3);

        if self.etherscan.is_configured() {
            calls.push((
                ProviderId::Etherscan,
                Box::pin(async move {
                    normalize::price(RawPrice::Etherscan(self.etherscan.eth_price_with(mode).await?))
                }),
            ));
        }
        calls.push((
            ProviderId::Coingecko,
            Box::pin(async move {
                normalize::price(RawPrice::Coingecko(
                    self.coingecko.simple_price_with(ETHER_COIN_ID, mode).await?,
                ))
            }),
        ));
        calls.push((
            ProviderId::Defillama,
            Box::pin(async move {
                normalize::price(RawPrice::Defillama(
                    self.defillama.coin_price_with(ETHER_COIN_ID, mode).await?,
                ))
            }),
        ));

        calls
    }

    /// Routed TVL of an L2 or L1 chain, matched case-insensitively by name.
    pub async fn l2_tvl(&self, chain: &str) -> Result<Routed<NormalizedTvl>, RouteError> {
        let chain = chain.trim();
        if chain.is_empty() {
            return Err(ValidationError::EmptyChain.into());
        }

        let attempts = vec![
            attempt(ProviderId::Growthepie, async move {
                normalize::tvl(RawTvl::GrowthepieMetrics {
                    chain: chain.to_owned(),
                    rows: self.growthepie.metric(GrowthepieMetric::TVL).await?,
                })
            }),
            attempt(ProviderId::Defillama, async move {
                normalize::tvl(RawTvl::DefillamaChains {
                    chain: chain.to_owned(),
                    chains: self.defillama.chains().await?,
                })
            }),
        ];

        self.route(attempts, Some(normalize::validate_tvl)).await
    }

    /// TVL of one DeFi protocol by its DefiLlama slug. No fallback exists.
    pub async fn protocol_tvl(&self, slug: &str) -> Result<Routed<NormalizedTvl>, RouteError> {
        let slug = slug.trim().to_ascii_lowercase();
        if slug.is_empty() {
            return Err(ValidationError::EmptyProtocol.into());
        }

        let slug = slug.as_str();
        let attempts = vec![attempt(ProviderId::Defillama, async move {
            normalize::tvl(RawTvl::DefillamaProtocol(
                self.defillama.protocol(slug).await?,
            ))
        })];

        self.route(attempts, Some(normalize::validate_tvl)).await
    }

    /// Recent EIP-4844 blob statistics.
    pub async fn blob_stats(&self) -> Result<Routed<NormalizedBlobStats>, RouteError> {
        let attempts = vec![
            attempt(ProviderId::Blobscan, async move {
                normalize::blob_stats(RawBlobStats::Blobscan(self.blobscan.recent_blobs().await?))
            }),
            attempt(ProviderId::Growthepie, async move {
                normalize::blob_stats(RawBlobStats::GrowthepieBlobCounts(
                    self.growthepie.metric(GrowthepieMetric::BLOB_COUNT).await?,
                ))
            }),
        ];

        self.route(attempts, Some(normalize::validate_blob_stats))
            .await
    }

    /// Latest stored result of a saved Dune query.
    pub async fn query_results(
        &self,
        query_id: u64,
        limit: Option<usize>,
    ) -> Result<Routed<DuneQueryResults>, RouteError> {
        if query_id == 0 {
            return Err(ValidationError::InvalidQueryId {
                value: query_id.to_string(),
            }
            .into());
        }

        if !self.dune.is_configured() {
            return Err(RouteError::not_configured(
                "query results require DUNE_API_KEY (or CHAINSCOPE_DUNE_API_KEY)",
            ));
        }

        let attempts = vec![attempt(ProviderId::Dune, async move {
            self.dune.latest_results(query_id, limit).await
        })];

        self.route(attempts, None).await
    }
}
