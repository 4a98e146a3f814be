use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::adapters::Upstream;
use crate::cache::CacheMode;
use crate::data_source::{DataSource, SourceError, SourceFuture};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, ReqwestHttpClient};
use crate::provider_policy::ttl;
use crate::{Address, Chain, ProviderId};

const BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Token market-data service. Works keyless; a demo key raises the quota.
#[derive(Clone)]
pub struct CoingeckoAdapter {
    upstream: Upstream,
    auth: HttpAuth,
}

/// One entry of `/simple/price` or `/simple/token_price`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CoingeckoQuote {
    #[serde(default)]
    pub usd: Option<f64>,
    #[serde(default)]
    pub usd_24h_change: Option<f64>,
    #[serde(default)]
    pub usd_market_cap: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Ping {
    gecko_says: String,
}

impl Default for CoingeckoAdapter {
    fn default() -> Self {
        Self::new(None)
    }
}

impl CoingeckoAdapter {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()), api_key)
    }

    pub fn with_http_client(http_client: Arc<dyn HttpClient>, api_key: Option<String>) -> Self {
        let auth = match api_key.filter(|key| !key.trim().is_empty()) {
            Some(key) => HttpAuth::Header {
                name: String::from("x-cg-demo-api-key"),
                value: key,
            },
            None => HttpAuth::None,
        };

        Self {
            upstream: Upstream::new(ProviderId::Coingecko, http_client),
            auth,
        }
    }

    /// Spot price for a coin id such as `ethereum` or `usd-coin`.
    pub async fn simple_price(&self, coin_id: &str) -> Result<CoingeckoQuote, SourceError> {
        self.simple_price_with(coin_id, CacheMode::Use).await
    }

    pub async fn simple_price_with(
        &self,
        coin_id: &str,
        mode: CacheMode,
    ) -> Result<CoingeckoQuote, SourceError> {
        let url = format!(
            "{BASE_URL}/simple/price?ids={}&vs_currencies=usd&include_24hr_change=true&include_market_cap=true",
            urlencoding::encode(coin_id)
        );

        let mut quotes: HashMap<String, CoingeckoQuote> = self
            .upstream
            .fetch_json(self.request(url), ttl::PRICE, mode)
            .await?;

        quotes.remove(coin_id).ok_or_else(|| {
            SourceError::invalid_response(format!("coingecko has no price for '{coin_id}'"))
        })
    }

    /// Spot price for a token contract on `chain`.
    pub async fn token_price(
        &self,
        chain: Chain,
        address: &Address,
    ) -> Result<CoingeckoQuote, SourceError> {
        let url = format!(
            "{BASE_URL}/simple/token_price/{}?contract_addresses={address}&vs_currencies=usd&include_24hr_change=true&include_market_cap=true",
            chain.coingecko_platform()
        );

        let quotes: HashMap<String, CoingeckoQuote> = self
            .upstream
            .fetch_json(self.request(url), ttl::PRICE, CacheMode::Use)
            .await?;

        quotes
            .into_iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(address.as_str()))
            .map(|(_, quote)| quote)
            .ok_or_else(|| {
                SourceError::invalid_response(format!(
                    "coingecko has no price for {chain}:{address}"
                ))
            })
    }

    fn request(&self, url: String) -> HttpRequest {
        HttpRequest::get(url).with_auth(&self.auth)
    }
}

impl DataSource for CoingeckoAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Coingecko
    }

    fn probe<'a>(&'a self) -> SourceFuture<'a, ()> {
        Box::pin(async move {
            let ping: Ping = self
                .upstream
                .fetch_json(
                    self.request(format!("{BASE_URL}/ping")),
                    ttl::PRICE,
                    CacheMode::Bypass,
                )
                .await?;
            tracing::trace!(reply = %ping.gecko_says, "coingecko ping");
            Ok(())
        })
    }
}
