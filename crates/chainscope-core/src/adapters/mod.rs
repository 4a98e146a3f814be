//! Upstream provider adapters.
//!
//! Every adapter owns an [`Upstream`]: the shared fetch path that serves fresh
//! cache entries, spends local rate budget, applies the provider's transport
//! timeout and maps HTTP status and body failures into [`SourceError`].

mod blobscan;
mod coingecko;
mod defillama;
mod dune;
mod etherscan;
mod growthepie;
mod rpc_node;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::cache::{CacheMode, CacheStore};
use crate::data_source::SourceError;
use crate::http_client::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use crate::provider_policy::ProviderPolicy;
use crate::throttling::Throttle;
use crate::ProviderId;

pub use blobscan::{BlobscanAdapter, BlobscanBlob, BlobscanBlobs, RECENT_BLOB_PAGE};
pub use coingecko::{CoingeckoAdapter, CoingeckoQuote};
pub use defillama::{
    DefillamaAdapter, DefillamaChainTvl, DefillamaCoinPrice, DefillamaProtocol, DefillamaTvlPoint,
};
pub use dune::{DuneAdapter, DuneQueryResults};
pub use etherscan::{EtherscanAdapter, EtherscanEthPrice, MAX_MULTI_BALANCE_ADDRESSES};
pub use growthepie::{GrowthepieAdapter, GrowthepieMetric};
pub use rpc_node::RpcNodeAdapter;

/// Shared fetch path for one provider.
#[derive(Clone)]
pub(crate) struct Upstream {
    provider_id: ProviderId,
    http_client: Arc<dyn HttpClient>,
    cache: CacheStore,
    throttle: Throttle,
    policy: ProviderPolicy,
}

impl Upstream {
    pub(crate) fn new(provider_id: ProviderId, http_client: Arc<dyn HttpClient>) -> Self {
        Self::with_policy(http_client, ProviderPolicy::default_for(provider_id))
    }

    pub(crate) fn with_policy(http_client: Arc<dyn HttpClient>, policy: ProviderPolicy) -> Self {
        Self {
            provider_id: policy.provider_id,
            http_client,
            cache: CacheStore::default(),
            throttle: Throttle::from_policy(&policy),
            policy,
        }
    }

    #[cfg(test)]
    pub(crate) fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Fetches and deserializes `request`, caching the raw body for `ttl`.
    pub(crate) async fn fetch_json<T>(
        &self,
        request: HttpRequest,
        ttl: Duration,
        mode: CacheMode,
    ) -> Result<T, SourceError>
    where
        T: DeserializeOwned,
    {
        let key = cache_key(&request);
        if mode.reads() {
            if let Some(body) = self.cache.get(&key).await {
                tracing::trace!(provider = %self.provider_id, "serving cached response");
                return self.parse(&body);
            }
        }

        let response = self.send(request).await?;
        self.ensure_success(&response)?;
        let value = self.parse(&response.body)?;

        if mode.writes() {
            self.cache.put(key, response.body, ttl).await;
        }

        Ok(value)
    }

    /// Sends `request` without touching the cache or checking the status.
    pub(crate) async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SourceError> {
        self.throttle.acquire_or_fail()?;
        let request = request.with_timeout_ms(self.policy.request_timeout_ms());

        self.http_client
            .execute(request)
            .await
            .map_err(|error| SourceError::from_transport(self.provider_id, &error))
    }

    pub(crate) fn ensure_success(&self, response: &HttpResponse) -> Result<(), SourceError> {
        if response.is_rate_limited() {
            return Err(SourceError::rate_limited(format!(
                "{} returned status 429",
                self.provider_id
            )));
        }

        if !response.is_success() {
            return Err(SourceError::unavailable(format!(
                "{} returned status {}",
                self.provider_id, response.status
            )));
        }

        Ok(())
    }

    fn parse<T>(&self, body: &str) -> Result<T, SourceError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str(body).map_err(|error| {
            SourceError::invalid_response(format!(
                "failed to parse {} response: {error}",
                self.provider_id
            ))
        })
    }
}

fn cache_key(request: &HttpRequest) -> String {
    match (request.method, request.body.as_deref()) {
        (HttpMethod::Post, Some(body)) => format!("POST {}\n{body}", request.url),
        _ => format!("GET {}", request.url),
    }
}


#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::test_support::RecordingHttpClient;
    use super::*;
    use crate::data_source::SourceErrorKind;

    #[derive(Debug, Deserialize)]
    struct Pong {
        ok: bool,
    }

    #[tokio::test]
    async fn caches_successful_bodies_for_the_ttl() {
        let client = Arc::new(RecordingHttpClient::new().respond("/ping", r#"{"ok":true}"#));
        let upstream = Upstream::new(ProviderId::Defillama, client.clone());

        for _ in 0..2 {
            let pong: Pong = upstream
                .fetch_json(
                    HttpRequest::get("https://api.test/ping"),
                    Duration::from_secs(30),
                    CacheMode::Use,
                )
                .await
                .expect("fetch succeeds");
            assert!(pong.ok);
        }

        assert_eq!(client.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn bypass_mode_always_hits_the_network() {
        let client = Arc::new(RecordingHttpClient::new().respond("/ping", r#"{"ok":true}"#));
        let upstream = Upstream::new(ProviderId::Defillama, client.clone());

        for _ in 0..2 {
            let _: Pong = upstream
                .fetch_json(
                    HttpRequest::get("https://api.test/ping"),
                    Duration::from_secs(30),
                    CacheMode::Bypass,
                )
                .await
                .expect("fetch succeeds");
        }

        assert_eq!(client.recorded_requests().len(), 2);
        assert!(upstream.cache().is_empty().await);
    }

    #[tokio::test]
    async fn maps_status_codes_to_error_kinds() {
        let client = Arc::new(
            RecordingHttpClient::new()
                .respond_status("/limited", 429)
                .respond_status("/down", 503),
        );
        let upstream = Upstream::new(ProviderId::Coingecko, client);

        let limited = upstream
            .fetch_json::<Pong>(
                HttpRequest::get("https://api.test/limited"),
                Duration::ZERO,
                CacheMode::Use,
            )
            .await
            .expect_err("429 fails");
        assert_eq!(limited.kind(), SourceErrorKind::RateLimited);

        let down = upstream
            .fetch_json::<Pong>(
                HttpRequest::get("https://api.test/down"),
                Duration::ZERO,
                CacheMode::Use,
            )
            .await
            .expect_err("503 fails");
        assert_eq!(down.kind(), SourceErrorKind::Unavailable);
        assert_eq!(down.message(), "coingecko returned status 503");
    }

    #[tokio::test]
    async fn malformed_bodies_are_invalid_responses() {
        let client = Arc::new(RecordingHttpClient::new().respond("/ping", "<html>"));
        let upstream = Upstream::new(ProviderId::Blobscan, client);

        let error = upstream
            .fetch_json::<Pong>(
                HttpRequest::get("https://api.test/ping"),
                Duration::from_secs(30),
                CacheMode::Use,
            )
            .await
            .expect_err("html is not json");
        assert_eq!(error.kind(), SourceErrorKind::InvalidResponse);
    }

    #[tokio::test]
    async fn transport_failures_name_the_provider() {
        let client = Arc::new(RecordingHttpClient::new().fail("/ping", "connection refused"));
        let upstream = Upstream::new(ProviderId::Growthepie, client);

        let error = upstream
            .fetch_json::<Pong>(
                HttpRequest::get("https://api.test/ping"),
                Duration::from_secs(30),
                CacheMode::Use,
            )
            .await
            .expect_err("transport fails");
        assert_eq!(error.kind(), SourceErrorKind::Unavailable);
        assert_eq!(
            error.message(),
            "growthepie transport error: connection refused"
        );
    }

    #[test]
    fn post_cache_keys_include_the_body() {
        let a = HttpRequest::post_json("https://node.test", &serde_json::json!({"id": 1}));
        let b = HttpRequest::post_json("https://node.test", &serde_json::json!({"id": 2}));
        assert_ne!(cache_key(&a), cache_key(&b));
    }
}
