use std::sync::Arc;

use serde::Deserialize;

use crate::adapters::Upstream;
use crate::cache::CacheMode;
use crate::data_source::{DataSource, SourceError, SourceFuture};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::provider_policy::ttl;
use crate::ProviderId;

const FUNDAMENTALS_URL: &str = "https://api.growthepie.xyz/v1/fundamentals.json";

/// L2 analytics service. The fundamentals export is one flat list of daily
/// `(metric_key, origin_key, date, value)` rows across every tracked chain.
#[derive(Clone)]
pub struct GrowthepieAdapter {
    upstream: Upstream,
}

/// One daily metric row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GrowthepieMetric {
    pub metric_key: String,
    pub origin_key: String,
    /// `YYYY-MM-DD`; sorts lexicographically by day.
    pub date: String,
    pub value: f64,
}

impl GrowthepieMetric {
    pub const TVL: &'static str = "tvl";
    pub const BLOB_COUNT: &'static str = "blob_count";
}

impl Default for GrowthepieAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()))
    }
}

impl GrowthepieAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            upstream: Upstream::new(ProviderId::Growthepie, http_client),
        }
    }

    pub async fn fundamentals(&self) -> Result<Vec<GrowthepieMetric>, SourceError> {
        self.fundamentals_with(CacheMode::Use).await
    }

    /// Rows for one metric only.
    pub async fn metric(&self, metric_key: &str) -> Result<Vec<GrowthepieMetric>, SourceError> {
        let rows = self.fundamentals().await?;
        Ok(rows
            .into_iter()
            .filter(|row| row.metric_key == metric_key)
            .collect())
    }

    async fn fundamentals_with(&self, mode: CacheMode) -> Result<Vec<GrowthepieMetric>, SourceError> {
        self.upstream
            .fetch_json(HttpRequest::get(FUNDAMENTALS_URL), ttl::TVL, mode)
            .await
    }
}

impl DataSource for GrowthepieAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Growthepie
    }

    fn probe<'a>(&'a self) -> SourceFuture<'a, ()> {
        Box::pin(async move {
            let rows = self.fundamentals_with(CacheMode::Bypass).await?;
            if rows.is_empty() {
                return Err(SourceError::invalid_response(
                    "growthepie fundamentals export is empty",
                ));
            }
            Ok(())
        })
    }
}
