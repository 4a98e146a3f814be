use std::sync::Arc;

use serde::Deserialize;

use crate::adapters::Upstream;
use crate::cache::CacheMode;
use crate::data_source::{DataSource, SourceError, SourceFuture};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::provider_policy::ttl;
use crate::ProviderId;

const BASE_URL: &str = "https://api.blobscan.com";

/// Page size used for "recent" blob statistics.
pub const RECENT_BLOB_PAGE: usize = 25;

/// EIP-4844 blob explorer. Keyless.
#[derive(Clone)]
pub struct BlobscanAdapter {
    upstream: Upstream,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobscanBlob {
    pub versioned_hash: String,
    pub size: u64,
}

/// `/blobs` page, newest first.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobscanBlobs {
    pub blobs: Vec<BlobscanBlob>,
    #[serde(default)]
    pub total_blobs: Option<u64>,
}

impl Default for BlobscanAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()))
    }
}

impl BlobscanAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            upstream: Upstream::new(ProviderId::Blobscan, http_client),
        }
    }

    pub async fn recent_blobs(&self) -> Result<BlobscanBlobs, SourceError> {
        self.page(RECENT_BLOB_PAGE, CacheMode::Use).await
    }

    async fn page(&self, size: usize, mode: CacheMode) -> Result<BlobscanBlobs, SourceError> {
        self.upstream
            .fetch_json(
                HttpRequest::get(format!("{BASE_URL}/blobs?ps={size}&sort=desc")),
                ttl::BLOBS,
                mode,
            )
            .await
    }
}

impl DataSource for BlobscanAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Blobscan
    }

    fn probe<'a>(&'a self) -> SourceFuture<'a, ()> {
        Box::pin(async move { self.page(1, CacheMode::Bypass).await.map(|_| ()) })
    }
}
