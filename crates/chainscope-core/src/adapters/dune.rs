use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapters::Upstream;
use crate::cache::CacheMode;
use crate::data_source::{DataSource, SourceError, SourceFuture};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, ReqwestHttpClient};
use crate::provider_policy::ttl;
use crate::ProviderId;

const BASE_URL: &str = "https://api.dune.com/api/v1";

/// Ad-hoc SQL query service. Reads the latest stored result of a saved query.
#[derive(Clone)]
pub struct DuneAdapter {
    upstream: Upstream,
    auth: Option<HttpAuth>,
}

/// Latest execution result of a saved query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuneQueryResults {
    pub query_id: u64,
    pub execution_id: String,
    pub state: String,
    pub column_names: Vec<String>,
    pub rows: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ResultsEnvelope {
    execution_id: String,
    query_id: u64,
    state: String,
    #[serde(default)]
    result: Option<ResultsBody>,
}

#[derive(Debug, Deserialize)]
struct ResultsBody {
    #[serde(default)]
    rows: Vec<Value>,
    #[serde(default)]
    metadata: Option<ResultsMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResultsMetadata {
    #[serde(default)]
    column_names: Vec<String>,
}

impl DuneAdapter {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()), api_key)
    }

    pub fn with_http_client(http_client: Arc<dyn HttpClient>, api_key: Option<String>) -> Self {
        Self {
            upstream: Upstream::new(ProviderId::Dune, http_client),
            auth: api_key
                .filter(|key| !key.trim().is_empty())
                .map(|key| HttpAuth::Header {
                    name: String::from("X-Dune-API-Key"),
                    value: key,
                }),
        }
    }

    pub async fn latest_results(
        &self,
        query_id: u64,
        limit: Option<usize>,
    ) -> Result<DuneQueryResults, SourceError> {
        let mut url = format!("{BASE_URL}/query/{query_id}/results");
        if let Some(limit) = limit {
            url.push_str(&format!("?limit={limit}"));
        }

        let envelope: ResultsEnvelope = self
            .upstream
            .fetch_json(self.request(url)?, ttl::QUERY_RESULTS, CacheMode::Use)
            .await?;

        let (rows, column_names) = match envelope.result {
            Some(body) => (
                body.rows,
                body.metadata
                    .map(|metadata| metadata.column_names)
                    .unwrap_or_default(),
            ),
            None => (Vec::new(), Vec::new()),
        };

        Ok(DuneQueryResults {
            query_id: envelope.query_id,
            execution_id: envelope.execution_id,
            state: envelope.state,
            column_names,
            rows,
        })
    }

    fn request(&self, url: String) -> Result<HttpRequest, SourceError> {
        let auth = self
            .auth
            .as_ref()
            .ok_or_else(|| SourceError::not_configured("dune requires DUNE_API_KEY"))?;
        Ok(HttpRequest::get(url).with_auth(auth))
    }
}

impl DataSource for DuneAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Dune
    }

    fn is_configured(&self) -> bool {
        self.auth.is_some()
    }

    /// Dune has no ping endpoint. Any answer that is not an auth rejection
    /// or a server error (a 404 for an unknown query included) counts as up.
    fn probe<'a>(&'a self) -> SourceFuture<'a, ()> {
        Box::pin(async move {
            let request = self.request(format!("{BASE_URL}/query/1/results?limit=1"))?;
            let response = self.upstream.send(request).await?;
            match response.status {
                401 | 403 => Err(SourceError::not_configured(format!(
                    "dune rejected the API key (status {})",
                    response.status
                ))),
                404 => Ok(()),
                _ => self.upstream.ensure_success(&response),
            }
        })
    }
}
