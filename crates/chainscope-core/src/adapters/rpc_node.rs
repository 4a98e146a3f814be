use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::adapters::Upstream;
use crate::cache::CacheMode;
use crate::data_source::{DataSource, SourceError, SourceFuture};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::provider_policy::ttl;
use crate::{
    parse_hex_quantity, AccountBalance, Address, BlockTag, Chain, HexData, LogFilter, ProviderId,
    TxHash,
};

/// Self-hosted (or any JSON-RPC 2.0) EVM node.
#[derive(Clone)]
pub struct RpcNodeAdapter {
    upstream: Upstream,
    url: String,
    chain_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl RpcNodeAdapter {
    pub fn new(url: impl Into<String>, chain_id: Option<u64>) -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()), url, chain_id)
    }

    pub fn with_http_client(
        http_client: Arc<dyn HttpClient>,
        url: impl Into<String>,
        chain_id: Option<u64>,
    ) -> Self {
        Self {
            upstream: Upstream::new(ProviderId::Rpc, http_client),
            url: url.into(),
            chain_id,
        }
    }

    /// Chain id the node was configured for, when known.
    pub const fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    /// Whether this node may serve a request for `chain`.
    ///
    /// With no requested chain the node always serves. A requested chain must
    /// match the configured chain id; an unknown node chain never matches.
    pub fn serves(&self, chain: Option<Chain>) -> bool {
        match chain {
            None => true,
            Some(chain) => self.chain_id == Some(chain.chain_id()),
        }
    }

    /// The chain the node reports for itself via `eth_chainId`.
    pub async fn remote_chain_id(&self) -> Result<u64, SourceError> {
        let hex: String = self
            .request("eth_chainId", json!([]), ttl::IMMUTABLE_CHAIN_DATA, CacheMode::Use)
            .await?;
        quantity_u64(&hex)
    }

    pub async fn balance(&self, address: &Address, tag: BlockTag) -> Result<AccountBalance, SourceError> {
        let hex: String = self
            .request(
                "eth_getBalance",
                json!([address, tag]),
                chain_data_ttl(tag),
                CacheMode::Use,
            )
            .await?;

        Ok(AccountBalance {
            address: address.clone(),
            wei: parse_hex_quantity(&hex)?,
        })
    }

    pub async fn multi_balance(
        &self,
        addresses: &[Address],
        tag: BlockTag,
    ) -> Result<Vec<AccountBalance>, SourceError> {
        try_join_all(addresses.iter().map(|address| self.balance(address, tag))).await
    }

    pub async fn block_number(&self) -> Result<u64, SourceError> {
        self.block_number_with(CacheMode::Use).await
    }

    async fn block_number_with(&self, mode: CacheMode) -> Result<u64, SourceError> {
        let hex: String = self
            .request("eth_blockNumber", json!([]), ttl::LIVE_CHAIN_DATA, mode)
            .await?;
        quantity_u64(&hex)
    }

    pub async fn block(&self, tag: BlockTag, full: bool) -> Result<Value, SourceError> {
        self.request(
            "eth_getBlockByNumber",
            json!([tag, full]),
            chain_data_ttl(tag),
            CacheMode::Use,
        )
        .await
    }

    pub async fn transaction(&self, hash: &TxHash) -> Result<Value, SourceError> {
        self.request(
            "eth_getTransactionByHash",
            json!([hash]),
            ttl::IMMUTABLE_CHAIN_DATA,
            CacheMode::Use,
        )
        .await
    }

    pub async fn receipt(&self, hash: &TxHash) -> Result<Value, SourceError> {
        self.request(
            "eth_getTransactionReceipt",
            json!([hash]),
            ttl::IMMUTABLE_CHAIN_DATA,
            CacheMode::Use,
        )
        .await
    }

    pub async fn call(&self, to: &Address, data: &HexData, tag: BlockTag) -> Result<HexData, SourceError> {
        let result: String = self
            .request(
                "eth_call",
                json!([{ "to": to, "data": data }, tag]),
                chain_data_ttl(tag),
                CacheMode::Use,
            )
            .await?;
        Ok(HexData::parse(&result)?)
    }

    pub async fn code(&self, address: &Address, tag: BlockTag) -> Result<HexData, SourceError> {
        let result: String = self
            .request(
                "eth_getCode",
                json!([address, tag]),
                chain_data_ttl(tag),
                CacheMode::Use,
            )
            .await?;
        Ok(HexData::parse(&result)?)
    }

    pub async fn storage_at(
        &self,
        address: &Address,
        slot: &HexData,
        tag: BlockTag,
    ) -> Result<HexData, SourceError> {
        let result: String = self
            .request(
                "eth_getStorageAt",
                json!([address, slot, tag]),
                chain_data_ttl(tag),
                CacheMode::Use,
            )
            .await?;
        Ok(HexData::parse(&result)?)
    }

    pub async fn gas_price(&self) -> Result<u128, SourceError> {
        let hex: String = self
            .request("eth_gasPrice", json!([]), ttl::LIVE_CHAIN_DATA, CacheMode::Use)
            .await?;
        Ok(parse_hex_quantity(&hex)?)
    }

    pub async fn transaction_count(&self, address: &Address, tag: BlockTag) -> Result<u64, SourceError> {
        let hex: String = self
            .request(
                "eth_getTransactionCount",
                json!([address, tag]),
                chain_data_ttl(tag),
                CacheMode::Use,
            )
            .await?;
        quantity_u64(&hex)
    }

    pub async fn logs(&self, filter: &LogFilter) -> Result<Vec<Value>, SourceError> {
        let fixed = filter.from_block.is_fixed() && filter.to_block.is_fixed();
        let cache_ttl = if fixed {
            ttl::IMMUTABLE_CHAIN_DATA
        } else {
            ttl::LIVE_CHAIN_DATA
        };

        self.request("eth_getLogs", json!([filter]), cache_ttl, CacheMode::Use)
            .await
    }

    async fn request<T>(
        &self,
        method: &str,
        params: Value,
        cache_ttl: Duration,
        mode: CacheMode,
    ) -> Result<T, SourceError>
    where
        T: DeserializeOwned,
    {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response: RpcResponse = self
            .upstream
            .fetch_json(HttpRequest::post_json(&self.url, &body), cache_ttl, mode)
            .await?;

        if let Some(error) = response.error {
            return Err(SourceError::unavailable(format!(
                "rpc error {}: {}",
                error.code, error.message
            )));
        }

        serde_json::from_value(response.result.unwrap_or(Value::Null)).map_err(|error| {
            SourceError::invalid_response(format!("unexpected {method} result shape: {error}"))
        })
    }
}

fn chain_data_ttl(tag: BlockTag) -> Duration {
    if tag.is_fixed() {
        ttl::IMMUTABLE_CHAIN_DATA
    } else {
        ttl::LIVE_CHAIN_DATA
    }
}

fn quantity_u64(hex: &str) -> Result<u64, SourceError> {
    let value = parse_hex_quantity(hex)?;
    u64::try_from(value)
        .map_err(|_| SourceError::invalid_response(format!("quantity out of range: '{hex}'")))
}

impl DataSource for RpcNodeAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Rpc
    }

    fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
    }

    fn probe<'a>(&'a self) -> SourceFuture<'a, ()> {
        Box::pin(async move { self.block_number_with(CacheMode::Bypass).await.map(|_| ()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::RecordingHttpClient;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::HttpMethod;

    const NODE: &str = "http://127.0.0.1:8545";
    const VITALIK: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";

    #[tokio::test]
    async fn balance_posts_json_rpc_envelope() {
        let client = Arc::new(RecordingHttpClient::new().respond(
            "eth_getBalance",
            r#"{"jsonrpc":"2.0","id":1,"result":"0xde0b6b3a7640000"}"#,
        ));
        let adapter = RpcNodeAdapter::with_http_client(client.clone(), NODE, Some(1));
        let address = Address::parse(VITALIK).expect("valid");

        let balance = adapter
            .balance(&address, BlockTag::Latest)
            .await
            .expect("balance");
        assert_eq!(balance.wei, 1_000_000_000_000_000_000);

        let requests = client.recorded_requests();
        assert_eq!(requests[0].method, HttpMethod::Post);
        assert_eq!(requests[0].url, NODE);
        let body: Value =
            serde_json::from_str(requests[0].body.as_deref().expect("body")).expect("json");
        assert_eq!(body["method"], "eth_getBalance");
        assert_eq!(body["params"][0], VITALIK.to_ascii_lowercase());
        assert_eq!(body["params"][1], "latest");
        assert_eq!(requests[0].timeout_ms, 10_000);
    }

    #[tokio::test]
    async fn rpc_errors_become_unavailable() {
        let client = Arc::new(RecordingHttpClient::new().respond(
            "eth_blockNumber",
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"method not found"}}"#,
        ));
        let adapter = RpcNodeAdapter::with_http_client(client, NODE, None);

        let error = adapter.block_number().await.expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::Unavailable);
        assert_eq!(error.message(), "rpc error -32601: method not found");
    }

    #[test]
    fn chain_matching_excludes_unknown_or_mismatched_nodes() {
        let client = Arc::new(RecordingHttpClient::new());
        let mainnet = RpcNodeAdapter::with_http_client(client.clone(), NODE, Some(1));
        let unknown = RpcNodeAdapter::with_http_client(client, NODE, None);

        assert!(mainnet.serves(None));
        assert!(mainnet.serves(Some(Chain::Ethereum)));
        assert!(!mainnet.serves(Some(Chain::Base)));
        assert!(unknown.serves(None));
        assert!(!unknown.serves(Some(Chain::Ethereum)));
    }

    #[tokio::test]
    async fn fixed_block_reads_are_cached() {
        let client = Arc::new(RecordingHttpClient::new().respond(
            "eth_getBlockByNumber",
            r#"{"jsonrpc":"2.0","id":1,"result":{"number":"0x10","hash":"0xabc"}}"#,
        ));
        let adapter = RpcNodeAdapter::with_http_client(client.clone(), NODE, Some(1));

        for _ in 0..2 {
            let block = adapter
                .block(BlockTag::Number(16), false)
                .await
                .expect("block");
            assert_eq!(block["number"], "0x10");
        }
        assert_eq!(client.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn head_of_chain_reads_are_not_cached() {
        let client = Arc::new(RecordingHttpClient::new().respond(
            "eth_gasPrice",
            r#"{"jsonrpc":"2.0","id":1,"result":"0x3b9aca00"}"#,
        ));
        let adapter = RpcNodeAdapter::with_http_client(client.clone(), NODE, Some(1));

        adapter.gas_price().await.expect("gas");
        adapter.gas_price().await.expect("gas");
        assert_eq!(client.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn remote_chain_id_decodes_node_answer() {
        let client = Arc::new(RecordingHttpClient::new().respond(
            "eth_chainId",
            r#"{"jsonrpc":"2.0","id":1,"result":"0x2105"}"#,
        ));
        let adapter = RpcNodeAdapter::with_http_client(client, NODE, None);

        assert_eq!(adapter.remote_chain_id().await.expect("chain id"), 8453);
    }
}
