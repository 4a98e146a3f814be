use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::adapters::Upstream;
use crate::cache::CacheMode;
use crate::data_source::{DataSource, SourceError, SourceFuture};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::provider_policy::ttl;
use crate::{
    parse_hex_quantity, AccountBalance, Address, BlockTag, Chain, HexData, LogFilter, ProviderId,
    TxHash, ValidationError,
};

const BASE_URL: &str = "https://api.etherscan.io/v2/api";

/// Maximum addresses accepted by `balancemulti`.
pub const MAX_MULTI_BALANCE_ADDRESSES: usize = 20;

/// Multi-chain block explorer (Etherscan v2, one key for every chain id).
#[derive(Clone)]
pub struct EtherscanAdapter {
    upstream: Upstream,
    api_key: Option<String>,
}

/// `stats/ethprice` payload. Etherscan returns numbers as strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EtherscanEthPrice {
    pub ethusd: String,
    #[serde(default)]
    pub ethbtc: Option<String>,
    #[serde(default)]
    pub ethusd_timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct MultiBalanceEntry {
    account: String,
    balance: String,
}

impl EtherscanAdapter {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()), api_key)
    }

    pub fn with_http_client(http_client: Arc<dyn HttpClient>, api_key: Option<String>) -> Self {
        Self {
            upstream: Upstream::new(ProviderId::Etherscan, http_client),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    pub async fn eth_price(&self) -> Result<EtherscanEthPrice, SourceError> {
        self.eth_price_with(CacheMode::Use).await
    }

    pub async fn eth_price_with(&self, mode: CacheMode) -> Result<EtherscanEthPrice, SourceError> {
        self.get_with(Chain::Ethereum, "stats", "ethprice", &[], ttl::PRICE, mode)
            .await
    }

    pub async fn balance(
        &self,
        chain: Chain,
        address: &Address,
        tag: BlockTag,
    ) -> Result<AccountBalance, SourceError> {
        let wei: String = self
            .get(
                chain,
                "account",
                "balance",
                &[("address", address.to_string()), ("tag", tag.to_rpc())],
                chain_data_ttl(tag),
            )
            .await?;

        Ok(AccountBalance {
            address: address.clone(),
            wei: parse_decimal(&wei)?,
        })
    }

    pub async fn multi_balance(
        &self,
        chain: Chain,
        addresses: &[Address],
        tag: BlockTag,
    ) -> Result<Vec<AccountBalance>, SourceError> {
        if addresses.is_empty() || addresses.len() > MAX_MULTI_BALANCE_ADDRESSES {
            return Err(ValidationError::InvalidAddressCount {
                max: MAX_MULTI_BALANCE_ADDRESSES,
            }
            .into());
        }

        let joined = addresses
            .iter()
            .map(Address::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let entries: Vec<MultiBalanceEntry> = self
            .get(
                chain,
                "account",
                "balancemulti",
                &[("address", joined), ("tag", tag.to_rpc())],
                chain_data_ttl(tag),
            )
            .await?;

        entries
            .into_iter()
            .map(|entry| -> Result<AccountBalance, SourceError> {
                Ok(AccountBalance {
                    address: Address::parse(&entry.account)?,
                    wei: parse_decimal(&entry.balance)?,
                })
            })
            .collect()
    }

    pub async fn block_number(&self, chain: Chain) -> Result<u64, SourceError> {
        self.block_number_with(chain, CacheMode::Use).await
    }

    async fn block_number_with(&self, chain: Chain, mode: CacheMode) -> Result<u64, SourceError> {
        let hex: String = self
            .get_with(
                chain,
                "proxy",
                "eth_blockNumber",
                &[],
                ttl::LIVE_CHAIN_DATA,
                mode,
            )
            .await?;
        quantity_u64(&hex)
    }

    pub async fn block(&self, chain: Chain, tag: BlockTag, full: bool) -> Result<Value, SourceError> {
        self.get(
            chain,
            "proxy",
            "eth_getBlockByNumber",
            &[("tag", tag.to_rpc()), ("boolean", full.to_string())],
            chain_data_ttl(tag),
        )
        .await
    }

    pub async fn transaction(&self, chain: Chain, hash: &TxHash) -> Result<Value, SourceError> {
        self.get(
            chain,
            "proxy",
            "eth_getTransactionByHash",
            &[("txhash", hash.to_string())],
            ttl::IMMUTABLE_CHAIN_DATA,
        )
        .await
    }

    pub async fn receipt(&self, chain: Chain, hash: &TxHash) -> Result<Value, SourceError> {
        self.get(
            chain,
            "proxy",
            "eth_getTransactionReceipt",
            &[("txhash", hash.to_string())],
            ttl::IMMUTABLE_CHAIN_DATA,
        )
        .await
    }

    pub async fn call(
        &self,
        chain: Chain,
        to: &Address,
        data: &HexData,
        tag: BlockTag,
    ) -> Result<HexData, SourceError> {
        let result: String = self
            .get(
                chain,
                "proxy",
                "eth_call",
                &[
                    ("to", to.to_string()),
                    ("data", data.to_string()),
                    ("tag", tag.to_rpc()),
                ],
                chain_data_ttl(tag),
            )
            .await?;
        Ok(HexData::parse(&result)?)
    }

    pub async fn code(
        &self,
        chain: Chain,
        address: &Address,
        tag: BlockTag,
    ) -> Result<HexData, SourceError> {
        let result: String = self
            .get(
                chain,
                "proxy",
                "eth_getCode",
                &[("address", address.to_string()), ("tag", tag.to_rpc())],
                chain_data_ttl(tag),
            )
            .await?;
        Ok(HexData::parse(&result)?)
    }

    pub async fn storage_at(
        &self,
        chain: Chain,
        address: &Address,
        slot: &HexData,
        tag: BlockTag,
    ) -> Result<HexData, SourceError> {
        let result: String = self
            .get(
                chain,
                "proxy",
                "eth_getStorageAt",
                &[
                    ("address", address.to_string()),
                    ("position", slot.to_string()),
                    ("tag", tag.to_rpc()),
                ],
                chain_data_ttl(tag),
            )
            .await?;
        Ok(HexData::parse(&result)?)
    }

    pub async fn gas_price(&self, chain: Chain) -> Result<u128, SourceError> {
        let hex: String = self
            .get(chain, "proxy", "eth_gasPrice", &[], ttl::LIVE_CHAIN_DATA)
            .await?;
        Ok(parse_hex_quantity(&hex)?)
    }

    pub async fn transaction_count(
        &self,
        chain: Chain,
        address: &Address,
        tag: BlockTag,
    ) -> Result<u64, SourceError> {
        let hex: String = self
            .get(
                chain,
                "proxy",
                "eth_getTransactionCount",
                &[("address", address.to_string()), ("tag", tag.to_rpc())],
                chain_data_ttl(tag),
            )
            .await?;
        quantity_u64(&hex)
    }

    pub async fn logs(&self, chain: Chain, filter: &LogFilter) -> Result<Vec<Value>, SourceError> {
        let mut params = vec![
            ("fromBlock", explorer_block(filter.from_block)),
            ("toBlock", explorer_block(filter.to_block)),
        ];
        if let Some(address) = &filter.address {
            params.push(("address", address.to_string()));
        }
        for (index, topic) in filter.topics.iter().enumerate().take(4) {
            if let Some(topic) = topic {
                params.push((TOPIC_KEYS[index], topic.clone()));
            }
        }

        let fixed = filter.from_block.is_fixed() && filter.to_block.is_fixed();
        let cache_ttl = if fixed {
            ttl::IMMUTABLE_CHAIN_DATA
        } else {
            ttl::LIVE_CHAIN_DATA
        };

        match self.get(chain, "logs", "getLogs", &params, cache_ttl).await {
            Ok(logs) => Ok(logs),
            // Etherscan reports an empty result set as status "0".
            Err(error) if error.message().contains("No records found") => Ok(Vec::new()),
            Err(error) => Err(error),
        }
    }

    async fn get<T>(
        &self,
        chain: Chain,
        module: &str,
        action: &str,
        params: &[(&str, String)],
        cache_ttl: Duration,
    ) -> Result<T, SourceError>
    where
        T: DeserializeOwned,
    {
        self.get_with(chain, module, action, params, cache_ttl, CacheMode::Use)
            .await
    }

    async fn get_with<T>(
        &self,
        chain: Chain,
        module: &str,
        action: &str,
        params: &[(&str, String)],
        cache_ttl: Duration,
        mode: CacheMode,
    ) -> Result<T, SourceError>
    where
        T: DeserializeOwned,
    {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            SourceError::not_configured("etherscan requires ETHERSCAN_API_KEY")
        })?;

        let mut url = format!(
            "{BASE_URL}?chainid={}&module={module}&action={action}",
            chain.chain_id()
        );
        for (name, value) in params {
            url.push('&');
            url.push_str(name);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url.push_str("&apikey=");
        url.push_str(&urlencoding::encode(api_key));

        let envelope: Envelope = self
            .upstream
            .fetch_json(HttpRequest::get(url), cache_ttl, mode)
            .await?;
        unwrap_envelope(envelope)
    }
}

const TOPIC_KEYS: [&str; 4] = ["topic0", "topic1", "topic2", "topic3"];

fn unwrap_envelope<T>(envelope: Envelope) -> Result<T, SourceError>
where
    T: DeserializeOwned,
{
    if let Some(error) = envelope.error {
        return Err(SourceError::unavailable(format!(
            "etherscan error: {}",
            error.message
        )));
    }

    let result = envelope.result.unwrap_or(Value::Null);
    if envelope.status.as_deref() == Some("0") {
        let message = envelope.message.unwrap_or_else(|| String::from("NOTOK"));
        let detail = match &result {
            Value::String(detail) => detail.clone(),
            other => other.to_string(),
        };
        return Err(SourceError::unavailable(format!(
            "etherscan error: {message}: {detail}"
        )));
    }

    serde_json::from_value(result).map_err(|error| {
        SourceError::invalid_response(format!("unexpected etherscan result shape: {error}"))
    })
}

fn chain_data_ttl(tag: BlockTag) -> Duration {
    if tag.is_fixed() {
        ttl::IMMUTABLE_CHAIN_DATA
    } else {
        ttl::LIVE_CHAIN_DATA
    }
}

fn explorer_block(tag: BlockTag) -> String {
    match tag {
        BlockTag::Number(number) => number.to_string(),
        BlockTag::Earliest => String::from("0"),
        BlockTag::Latest | BlockTag::Pending => String::from("latest"),
    }
}

fn parse_decimal(value: &str) -> Result<u128, SourceError> {
    value.trim().parse::<u128>().map_err(|_| {
        SourceError::invalid_response(format!("etherscan returned non-numeric balance '{value}'"))
    })
}

fn quantity_u64(hex: &str) -> Result<u64, SourceError> {
    let value = parse_hex_quantity(hex)?;
    u64::try_from(value)
        .map_err(|_| SourceError::invalid_response(format!("quantity out of range: '{hex}'")))
}

impl DataSource for EtherscanAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Etherscan
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn probe<'a>(&'a self) -> SourceFuture<'a, ()> {
        Box::pin(async move {
            self.block_number_with(Chain::Ethereum, CacheMode::Bypass)
                .await
                .map(|_| ())
        })
    }
}
