//! On-chain reads: a configured node first, the block explorer second.
//!
//! The node only serves when no chain was requested or the requested chain
//! matches its configured chain id. The explorer serves any known chain when
//! it has an API key, defaulting to the node's chain and then Ethereum.

use serde_json::Value;

use crate::adapters::{EtherscanAdapter, RpcNodeAdapter, MAX_MULTI_BALANCE_ADDRESSES};
use crate::data_source::{DataSource, SourceFuture};
use crate::fallback::{ProviderAttempt, RouteError};
use crate::routing::Router;
use crate::{
    AccountBalance, Address, BlockTag, Chain, HexData, LogFilter, ProviderId, Routed, TxHash,
    ValidationError,
};

impl Router {
    pub async fn balance(
        &self,
        address: &Address,
        chain: Option<Chain>,
        tag: BlockTag,
    ) -> Result<Routed<AccountBalance>, RouteError> {
        let attempts = self.onchain_attempts(
            chain,
            |node| Box::pin(node.balance(address, tag)),
            |explorer, chain| Box::pin(explorer.balance(chain, address, tag)),
        )?;
        self.route(attempts, None).await
    }

    /// Balances for up to [`MAX_MULTI_BALANCE_ADDRESSES`] addresses at once.
    pub async fn multi_balance(
        &self,
        addresses: &[Address],
        chain: Option<Chain>,
        tag: BlockTag,
    ) -> Result<Routed<Vec<AccountBalance>>, RouteError> {
        if addresses.is_empty() || addresses.len() > MAX_MULTI_BALANCE_ADDRESSES {
            return Err(ValidationError::InvalidAddressCount {
                max: MAX_MULTI_BALANCE_ADDRESSES,
            }
            .into());
        }

        let attempts = self.onchain_attempts(
            chain,
            |node| Box::pin(node.multi_balance(addresses, tag)),
            |explorer, chain| Box::pin(explorer.multi_balance(chain, addresses, tag)),
        )?;
        self.route(attempts, None).await
    }

    pub async fn block_number(&self, chain: Option<Chain>) -> Result<Routed<u64>, RouteError> {
        let attempts = self.onchain_attempts(
            chain,
            |node| Box::pin(node.block_number()),
            |explorer, chain| Box::pin(explorer.block_number(chain)),
        )?;
        self.route(attempts, None).await
    }

    /// Block by tag, with full transaction objects when `full` is set.
    pub async fn block(
        &self,
        tag: BlockTag,
        full: bool,
        chain: Option<Chain>,
    ) -> Result<Routed<Value>, RouteError> {
        let attempts = self.onchain_attempts(
            chain,
            |node| Box::pin(node.block(tag, full)),
            |explorer, chain| Box::pin(explorer.block(chain, tag, full)),
        )?;
        self.route(attempts, None).await
    }

    pub async fn transaction(
        &self,
        hash: &TxHash,
        chain: Option<Chain>,
    ) -> Result<Routed<Value>, RouteError> {
        let attempts = self.onchain_attempts(
            chain,
            |node| Box::pin(node.transaction(hash)),
            |explorer, chain| Box::pin(explorer.transaction(chain, hash)),
        )?;
        self.route(attempts, None).await
    }

    pub async fn receipt(
        &self,
        hash: &TxHash,
        chain: Option<Chain>,
    ) -> Result<Routed<Value>, RouteError> {
        let attempts = self.onchain_attempts(
            chain,
            |node| Box::pin(node.receipt(hash)),
            |explorer, chain| Box::pin(explorer.receipt(chain, hash)),
        )?;
        self.route(attempts, None).await
    }

    /// Read-only `eth_call` against `to`.
    pub async fn call(
        &self,
        to: &Address,
        data: &HexData,
        chain: Option<Chain>,
        tag: BlockTag,
    ) -> Result<Routed<HexData>, RouteError> {
        let attempts = self.onchain_attempts(
            chain,
            |node| Box::pin(node.call(to, data, tag)),
            |explorer, chain| Box::pin(explorer.call(chain, to, data, tag)),
        )?;
        self.route(attempts, None).await
    }

    pub async fn code(
        &self,
        address: &Address,
        chain: Option<Chain>,
        tag: BlockTag,
    ) -> Result<Routed<HexData>, RouteError> {
        let attempts = self.onchain_attempts(
            chain,
            |node| Box::pin(node.code(address, tag)),
            |explorer, chain| Box::pin(explorer.code(chain, address, tag)),
        )?;
        self.route(attempts, None).await
    }

    pub async fn storage_at(
        &self,
        address: &Address,
        slot: &HexData,
        chain: Option<Chain>,
        tag: BlockTag,
    ) -> Result<Routed<HexData>, RouteError> {
        let attempts = self.onchain_attempts(
            chain,
            |node| Box::pin(node.storage_at(address, slot, tag)),
            |explorer, chain| Box::pin(explorer.storage_at(chain, address, slot, tag)),
        )?;
        self.route(attempts, None).await
    }

    /// Current gas price in wei.
    pub async fn gas_price(&self, chain: Option<Chain>) -> Result<Routed<u128>, RouteError> {
        let attempts = self.onchain_attempts(
            chain,
            |node| Box::pin(node.gas_price()),
            |explorer, chain| Box::pin(explorer.gas_price(chain)),
        )?;
        self.route(attempts, None).await
    }

    pub async fn transaction_count(
        &self,
        address: &Address,
        chain: Option<Chain>,
        tag: BlockTag,
    ) -> Result<Routed<u64>, RouteError> {
        let attempts = self.onchain_attempts(
            chain,
            |node| Box::pin(node.transaction_count(address, tag)),
            |explorer, chain| Box::pin(explorer.transaction_count(chain, address, tag)),
        )?;
        self.route(attempts, None).await
    }

    pub async fn logs(
        &self,
        filter: &LogFilter,
        chain: Option<Chain>,
    ) -> Result<Routed<Vec<Value>>, RouteError> {
        let attempts = self.onchain_attempts(
            chain,
            |node| Box::pin(node.logs(filter)),
            |explorer, chain| Box::pin(explorer.logs(chain, filter)),
        )?;
        self.route(attempts, None).await
    }

    /// Orders the node and the explorer for one read.
    fn onchain_attempts<'a, T, N, E>(
        &'a self,
        chain: Option<Chain>,
        node_call: N,
        explorer_call: E,
    ) -> Result<Vec<ProviderAttempt<'a, T>>, RouteError>
    where
        T: 'a,
        N: FnOnce(&'a RpcNodeAdapter) -> SourceFuture<'a, T> + Send + 'a,
        E: FnOnce(&'a EtherscanAdapter, Chain) -> SourceFuture<'a, T> + Send + 'a,
    {
        let mut attempts = Vec::with_capacity(2);

        if let Some(node) = &self.rpc {
            if node.serves(chain) {
                attempts.push(ProviderAttempt::new(ProviderId::Rpc.as_str(), move || {
                    node_call(node)
                }));
            } else {
                tracing::debug!(
                    requested = ?chain,
                    node_chain_id = ?node.chain_id(),
                    "rpc node does not serve the requested chain"
                );
            }
        }

        if self.etherscan.is_configured() {
            let explorer_chain = self.explorer_chain(chain);
            let explorer = &self.etherscan;
            attempts.push(ProviderAttempt::new(
                ProviderId::Etherscan.as_str(),
                move || explorer_call(explorer, explorer_chain),
            ));
        }

        if attempts.is_empty() {
            let target = chain.map_or_else(|| String::from("the default chain"), |c| c.to_string());
            return Err(RouteError::not_configured(format!(
                "no on-chain provider available for {target}: set CHAINSCOPE_RPC_URL \
                 (with CHAINSCOPE_RPC_CHAIN_ID) for a node or ETHERSCAN_API_KEY for the explorer"
            )));
        }

        Ok(attempts)
    }

    /// Requested chain, else the node's chain when known, else Ethereum.
    fn explorer_chain(&self, chain: Option<Chain>) -> Chain {
        chain
            .or_else(|| {
                self.rpc
                    .as_ref()
                    .and_then(RpcNodeAdapter::chain_id)
                    .and_then(Chain::from_chain_id)
            })
            .unwrap_or_default()
    }
}
