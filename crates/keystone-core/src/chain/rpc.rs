//! HTTP JSON-RPC chain client on an `alloy` provider.
//!
//! Transactions are sent with `eth_sendTransaction`, so signing is left to
//! the node (a dev node or a node with an unlocked deployer account).

use std::fmt;
use std::future::IntoFuture;
use std::time::Duration;

use alloy::network::ReceiptResponse;
use alloy::primitives::{TxKind, U256};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::types::{Block, BlockNumberOrTag, TransactionInput, TransactionRequest};
use alloy::transports::{TransportError, TransportResult};
use async_trait::async_trait;
use url::Url;

use super::ChainClient;
use crate::error::{RemoteError, RemoteResult};
use crate::types::{
    Address, Amount, B256, BlockInfo, BlockTag, FeeEstimate, Receipt, TxHash, TxRequest,
};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Chain client speaking Ethereum JSON-RPC over HTTP.
pub struct JsonRpcClient {
    provider: RootProvider,
    url: Url,
    request_timeout: Duration,
    wait_timeout: Duration,
    poll_interval: Duration,
}

impl fmt::Debug for JsonRpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonRpcClient")
            .field("url", &self.url.as_str())
            .field("wait_timeout", &self.wait_timeout)
            .finish_non_exhaustive()
    }
}

impl JsonRpcClient {
    pub fn new(url: Url) -> Self {
        Self {
            provider: RootProvider::new_http(url.clone()),
            url,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Upper bound for [`ChainClient::wait`].
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Run one provider call under the request timeout.
    async fn request<F, T>(&self, method: &str, call: F) -> RemoteResult<T>
    where
        F: IntoFuture<Output = TransportResult<T>>,
    {
        tracing::trace!(method, "JSON-RPC request");

        match tokio::time::timeout(self.request_timeout, call.into_future()).await {
            Ok(result) => result.map_err(|e| transport_error(method, e)),
            Err(_) => Err(RemoteError::Timeout(format!(
                "{method}: no response within {}s",
                self.request_timeout.as_secs()
            ))),
        }
    }

    async fn raw_block(&self, tag: BlockTag) -> RemoteResult<Block> {
        let number = match tag {
            BlockTag::Latest => BlockNumberOrTag::Latest,
            BlockTag::Number(n) => BlockNumberOrTag::Number(n),
        };
        self.request(
            "eth_getBlockByNumber",
            self.provider.get_block_by_number(number),
        )
        .await?
        .ok_or_else(|| RemoteError::Rpc(format!("eth_getBlockByNumber: no block {number}")))
    }

    async fn receipt(&self, tx: &TxHash) -> RemoteResult<Option<Receipt>> {
        let Some(raw) = self
            .request(
                "eth_getTransactionReceipt",
                self.provider.get_transaction_receipt(*tx),
            )
            .await?
        else {
            return Ok(None);
        };

        if !raw.status() {
            return Err(RemoteError::Reverted(format!("transaction {tx} reverted")));
        }
        // Pending receipts carry no block yet
        let Some(block_number) = raw.block_number() else {
            return Ok(None);
        };

        Ok(Some(Receipt {
            tx_hash: raw.transaction_hash(),
            block_number,
            effective_gas_price: Some(Amount::from_wei(raw.effective_gas_price())),
            contract_address: raw.contract_address(),
        }))
    }
}

#[async_trait]
impl ChainClient for JsonRpcClient {
    async fn balance(&self, address: &Address) -> RemoteResult<Amount> {
        self.request("eth_getBalance", self.provider.get_balance(*address))
            .await
            .map(Amount::from)
    }

    async fn fee_estimate(&self) -> RemoteResult<FeeEstimate> {
        let (block, priority_fee) = tokio::try_join!(
            self.raw_block(BlockTag::Latest),
            self.request(
                "eth_maxPriorityFeePerGas",
                self.provider.get_max_priority_fee_per_gas(),
            ),
        )?;

        let base_fee = block.header.base_fee_per_gas.unwrap_or_default();
        Ok(FeeEstimate {
            base_fee: Amount::from_wei(u128::from(base_fee)),
            priority_fee: Amount::from_wei(priority_fee),
        })
    }

    async fn submit(&self, tx: &TxRequest) -> RemoteResult<TxHash> {
        let request = TransactionRequest {
            from: Some(tx.from),
            to: Some(tx.to.map_or(TxKind::Create, TxKind::Call)),
            value: Some(tx.value.wei()),
            input: TransactionInput::new(tx.data.clone()),
            max_fee_per_gas: Some(gas_price(tx.fees.max_fee_per_gas)?),
            max_priority_fee_per_gas: Some(gas_price(tx.fees.max_priority_fee_per_gas)?),
            gas: tx.fees.gas_limit,
            ..Default::default()
        };

        let pending = self
            .request(
                "eth_sendTransaction",
                self.provider.send_transaction(request),
            )
            .await?;
        Ok(*pending.tx_hash())
    }

    async fn wait(&self, tx: &TxHash, confirmations: u64) -> RemoteResult<Receipt> {
        let confirmations = confirmations.max(1);
        let poll = async {
            loop {
                if let Some(receipt) = self.receipt(tx).await? {
                    let head = self
                        .request("eth_blockNumber", self.provider.get_block_number())
                        .await?;
                    if head + 1 >= receipt.block_number + confirmations {
                        return Ok::<_, RemoteError>(receipt);
                    }
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        tokio::time::timeout(self.wait_timeout, poll)
            .await
            .map_err(|_| {
                RemoteError::Timeout(format!(
                    "transaction {tx} not confirmed within {}s",
                    self.wait_timeout.as_secs()
                ))
            })?
    }

    async fn block(&self, tag: BlockTag) -> RemoteResult<BlockInfo> {
        let block = self.raw_block(tag).await?;
        Ok(BlockInfo {
            number: block.header.number,
            timestamp: block.header.timestamp,
        })
    }

    async fn storage_at(&self, address: &Address, slot: B256) -> RemoteResult<B256> {
        let slot = U256::from_be_bytes(slot.0);
        self.request(
            "eth_getStorageAt",
            self.provider.get_storage_at(*address, slot),
        )
        .await
        .map(B256::from)
    }
}

fn gas_price(amount: Amount) -> RemoteResult<u128> {
    u128::try_from(amount.wei())
        .map_err(|_| RemoteError::Rpc(format!("fee {amount} does not fit a gas price")))
}

fn transport_error(method: &str, error: TransportError) -> RemoteError {
    if let Some(payload) = error.as_error_resp() {
        return classify_rpc_error(method, payload.code, &payload.message);
    }
    let message = error.to_string();
    if message.to_ascii_lowercase().contains("timed out") {
        RemoteError::Timeout(format!("{method}: {message}"))
    } else {
        RemoteError::Rpc(format!("{method}: {message}"))
    }
}

/// Map a node error onto the retry categories.
fn classify_rpc_error(method: &str, code: i64, message: &str) -> RemoteError {
    let lower = message.to_ascii_lowercase();
    let detail = format!("{method}: {message} (code {code})");
    if lower.contains("underpriced") {
        RemoteError::Underpriced(detail)
    } else if lower.contains("nonce") {
        RemoteError::Nonce(detail)
    } else if lower.contains("revert") {
        RemoteError::Reverted(detail)
    } else {
        RemoteError::Rpc(detail)
    }
}
