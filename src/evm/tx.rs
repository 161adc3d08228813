/// Transaction requests and pending-transaction handles
use crate::error::Error;
use crate::wallet::provider::{block_number, WalletProvider};
use alloy_primitives::{Address, Bytes, B256, U256, U64};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Request handed to the wallet for signing and submission (`eth_sendTransaction`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(default)]
    pub data: Bytes,
}

impl TransactionRequest {
    /// Create a new request sent from `from`
    pub fn new(from: Address) -> Self {
        Self {
            from,
            to: None,
            value: None,
            data: Bytes::new(),
        }
    }

    /// Set the target address
    pub fn to(mut self, to: Address) -> Self {
        self.to = Some(to);
        self
    }

    /// Set the value (in wei) to transfer. Zero is omitted from the request.
    pub fn value(mut self, value: U256) -> Self {
        self.value = (!value.is_zero()).then_some(value);
        self
    }

    /// Set the calldata payload
    pub fn data(mut self, data: Bytes) -> Self {
        self.data = data;
        self
    }
}

/// Receipt of a mined transaction, as returned by `eth_getTransactionReceipt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub block_number: U64,
    /// `0x1` on success, `0x0` when reverted. Absent on pre-Byzantium chains.
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub gas_used: Option<U64>,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.map_or(true, |status| status == U64::from(1u64))
    }

    pub fn block(&self) -> u64 {
        self.block_number.to::<u64>()
    }
}

/// How a pending transaction is awaited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxWaitPolicy {
    /// Delay between receipt polls
    pub poll_interval: Duration,
    /// Blocks (including the inclusion block) required before the
    /// transaction counts as final
    pub confirmations: u64,
}

impl Default for TxWaitPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2_000),
            confirmations: 1,
        }
    }
}

/// Handle to a submitted transaction.
///
/// Submission only means the wallet accepted the transaction; callers must
/// [`wait`](PendingTransaction::wait) before treating the operation as done.
/// There is no timeout: the wait lasts as long as the provider keeps answering.
#[must_use = "a submitted transaction must be awaited before it counts as complete"]
pub struct PendingTransaction {
    hash: B256,
    provider: Arc<dyn WalletProvider>,
    policy: TxWaitPolicy,
}

impl PendingTransaction {
    pub fn new(hash: B256, provider: Arc<dyn WalletProvider>, policy: TxWaitPolicy) -> Self {
        Self {
            hash,
            provider,
            policy,
        }
    }

    /// Transaction hash reported by the wallet
    pub fn hash(&self) -> B256 {
        self.hash
    }

    /// Wait until the transaction is mined and has enough confirmations.
    ///
    /// A mined transaction whose receipt reports failure is a
    /// [`Error::CallRejected`].
    pub async fn wait(self) -> Result<TransactionReceipt, Error> {
        debug!("Waiting for transaction {}", self.hash);
        loop {
            if let Some(receipt) = self.poll_receipt().await? {
                if !receipt.succeeded() {
                    return Err(Error::CallRejected(format!(
                        "transaction {} reverted in block {}",
                        self.hash,
                        receipt.block()
                    )));
                }
                if self.is_final(&receipt).await? {
                    info!(
                        "Transaction {} confirmed in block {}",
                        self.hash,
                        receipt.block()
                    );
                    return Ok(receipt);
                }
            }
            tokio::time::sleep(self.policy.poll_interval).await;
        }
    }

    async fn poll_receipt(&self) -> Result<Option<TransactionReceipt>, Error> {
        let value = self
            .provider
            .request("eth_getTransactionReceipt", json!([self.hash]))
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    async fn is_final(&self, receipt: &TransactionReceipt) -> Result<bool, Error> {
        if self.policy.confirmations <= 1 {
            return Ok(true);
        }
        let head = block_number(self.provider.as_ref()).await?;
        let depth = head.saturating_sub(receipt.block()) + 1;
        debug!(
            "Transaction {} has {}/{} confirmations",
            self.hash, depth, self.policy.confirmations
        );
        Ok(depth >= self.policy.confirmations)
    }
}

impl std::fmt::Debug for PendingTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTransaction")
            .field("hash", &self.hash)
            .field("policy", &self.policy)
            .finish()
    }
}
