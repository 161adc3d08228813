/// Charity ledger contract gateway
///
/// Typed call surface over the deployed charity contract. Read accessors go
/// through `eth_call`; mutating calls are handed to the session's signer and
/// return a [`PendingTransaction`] that must be awaited.
///
/// The gateway performs no validation of the contract address or interface at
/// construction; a wrong address only shows up as a failing call.
use crate::error::Error;
use crate::evm::abi::InterfaceDescription;
use crate::evm::tx::{PendingTransaction, TransactionRequest, TxWaitPolicy};
use crate::wallet::{Signer, WalletProvider};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface ICharityLedger {
        event Donated(address indexed donor, uint256 amount, uint256 timestamp);
        event RequestCreated(uint256 id, string description, uint256 amount, address recipient);
        event RequestExecuted(uint256 id, address recipient, uint256 amount);

        /// Send value to the contract balance
        function donate() external payable;

        /// Propose a withdrawal; only the owner may call it
        function createSpendingRequest(
            string description,
            uint256 amount,
            address recipient,
            string receiptCID
        ) external;

        /// Pay out a pending request; only the owner may call it
        function executeSpendingRequest(uint256 id) external;

        function owner() external view returns (address);
        function getBalance() external view returns (uint256);
        function totalDonations() external view returns (uint256);

        function getDonationsCount() external view returns (uint256);
        function donations(uint256 index) external view returns (
            address donor,
            uint256 amount,
            uint256 timestamp
        );

        /// Number of requests ever created; ids run from 1 to this value
        function requestCount() external view returns (uint256);
        function spendingRequests(uint256 id) external view returns (
            uint256 id,
            string description,
            uint256 amount,
            address recipient,
            bool isComplete,
            string receiptCID
        );
    }
}

/// Raw donation entry as stored on-chain
pub type DonationRecord = ICharityLedger::donationsReturn;

/// Raw spending-request entry as stored on-chain
pub type SpendingRequestRecord = ICharityLedger::spendingRequestsReturn;

/// Typed gateway to a deployed charity ledger contract
#[derive(Clone)]
pub struct ContractGateway {
    address: Address,
    provider: Arc<dyn WalletProvider>,
    signer: Option<Signer>,
    wait_policy: TxWaitPolicy,
    interface: Option<Arc<InterfaceDescription>>,
}

impl ContractGateway {
    /// Bind the contract to a signer; reads go through the signer's provider
    pub fn new(address: Address, signer: Signer) -> Self {
        Self {
            address,
            provider: signer.provider().clone(),
            signer: Some(signer),
            wait_policy: TxWaitPolicy::default(),
            interface: None,
        }
    }

    /// Signer-less binding. Mutating calls fail with [`Error::NotConnected`].
    pub fn read_only(address: Address, provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            address,
            provider,
            signer: None,
            wait_policy: TxWaitPolicy::default(),
            interface: None,
        }
    }

    /// Set how returned pending transactions are awaited
    pub fn with_wait_policy(mut self, policy: TxWaitPolicy) -> Self {
        self.wait_policy = policy;
        self
    }

    /// Attach the published interface description, used to name calls in logs
    pub fn with_interface(mut self, interface: Arc<InterfaceDescription>) -> Self {
        self.interface = Some(interface);
        self
    }

    /// Get the contract address
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn is_read_only(&self) -> bool {
        self.signer.is_none()
    }

    // ============ Mutating calls ============

    /// Donate `amount_wei` to the contract balance
    pub async fn donate(&self, amount_wei: U256) -> Result<PendingTransaction, Error> {
        self.send(ICharityLedger::donateCall {}, amount_wei).await
    }

    /// Propose a spending request.
    ///
    /// Ownership is enforced by the contract, not here. The recipient string is
    /// only parsed for encoding; an unparseable address is a rejected call.
    pub async fn create_spending_request(
        &self,
        description: &str,
        amount_wei: U256,
        recipient: &str,
        receipt_reference: &str,
    ) -> Result<PendingTransaction, Error> {
        let recipient = Address::from_str(recipient.trim()).map_err(|e| {
            Error::CallRejected(format!("invalid recipient address '{}': {}", recipient, e))
        })?;
        let call = ICharityLedger::createSpendingRequestCall {
            description: description.to_string(),
            amount: amount_wei,
            recipient,
            receiptCID: receipt_reference.to_string(),
        };
        self.send(call, U256::ZERO).await
    }

    /// Execute the spending request with the given id
    pub async fn execute_spending_request(&self, id: u64) -> Result<PendingTransaction, Error> {
        let call = ICharityLedger::executeSpendingRequestCall { id: U256::from(id) };
        self.send(call, U256::ZERO).await
    }

    // ============ Read accessors ============

    /// Address of the contract owner
    pub async fn owner(&self) -> Result<Address, Error> {
        let result = self.call(ICharityLedger::ownerCall {}).await?;
        Ok(result._0)
    }

    /// Network balance held at the contract address
    pub async fn balance(&self) -> Result<U256, Error> {
        let value = self
            .provider
            .request("eth_getBalance", json!([self.address, "latest"]))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Number of recorded donations
    pub async fn donation_count(&self) -> Result<U256, Error> {
        let result = self.call(ICharityLedger::getDonationsCountCall {}).await?;
        Ok(result._0)
    }

    /// Donation entry at a zero-based index
    pub async fn donation_at(&self, index: u64) -> Result<DonationRecord, Error> {
        self.call(ICharityLedger::donationsCall {
            index: U256::from(index),
        })
        .await
    }

    /// Number of spending requests created so far
    pub async fn request_count(&self) -> Result<U256, Error> {
        let result = self.call(ICharityLedger::requestCountCall {}).await?;
        Ok(result._0)
    }

    /// Spending request stored under a one-based id
    pub async fn request_at(&self, id: u64) -> Result<SpendingRequestRecord, Error> {
        self.call(ICharityLedger::spendingRequestsCall { id: U256::from(id) })
            .await
    }

    // ============ Transport ============

    async fn call<T: SolCall>(&self, call: T) -> Result<T::Return, Error> {
        let data = Bytes::from(call.abi_encode());
        let mut request = json!({ "to": self.address, "data": data });
        if let Some(signer) = &self.signer {
            request["from"] = json!(signer.account());
        }

        let value = self
            .provider
            .request("eth_call", json!([request, "latest"]))
            .await?;
        let output: Bytes = serde_json::from_value(value)?;

        T::abi_decode_returns(&output, false).map_err(|e| {
            Error::Rpc(format!(
                "Failed to decode {} result: {}",
                T::SIGNATURE,
                e
            ))
        })
    }

    async fn send<T: SolCall>(&self, call: T, value: U256) -> Result<PendingTransaction, Error> {
        let signer = self.signer.as_ref().ok_or(Error::NotConnected)?;
        let data = Bytes::from(call.abi_encode());
        let name = self
            .interface
            .as_ref()
            .and_then(|interface| interface.describe_calldata(&data))
            .unwrap_or_else(|| T::SIGNATURE.to_string());

        debug!("Submitting {} to {} with value {}", name, self.address, value);
        let request = TransactionRequest::new(signer.account())
            .to(self.address)
            .value(value)
            .data(data);

        let hash = signer.send_transaction(request).await.map_err(|e| {
            warn!("{} was rejected: {}", name, e);
            match e {
                Error::CallRejected(reason) => Error::CallRejected(reason),
                other => Error::CallRejected(other.to_string()),
            }
        })?;

        Ok(PendingTransaction::new(
            hash,
            self.provider.clone(),
            self.wait_policy,
        ))
    }
}

impl std::fmt::Debug for ContractGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractGateway")
            .field("address", &self.address)
            .field("signer", &self.signer.as_ref().map(|s| s.account()))
            .field("wait_policy", &self.wait_policy)
            .finish()
    }
}
