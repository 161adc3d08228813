//! Mutating operations, one at a time.
//!
//! [`TransactionCoordinator::submit`] drives an operation through the gateway,
//! waits for finality and re-synchronizes the ledger. The in-flight label in
//! the view doubles as the single-flight gate: while it is set, every other
//! submission is refused without reaching the gateway.

use crate::error::Error;
use crate::evm::contracts::ContractGateway;
use crate::evm::tx::{PendingTransaction, TransactionReceipt};
use crate::evm::types::parse_native_amount;
use crate::ledger::LedgerSync;
use crate::state::{Notice, ViewHandle};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// A mutating ledger operation as requested by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    Donate {
        /// Decimal amount in the native unit
        amount: String,
    },
    CreateRequest {
        description: String,
        amount: String,
        /// Passed through to the contract unvalidated
        recipient: String,
        receipt_reference: Option<String>,
    },
    ExecuteRequest {
        id: u64,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Donate { .. } => "donate",
            Operation::CreateRequest { .. } => "create_request",
            Operation::ExecuteRequest { .. } => "execute_request",
        }
    }

    /// In-flight label shown while the operation is pending
    pub fn default_label(&self) -> String {
        match self {
            Operation::Donate { .. } => "Processing your donation... Please wait.".to_string(),
            Operation::CreateRequest { .. } => {
                "Creating spending request... Please confirm in your wallet.".to_string()
            }
            Operation::ExecuteRequest { id } => {
                format!("Executing request #{}... Please wait.", id)
            }
        }
    }

    /// Notice recorded once the operation is final and the ledger re-read
    pub fn success_message(&self) -> String {
        match self {
            Operation::Donate { .. } => "Thank you for your generous donation!".to_string(),
            Operation::CreateRequest { .. } => "Spending request created successfully!".to_string(),
            Operation::ExecuteRequest { id } => {
                format!("Request {} has been executed successfully!", id)
            }
        }
    }

    /// Value-bearing amount of the operation, in the smallest unit
    fn amount_wei(&self) -> Result<Option<U256>, Error> {
        let amount = match self {
            Operation::Donate { amount } | Operation::CreateRequest { amount, .. } => amount,
            Operation::ExecuteRequest { .. } => return Ok(None),
        };
        let wei = parse_native_amount(amount)?;
        if wei.is_zero() {
            return Err(Error::InvalidAmount(format!(
                "'{}' must be greater than zero",
                amount.trim()
            )));
        }
        Ok(Some(wei))
    }
}

/// Clears the in-flight label when dropped, whichever way `submit` exits
struct InFlightGuard<'a> {
    view: &'a ViewHandle,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(view: &'a ViewHandle, label: &str) -> Result<Self, Error> {
        view.begin(label)?;
        Ok(Self { view })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.view.finish();
    }
}

pub struct TransactionCoordinator {
    gateway: ContractGateway,
    sync: Arc<dyn LedgerSync>,
    view: ViewHandle,
}

impl TransactionCoordinator {
    pub fn new(gateway: ContractGateway, sync: Arc<dyn LedgerSync>, view: ViewHandle) -> Self {
        Self {
            gateway,
            sync,
            view,
        }
    }

    pub fn gateway(&self) -> &ContractGateway {
        &self.gateway
    }

    /// Submit `operation`, showing `label` while it is pending.
    ///
    /// Returns the receipt once the transaction is final and the ledger has
    /// been re-read. On failure the previous ledger snapshot is kept and a
    /// failure notice is recorded. A refused submission
    /// ([`Error::OperationInProgress`]) leaves the view untouched, whatever
    /// the operation carries. An invalid amount is reported before the
    /// gateway is contacted.
    pub async fn submit(
        &self,
        operation: Operation,
        label: impl Into<String>,
    ) -> Result<TransactionReceipt, Error> {
        let label = label.into();
        let guard = InFlightGuard::acquire(&self.view, &label).map_err(|e| {
            warn!("Refusing {}: {}", operation.name(), e);
            e
        })?;
        let amount_wei = match operation.amount_wei() {
            Ok(amount_wei) => amount_wei,
            Err(e) => {
                warn!("Refusing {}: {}", operation.name(), e);
                self.view.notify(Notice::Failure(e.to_string()));
                return Err(e);
            }
        };
        info!("{}", label);

        let result = self.run(&operation, amount_wei).await;
        match &result {
            Ok(receipt) => {
                info!(
                    "{} completed in block {}",
                    operation.name(),
                    receipt.block()
                );
                self.view
                    .notify(Notice::Success(operation.success_message()));
            }
            Err(e) => {
                error!("{} failed: {}", operation.name(), e);
                self.view.notify(Notice::Failure(e.to_string()));
            }
        }
        drop(guard);
        result
    }

    async fn run(
        &self,
        operation: &Operation,
        amount_wei: Option<U256>,
    ) -> Result<TransactionReceipt, Error> {
        let amount_wei = amount_wei.unwrap_or(U256::ZERO);
        let pending: PendingTransaction = match operation {
            Operation::Donate { .. } => self.gateway.donate(amount_wei).await?,
            Operation::CreateRequest {
                description,
                recipient,
                receipt_reference,
                ..
            } => {
                self.gateway
                    .create_spending_request(
                        description,
                        amount_wei,
                        recipient,
                        receipt_reference.as_deref().unwrap_or_default(),
                    )
                    .await?
            }
            Operation::ExecuteRequest { id } => self.gateway.execute_spending_request(*id).await?,
        };
        info!("Submitted {} as {}", operation.name(), pending.hash());

        let receipt = pending.wait().await?;
        let snapshot = self.sync.refresh().await?;
        self.view.update(|state| state.apply_snapshot(snapshot));
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_and_messages() {
        let execute = Operation::ExecuteRequest { id: 7 };
        assert_eq!(execute.default_label(), "Executing request #7... Please wait.");
        assert_eq!(
            execute.success_message(),
            "Request 7 has been executed successfully!"
        );
        let donate = Operation::Donate {
            amount: "0.1".to_string(),
        };
        assert_eq!(donate.success_message(), "Thank you for your generous donation!");
    }

    #[test]
    fn test_amount_validation() {
        let donate = |amount: &str| Operation::Donate {
            amount: amount.to_string(),
        };
        assert_eq!(
            donate("0.1").amount_wei().unwrap(),
            Some(U256::from(100_000_000_000_000_000u64))
        );
        assert!(matches!(donate("0").amount_wei(), Err(Error::InvalidAmount(_))));
        assert!(matches!(donate("-1").amount_wei(), Err(Error::InvalidAmount(_))));
        assert!(matches!(donate("abc").amount_wei(), Err(Error::InvalidAmount(_))));
        assert_eq!(Operation::ExecuteRequest { id: 1 }.amount_wei().unwrap(), None);
    }
}
