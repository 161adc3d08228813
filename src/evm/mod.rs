/// EVM support for the charity ledger client
///
/// - `abi`: the contract's published JSON interface description
/// - `contracts`: typed `sol!` bindings and the [`ContractGateway`](contracts::ContractGateway)
/// - `tx`: transaction requests, receipts and pending-transaction handles
/// - `types`: native-unit amount and timestamp normalization
pub mod abi;
pub mod contracts;
pub mod tx;
pub mod types;

pub use abi::InterfaceDescription;
pub use contracts::{ContractGateway, ICharityLedger};
pub use tx::{PendingTransaction, TransactionReceipt, TransactionRequest, TxWaitPolicy};
