pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod evm;
pub mod ledger;
pub mod state;
pub mod wallet;

// Main client exports
pub use client::{CharityClient, CharityClientBuilder, SyncFactory};
pub use config::ClientConfig;
pub use error::Error;

// Operation and view exports
pub use coordinator::{Operation, TransactionCoordinator};
pub use state::{Action, Notice, ViewHandle, ViewState};

// Ledger exports
pub use ledger::{Donation, LedgerSnapshot, LedgerSync, SequentialSync, SpendingRequest};

// Wallet and contract exports
pub use evm::{
    ContractGateway, ICharityLedger, InterfaceDescription, PendingTransaction,
    TransactionReceipt, TransactionRequest, TxWaitPolicy,
};
pub use wallet::{ChainSession, HttpWalletProvider, SessionState, Signer, WalletProvider};

// Re-export primitive types used throughout the public API
pub use alloy_primitives::{Address, B256, U256};
