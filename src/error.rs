//! Crate-wide error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No wallet provider was injected into the environment.
    #[error("No wallet provider is available. Install a wallet to use this client.")]
    ProviderAbsent,

    #[error("Wrong network: expected chain id {expected}, wallet reports {actual}")]
    WrongNetwork { expected: u64, actual: u64 },

    #[error("Wallet is not connected")]
    NotConnected,

    /// The provider or the contract declined a mutating call. Covers declined
    /// signatures, reverted preconditions and insufficient funds alike.
    #[error("Call rejected: {0}")]
    CallRejected(String),

    #[error("Ledger synchronization failed: {0}")]
    Sync(String),

    /// Carries the label of the operation that currently holds the gate.
    #[error("Another operation is in progress: {0}")]
    OperationInProgress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether retrying the same action can succeed without a code change.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Error::ProviderAbsent | Error::Config(_))
    }
}
