/// Wallet session lifecycle
///
/// A [`ChainSession`] is created once per process with whatever provider the
/// environment offers, and moves from `Uninitialized` to `Connected` on an
/// explicit [`connect`](ChainSession::connect). There is no programmatic
/// disconnect; the session ends with the process.
use crate::error::Error;
use crate::evm::tx::TransactionRequest;
use crate::wallet::provider::{self, WalletProvider};
use alloy_primitives::{Address, B256};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Capability to sign and submit transactions from the authorized account
#[derive(Clone)]
pub struct Signer {
    account: Address,
    provider: Arc<dyn WalletProvider>,
}

impl Signer {
    pub fn new(account: Address, provider: Arc<dyn WalletProvider>) -> Self {
        Self { account, provider }
    }

    /// The account transactions are sent from
    pub fn account(&self) -> Address {
        self.account
    }

    pub fn provider(&self) -> &Arc<dyn WalletProvider> {
        &self.provider
    }

    /// Hand a transaction to the wallet for signing and broadcast.
    ///
    /// Returns the transaction hash once the wallet has accepted it.
    pub async fn send_transaction(&self, request: TransactionRequest) -> Result<B256, Error> {
        let value = self
            .provider
            .request("eth_sendTransaction", json!([request]))
            .await?;
        Ok(serde_json::from_value(value)?)
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("account", &self.account)
            .finish()
    }
}

/// An authenticated binding to a wallet account on the required network
#[derive(Debug, Clone)]
pub struct Connection {
    pub account: Address,
    pub chain_id: u64,
    pub signer: Signer,
}

#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Connected(Connection),
}

/// Owns the connection to the wallet provider
pub struct ChainSession {
    provider: Option<Arc<dyn WalletProvider>>,
    required_chain_id: u64,
    observed_chain_id: Option<u64>,
    state: SessionState,
}

impl ChainSession {
    /// Create a session for the given environment.
    ///
    /// `provider` is `None` when the environment has no wallet; every
    /// subsequent [`connect`](Self::connect) then fails with
    /// [`Error::ProviderAbsent`].
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, required_chain_id: u64) -> Self {
        if provider.is_none() {
            warn!("No wallet provider available in this environment");
        }
        Self {
            provider,
            required_chain_id,
            observed_chain_id: None,
            state: SessionState::Uninitialized,
        }
    }

    /// Authenticate with the wallet.
    ///
    /// Checks the provider's network before asking for accounts, so a wallet
    /// on the wrong network never yields an account or a signer. A failed
    /// attempt leaves any earlier connection in place.
    pub async fn connect(&mut self) -> Result<Address, Error> {
        let provider = self.provider.clone().ok_or(Error::ProviderAbsent)?;

        let chain_id = provider::chain_id(provider.as_ref()).await?;
        self.observed_chain_id = Some(chain_id);
        if chain_id != self.required_chain_id {
            warn!(
                "Wallet is on chain {}, expected {}",
                chain_id, self.required_chain_id
            );
            return Err(Error::WrongNetwork {
                expected: self.required_chain_id,
                actual: chain_id,
            });
        }

        let accounts = provider::request_accounts(provider.as_ref()).await?;
        let account = match accounts.first() {
            Some(account) => *account,
            None => {
                warn!("Wallet granted no accounts");
                return Err(Error::NotConnected);
            }
        };

        let signer = Signer::new(account, provider);
        self.state = SessionState::Connected(Connection {
            account,
            chain_id,
            signer,
        });
        info!("Connected {} on chain {}", account, chain_id);

        Ok(account)
    }

    /// The active signer
    pub fn get_signer(&self) -> Result<&Signer, Error> {
        match &self.state {
            SessionState::Connected(connection) => Ok(&connection.signer),
            SessionState::Uninitialized => Err(Error::NotConnected),
        }
    }

    pub fn account(&self) -> Option<Address> {
        match &self.state {
            SessionState::Connected(connection) => Some(connection.account),
            SessionState::Uninitialized => None,
        }
    }

    /// Chain id last reported by the provider, whether or not it was accepted
    pub fn observed_chain_id(&self) -> Option<u64> {
        self.observed_chain_id
    }

    pub fn required_chain_id(&self) -> u64 {
        self.required_chain_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, SessionState::Connected(_))
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }
}
