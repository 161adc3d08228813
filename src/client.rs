/// Charity ledger client
///
/// Main entry point. Owns the wallet session and, once connected, the
/// contract gateway, the ledger synchronization strategy and the transaction
/// coordinator. Everything a presentation layer needs is read from
/// [`view`](CharityClient::view).
use crate::config::ClientConfig;
use crate::coordinator::{Operation, TransactionCoordinator};
use crate::error::Error;
use crate::evm::abi::InterfaceDescription;
use crate::evm::contracts::ContractGateway;
use crate::evm::tx::TransactionReceipt;
use crate::ledger::{LedgerSync, SequentialSync, SpendingRequest};
use crate::state::{Notice, ViewHandle, ViewState};
use crate::wallet::{ChainSession, WalletProvider};
use alloy_primitives::Address;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Builds the ledger synchronization strategy for a freshly bound gateway
pub type SyncFactory = Box<dyn Fn(ContractGateway) -> Arc<dyn LedgerSync> + Send + Sync>;

/// Parts that exist only while a session is connected
struct Bound {
    sync: Arc<dyn LedgerSync>,
    coordinator: TransactionCoordinator,
}

pub struct CharityClient {
    config: ClientConfig,
    session: ChainSession,
    contract_address: Address,
    interface: Arc<InterfaceDescription>,
    sync_factory: SyncFactory,
    bound: Option<Bound>,
    view: ViewHandle,
}

impl CharityClient {
    /// Start building a client
    pub fn builder() -> CharityClientBuilder {
        CharityClientBuilder::new()
    }

    /// Authenticate with the wallet and load the ledger.
    ///
    /// On a wrong network the view records the observed network as invalid
    /// and no gateway is bound. The connection stands even if the initial
    /// ledger load fails; that failure is returned and can be retried with
    /// [`refresh`](Self::refresh).
    ///
    /// A failed re-connect keeps the earlier binding so the ledger stays
    /// readable. If it failed with [`Error::WrongNetwork`], mutating
    /// operations are refused until a later `connect` succeeds.
    pub async fn connect(&mut self) -> Result<Address, Error> {
        let account = match self.session.connect().await {
            Ok(account) => account,
            Err(e) => {
                let observed = self.session.observed_chain_id();
                self.view.update(|state| {
                    if let Error::WrongNetwork { actual, .. } = &e {
                        state.network_id = Some(*actual);
                        state.network_valid = false;
                    } else if observed.is_some() {
                        state.network_id = observed;
                    }
                    state.last_notice = Some(Notice::Failure(e.to_string()));
                });
                error!("Failed to connect wallet: {}", e);
                return Err(e);
            }
        };

        let signer = self.session.get_signer()?.clone();
        let gateway = ContractGateway::new(self.contract_address, signer)
            .with_wait_policy(self.config.wait_policy())
            .with_interface(self.interface.clone());
        let sync = (self.sync_factory)(gateway.clone());
        let coordinator = TransactionCoordinator::new(gateway, sync.clone(), self.view.clone());
        self.bound = Some(Bound { sync, coordinator });

        let chain_id = self.session.required_chain_id();
        self.view.update(|state| {
            state.account = Some(account);
            state.network_id = Some(chain_id);
            state.network_valid = true;
        });
        info!(
            "Bound charity ledger at {} for {}",
            self.contract_address, account
        );

        self.refresh().await?;
        Ok(account)
    }

    /// Re-read the whole ledger into the view.
    ///
    /// A failed refresh keeps the previous snapshot.
    pub async fn refresh(&self) -> Result<(), Error> {
        let result = match &self.bound {
            Some(bound) => bound.sync.refresh().await,
            None => Err(Error::NotConnected),
        };
        match result {
            Ok(snapshot) => {
                self.view.update(|state| state.apply_snapshot(snapshot));
                Ok(())
            }
            Err(e) => {
                error!("Failed to refresh ledger: {}", e);
                self.view.notify(Notice::Failure(e.to_string()));
                Err(e)
            }
        }
    }

    /// Donate `amount`, a decimal in the native unit (e.g. `"0.1"`)
    pub async fn donate(&self, amount: &str) -> Result<TransactionReceipt, Error> {
        self.submit(Operation::Donate {
            amount: amount.to_string(),
        })
        .await
    }

    /// Propose a spending request. Only the contract owner can succeed.
    pub async fn create_spending_request(
        &self,
        description: &str,
        amount: &str,
        recipient: &str,
        receipt_reference: Option<&str>,
    ) -> Result<TransactionReceipt, Error> {
        self.submit(Operation::CreateRequest {
            description: description.to_string(),
            amount: amount.to_string(),
            recipient: recipient.to_string(),
            receipt_reference: receipt_reference.map(str::to_string),
        })
        .await
    }

    /// Execute a pending spending request. Only the contract owner can succeed.
    pub async fn execute_spending_request(&self, id: u64) -> Result<TransactionReceipt, Error> {
        self.submit(Operation::ExecuteRequest { id }).await
    }

    /// Submit an operation under its default label
    pub async fn submit(&self, operation: Operation) -> Result<TransactionReceipt, Error> {
        let label = operation.default_label();
        let bound = match &self.bound {
            Some(bound) => bound,
            None => {
                warn!("Cannot {} before the wallet is connected", operation.name());
                self.view.notify(Notice::Failure(Error::NotConnected.to_string()));
                return Err(Error::NotConnected);
            }
        };

        let view = self.view.snapshot();
        if !view.network_valid {
            let e = Error::WrongNetwork {
                expected: self.session.required_chain_id(),
                actual: view
                    .network_id
                    .unwrap_or(self.session.required_chain_id()),
            };
            warn!("Cannot {}: {}", operation.name(), e);
            self.view.notify(Notice::Failure(e.to_string()));
            return Err(e);
        }

        bound.coordinator.submit(operation, label).await
    }

    /// Copy of the current view
    pub fn view(&self) -> ViewState {
        self.view.snapshot()
    }

    /// Shared handle to the live view
    pub fn view_handle(&self) -> ViewHandle {
        self.view.clone()
    }

    pub fn session(&self) -> &ChainSession {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn contract_address(&self) -> Address {
        self.contract_address
    }

    /// Retrieval link for a request's receipt through the configured gateway
    pub fn receipt_url(&self, request: &SpendingRequest) -> Option<String> {
        request.receipt_url(&self.config.receipts.gateway_url)
    }
}

impl std::fmt::Debug for CharityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CharityClient")
            .field("contract_address", &self.contract_address)
            .field("account", &self.session.account())
            .field("connected", &self.bound.is_some())
            .finish()
    }
}

/// Builder pattern for CharityClient construction
pub struct CharityClientBuilder {
    config: Option<ClientConfig>,
    provider: Option<Arc<dyn WalletProvider>>,
    sync_factory: Option<SyncFactory>,
}

impl CharityClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: None,
            provider: None,
            sync_factory: None,
        }
    }

    /// Use this configuration instead of the defaults
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the wallet provider. Without one, `connect` fails with
    /// [`Error::ProviderAbsent`].
    pub fn with_provider(mut self, provider: Arc<dyn WalletProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Replace the default [`SequentialSync`] strategy
    pub fn with_sync_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(ContractGateway) -> Arc<dyn LedgerSync> + Send + Sync + 'static,
    {
        self.sync_factory = Some(Box::new(factory));
        self
    }

    /// Build the client. Configuration problems surface here, wallet and
    /// network problems only on `connect`.
    pub fn build(self) -> Result<CharityClient, Error> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let contract_address = config.contract_address()?;
        let interface = Arc::new(config.interface()?);
        let session = ChainSession::new(self.provider, config.network.chain_id);
        let sync_factory: SyncFactory = match self.sync_factory {
            Some(factory) => factory,
            None => Box::new(|gateway: ContractGateway| -> Arc<dyn LedgerSync> {
                Arc::new(SequentialSync::new(gateway))
            }),
        };

        Ok(CharityClient {
            config,
            session,
            contract_address,
            interface,
            sync_factory,
            bound: None,
            view: ViewHandle::default(),
        })
    }
}

impl Default for CharityClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
