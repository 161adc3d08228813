/// Wallet provider boundary
///
/// A wallet provider is modelled after the EIP-1193 `request` function: a
/// single entry point taking a JSON-RPC method name and positional params.
/// Browser wallets, node-managed accounts and test doubles all fit behind it.
use crate::error::Error;
use alloy_primitives::{Address, U64};
use alloy_provider::{Provider, ProviderBuilder, RootProvider};
use alloy_transport_http::{Client, Http};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

/// Capability injected by the execution environment to authorize accounts,
/// report the active network and sign/submit transactions.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Issue a JSON-RPC request through the provider.
    async fn request(&self, method: &str, params: Value) -> Result<Value, Error>;
}

/// Query the provider's active chain id (`eth_chainId`).
pub async fn chain_id(provider: &dyn WalletProvider) -> Result<u64, Error> {
    let value = provider.request("eth_chainId", json!([])).await?;
    let chain_id: U64 = serde_json::from_value(value)?;
    Ok(chain_id.to::<u64>())
}

/// Ask the provider to authorize accounts (`eth_requestAccounts`).
///
/// Browser wallets prompt the user here; the returned list may be empty.
pub async fn request_accounts(provider: &dyn WalletProvider) -> Result<Vec<Address>, Error> {
    let value = provider.request("eth_requestAccounts", json!([])).await?;
    Ok(serde_json::from_value(value)?)
}

/// Current head block number (`eth_blockNumber`).
pub async fn block_number(provider: &dyn WalletProvider) -> Result<u64, Error> {
    let value = provider.request("eth_blockNumber", json!([])).await?;
    let number: U64 = serde_json::from_value(value)?;
    Ok(number.to::<u64>())
}

/// Provider backed by a JSON-RPC node that manages the signing account.
///
/// Nodes do not implement the wallet-only `eth_requestAccounts`, so it is
/// answered with the node's `eth_accounts`.
#[derive(Clone)]
pub struct HttpWalletProvider {
    provider: RootProvider<Http<Client>>,
    rpc_url: String,
}

impl HttpWalletProvider {
    /// Create a provider for the given RPC endpoint
    pub fn new(rpc_url: &str) -> Result<Self, Error> {
        let url = url::Url::parse(rpc_url)
            .map_err(|e| Error::Config(format!("Invalid RPC URL: {}", e)))?;
        let provider = ProviderBuilder::new().on_http(url);

        Ok(Self {
            provider,
            rpc_url: rpc_url.to_string(),
        })
    }

    /// The endpoint this provider talks to
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }
}

#[async_trait]
impl WalletProvider for HttpWalletProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, Error> {
        let method = match method {
            "eth_requestAccounts" => "eth_accounts",
            other => other,
        };
        debug!("rpc -> {} {}", method, params);

        self.provider
            .raw_request::<Value, Value>(method.to_string().into(), params)
            .await
            .map_err(|e| Error::Rpc(e.to_string()))
    }
}
