//! In-memory chain used by the integration tests.
//!
//! Implements the wallet `request` boundary and executes the charity ledger
//! contract against plain Rust state. Calldata is decoded with the same `sol!`
//! bindings the client encodes with.
#![allow(dead_code)]

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolInterface};
use async_trait::async_trait;
use charity_ledger::config::ClientConfig;
use charity_ledger::evm::contracts::ICharityLedger::{self, ICharityLedgerCalls};
use charity_ledger::{
    ContractGateway, Error, Signer, TransactionRequest, TxWaitPolicy, WalletProvider,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CHAIN_ID: u64 = 11155111;

/// 2024-01-01 00:00:00 UTC
pub const GENESIS_TIMESTAMP: u64 = 1_704_067_200;

pub fn owner() -> Address {
    Address::repeat_byte(0x0a)
}

pub fn donor() -> Address {
    Address::repeat_byte(0xd0)
}

pub fn recipient() -> Address {
    Address::repeat_byte(0x7e)
}

pub fn ether(amount: u64) -> U256 {
    U256::from(amount) * U256::from(10u64).pow(U256::from(18u64))
}

#[derive(Debug, Clone)]
pub struct RequestEntry {
    pub id: U256,
    pub description: String,
    pub amount: U256,
    pub recipient: Address,
    pub is_complete: bool,
    pub receipt_cid: String,
}

#[derive(Debug)]
pub struct ChainState {
    pub chain_id: u64,
    /// Accounts the wallet grants on `eth_requestAccounts`
    pub accounts: Vec<Address>,
    pub owner: Address,
    pub balance: U256,
    pub donations: Vec<(Address, U256, U256)>,
    /// Slot `i` answers `spendingRequests(i + 1)`
    pub requests: Vec<RequestEntry>,
    pub block: u64,
    pub timestamp: u64,
    receipts: HashMap<B256, Value>,
    /// Receipts stay unavailable while set
    pub hold_receipts: bool,
    /// Every send is declined by the wallet with this message
    pub decline_sends: Option<String>,
    /// Sends are mined but revert
    pub revert_mined: bool,
    /// `eth_call` to this function fails at the transport
    pub fail_call: Option<&'static str>,
    /// Both counters report this instead of the stored length
    pub reported_count: Option<U256>,
    /// Method log, e.g. `eth_chainId`, `call:donations(0)`, `send:donate`
    pub log: Vec<String>,
}

pub struct MockChain {
    state: Mutex<ChainState>,
}

impl MockChain {
    /// A chain on the required network whose wallet grants `account`
    pub fn new(account: Address) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ChainState {
                chain_id: CHAIN_ID,
                accounts: vec![account],
                owner: owner(),
                balance: U256::ZERO,
                donations: Vec::new(),
                requests: Vec::new(),
                block: 100,
                timestamp: GENESIS_TIMESTAMP,
                receipts: HashMap::new(),
                hold_receipts: false,
                decline_sends: None,
                revert_mined: false,
                fail_call: None,
                reported_count: None,
                log: Vec::new(),
            }),
        })
    }

    pub fn edit<R>(&self, f: impl FnOnce(&mut ChainState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn log(&self) -> Vec<String> {
        self.edit(|state| state.log.clone())
    }

    pub fn clear_log(&self) {
        self.edit(|state| state.log.clear());
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.edit(|state| state.log.iter().filter(|entry| entry.starts_with(prefix)).count())
    }

    pub fn account(&self) -> Address {
        self.edit(|state| state.accounts[0])
    }

    /// Record a donation directly in contract storage
    pub fn seed_donation(&self, from: Address, wei: U256) {
        self.edit(|state| {
            state.timestamp += 12;
            let timestamp = U256::from(state.timestamp);
            state.donations.push((from, wei, timestamp));
            state.balance += wei;
        });
    }

    /// Record a spending request directly in contract storage
    pub fn seed_request(&self, description: &str, wei: U256, cid: &str) {
        self.edit(|state| {
            let id = U256::from(state.requests.len() + 1);
            state.requests.push(RequestEntry {
                id,
                description: description.to_string(),
                amount: wei,
                recipient: recipient(),
                is_complete: false,
                receipt_cid: cid.to_string(),
            });
        });
    }

    fn call(state: &mut ChainState, data: &Bytes) -> Result<Vec<u8>, Error> {
        let call = ICharityLedgerCalls::abi_decode(data, true)
            .map_err(|e| Error::Rpc(format!("bad calldata: {}", e)))?;

        let (name, encoded) = match call {
            ICharityLedgerCalls::owner(_) => (
                "owner()".to_string(),
                ICharityLedger::ownerCall::abi_encode_returns(&(state.owner,)),
            ),
            ICharityLedgerCalls::getBalance(_) => (
                "getBalance()".to_string(),
                ICharityLedger::getBalanceCall::abi_encode_returns(&(state.balance,)),
            ),
            ICharityLedgerCalls::totalDonations(_) => {
                let total = state
                    .donations
                    .iter()
                    .fold(U256::ZERO, |sum, (_, amount, _)| sum + *amount);
                (
                    "totalDonations()".to_string(),
                    ICharityLedger::totalDonationsCall::abi_encode_returns(&(total,)),
                )
            }
            ICharityLedgerCalls::getDonationsCount(_) => (
                "getDonationsCount()".to_string(),
                ICharityLedger::getDonationsCountCall::abi_encode_returns(&(state
                    .reported_count
                    .unwrap_or(U256::from(state.donations.len())),)),
            ),
            ICharityLedgerCalls::donations(call) => {
                let index = call.index.to::<usize>();
                let (donor, amount, timestamp) = *state
                    .donations
                    .get(index)
                    .ok_or_else(|| Error::Rpc("execution reverted".to_string()))?;
                (
                    format!("donations({})", index),
                    ICharityLedger::donationsCall::abi_encode_returns(&(donor, amount, timestamp)),
                )
            }
            ICharityLedgerCalls::requestCount(_) => (
                "requestCount()".to_string(),
                ICharityLedger::requestCountCall::abi_encode_returns(&(state
                    .reported_count
                    .unwrap_or(U256::from(state.requests.len())),)),
            ),
            ICharityLedgerCalls::spendingRequests(call) => {
                let id = call.id.to::<usize>();
                // unset mapping slots read as zeroed structs
                let entry = id
                    .checked_sub(1)
                    .and_then(|slot| state.requests.get(slot))
                    .cloned()
                    .unwrap_or(RequestEntry {
                        id: U256::ZERO,
                        description: String::new(),
                        amount: U256::ZERO,
                        recipient: Address::ZERO,
                        is_complete: false,
                        receipt_cid: String::new(),
                    });
                (
                    format!("spendingRequests({})", id),
                    ICharityLedger::spendingRequestsCall::abi_encode_returns(&(
                        entry.id,
                        entry.description,
                        entry.amount,
                        entry.recipient,
                        entry.is_complete,
                        entry.receipt_cid,
                    )),
                )
            }
            _ => return Err(Error::Rpc("not a view function".to_string())),
        };

        let function = name.split('(').next().unwrap_or_default().to_string();
        state.log.push(format!("call:{}", name));
        if state.fail_call.map_or(false, |failing| failing == function) {
            return Err(Error::Rpc("connection reset by peer".to_string()));
        }
        Ok(encoded)
    }

    fn send(state: &mut ChainState, request: TransactionRequest) -> Result<B256, Error> {
        let call = ICharityLedgerCalls::abi_decode(&request.data, true)
            .map_err(|e| Error::Rpc(format!("bad calldata: {}", e)))?;
        let name = match &call {
            ICharityLedgerCalls::donate(_) => "donate",
            ICharityLedgerCalls::createSpendingRequest(_) => "createSpendingRequest",
            ICharityLedgerCalls::executeSpendingRequest(_) => "executeSpendingRequest",
            _ => "other",
        };
        state.log.push(format!("send:{}", name));

        if let Some(message) = &state.decline_sends {
            return Err(Error::Rpc(message.clone()));
        }

        state.block += 1;
        state.timestamp += 12;
        let hash = B256::left_padding_from(&state.block.to_be_bytes());

        let status = if state.revert_mined {
            "0x0"
        } else {
            Self::execute(state, request.from, request.value.unwrap_or_default(), call)?;
            "0x1"
        };
        state.receipts.insert(
            hash,
            json!({
                "transactionHash": hash,
                "blockNumber": format!("{:#x}", state.block),
                "status": status,
                "gasUsed": "0x5208",
            }),
        );
        Ok(hash)
    }

    fn execute(
        state: &mut ChainState,
        from: Address,
        value: U256,
        call: ICharityLedgerCalls,
    ) -> Result<(), Error> {
        let revert = |reason: &str| Err(Error::Rpc(format!("execution reverted: {}", reason)));
        match call {
            ICharityLedgerCalls::donate(_) => {
                if value.is_zero() {
                    return revert("Donation must be greater than 0");
                }
                let timestamp = U256::from(state.timestamp);
                state.donations.push((from, value, timestamp));
                state.balance += value;
            }
            ICharityLedgerCalls::createSpendingRequest(call) => {
                if from != state.owner {
                    return revert("Only owner can call this function");
                }
                let id = U256::from(state.requests.len() + 1);
                state.requests.push(RequestEntry {
                    id,
                    description: call.description,
                    amount: call.amount,
                    recipient: call.recipient,
                    is_complete: false,
                    receipt_cid: call.receiptCID,
                });
            }
            ICharityLedgerCalls::executeSpendingRequest(call) => {
                if from != state.owner {
                    return revert("Only owner can call this function");
                }
                let slot = call.id.to::<usize>().checked_sub(1);
                let Some(entry) = slot.and_then(|slot| state.requests.get_mut(slot)) else {
                    return revert("Request does not exist");
                };
                if entry.is_complete {
                    return revert("Request already completed");
                }
                if state.balance < entry.amount {
                    return revert("Insufficient balance");
                }
                entry.is_complete = true;
                state.balance -= entry.amount;
            }
            _ => return revert("not a mutating function"),
        }
        Ok(())
    }
}

#[async_trait]
impl WalletProvider for MockChain {
    async fn request(&self, method: &str, params: Value) -> Result<Value, Error> {
        let mut state = self.state.lock().unwrap();
        match method {
            "eth_chainId" => {
                state.log.push(method.to_string());
                Ok(json!(format!("{:#x}", state.chain_id)))
            }
            "eth_requestAccounts" => {
                state.log.push(method.to_string());
                Ok(json!(state.accounts))
            }
            "eth_blockNumber" => Ok(json!(format!("{:#x}", state.block))),
            "eth_getBalance" => {
                state.log.push(method.to_string());
                if state.fail_call == Some("balance") {
                    return Err(Error::Rpc("connection reset by peer".to_string()));
                }
                Ok(json!(state.balance))
            }
            "eth_call" => {
                let data: Bytes = serde_json::from_value(params[0]["data"].clone())?;
                let output = Self::call(&mut state, &data)?;
                Ok(json!(Bytes::from(output)))
            }
            "eth_sendTransaction" => {
                let request: TransactionRequest = serde_json::from_value(params[0].clone())?;
                let hash = Self::send(&mut state, request)?;
                Ok(json!(hash))
            }
            "eth_getTransactionReceipt" => {
                if state.hold_receipts {
                    return Ok(Value::Null);
                }
                let hash: B256 = serde_json::from_value(params[0].clone())?;
                Ok(state.receipts.get(&hash).cloned().unwrap_or(Value::Null))
            }
            other => Err(Error::Rpc(format!("method {} not supported", other))),
        }
    }
}

pub fn fast_policy() -> TxWaitPolicy {
    TxWaitPolicy {
        poll_interval: Duration::from_millis(1),
        confirmations: 1,
    }
}

/// Gateway bound to the chain's first granted account
pub fn gateway(chain: &Arc<MockChain>) -> ContractGateway {
    let provider: Arc<dyn WalletProvider> = chain.clone();
    let signer = Signer::new(chain.account(), provider);
    ContractGateway::new(contract_address(), signer).with_wait_policy(fast_policy())
}

pub fn contract_address() -> Address {
    ClientConfig::default().contract_address().unwrap()
}

/// Default configuration with fast receipt polling
pub fn test_config() -> ClientConfig {
    let mut config = ClientConfig::default();
    config.transactions.poll_interval_ms = 1;
    config
}
