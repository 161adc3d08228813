//! Presentation-facing view of the client.
//!
//! [`ViewState`] is everything a presentation layer may read. The ledger part
//! is replaced wholesale by each synchronization; only the in-flight label and
//! the last notice are updated in place.

use crate::error::Error;
use crate::ledger::{Donation, LedgerSnapshot, SpendingRequest};
use alloy_primitives::Address;
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};

/// User-visible outcome of the last operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "lowercase")]
pub enum Notice {
    Success(String),
    Failure(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Success(message) | Notice::Failure(message) => message,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Notice::Failure(_))
    }
}

/// Mutating action a presentation layer may offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    Donate,
    CreateRequest,
    ExecuteRequest(u64),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub account: Option<Address>,
    pub network_id: Option<u64>,
    /// Whether the wallet's network matches the required one
    pub network_valid: bool,
    pub ledger: Option<LedgerSnapshot>,
    /// Label of the pending mutating operation, if any
    pub in_flight: Option<String>,
    pub last_notice: Option<Notice>,
}

impl ViewState {
    /// Ledger balance in the native unit; `"0.0"` before the first sync
    pub fn balance(&self) -> &str {
        self.ledger
            .as_ref()
            .map_or("0.0", |ledger| ledger.balance.as_str())
    }

    pub fn owner(&self) -> Option<Address> {
        self.ledger.as_ref().map(|ledger| ledger.owner)
    }

    /// Donations, most recent first
    pub fn donations(&self) -> &[Donation] {
        self.ledger
            .as_ref()
            .map(|ledger| ledger.donations.as_slice())
            .unwrap_or_default()
    }

    /// Spending requests, most recent first
    pub fn requests(&self) -> &[SpendingRequest] {
        self.ledger
            .as_ref()
            .map(|ledger| ledger.requests.as_slice())
            .unwrap_or_default()
    }

    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether the authenticated account is the contract owner.
    ///
    /// Address comparison ignores hex case, so checksummed and lowercase forms
    /// match. This flag only decides which actions are shown. It grants
    /// nothing: the contract enforces ownership on every call regardless of
    /// what the client believes.
    pub fn is_owner(&self) -> bool {
        match (self.account, self.owner()) {
            (Some(account), Some(owner)) => account == owner,
            _ => false,
        }
    }

    /// Actions to expose for the current session and ledger
    pub fn available_actions(&self) -> Vec<Action> {
        if !self.is_connected() || !self.network_valid {
            return Vec::new();
        }
        let mut actions = vec![Action::Donate];
        if self.is_owner() {
            actions.push(Action::CreateRequest);
            actions.extend(
                self.requests()
                    .iter()
                    .filter(|request| request.is_pending())
                    .map(|request| Action::ExecuteRequest(request.id)),
            );
        }
        actions
    }

    /// Replace all ledger data with a freshly synchronized snapshot
    pub fn apply_snapshot(&mut self, snapshot: LedgerSnapshot) {
        self.ledger = Some(snapshot);
    }
}

/// Shared handle to the view, cloned into every component that updates it
#[derive(Debug, Clone, Default)]
pub struct ViewHandle(Arc<RwLock<ViewState>>);

impl ViewHandle {
    pub fn new(state: ViewState) -> Self {
        Self(Arc::new(RwLock::new(state)))
    }

    /// Copy of the current view
    pub fn snapshot(&self) -> ViewState {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run `f` with exclusive access to the view
    pub fn update<R>(&self, f: impl FnOnce(&mut ViewState) -> R) -> R {
        let mut state = self.0.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    pub fn in_flight(&self) -> Option<String> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .in_flight
            .clone()
    }

    /// Set the in-flight label unless one is already set.
    ///
    /// Check and set happen under one lock, so two racing callers cannot both
    /// take the gate.
    pub(crate) fn begin(&self, label: &str) -> Result<(), Error> {
        self.update(|state| match &state.in_flight {
            Some(current) => Err(Error::OperationInProgress(current.clone())),
            None => {
                state.in_flight = Some(label.to_string());
                Ok(())
            }
        })
    }

    pub(crate) fn finish(&self) {
        self.update(|state| state.in_flight = None);
    }

    pub(crate) fn notify(&self, notice: Notice) {
        self.update(|state| state.last_notice = Some(notice));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use std::str::FromStr;

    fn request(id: u64, is_complete: bool) -> SpendingRequest {
        SpendingRequest {
            id,
            description: format!("Request {}", id),
            amount: "1.0".to_string(),
            amount_wei: U256::from(1_000_000_000_000_000_000u64),
            recipient: Address::repeat_byte(0x33),
            is_complete,
            receipt_reference: None,
        }
    }

    fn view(account: &str, owner: &str) -> ViewState {
        ViewState {
            account: Some(Address::from_str(account).unwrap()),
            network_id: Some(11155111),
            network_valid: true,
            ledger: Some(LedgerSnapshot {
                balance: "2.5".to_string(),
                balance_wei: U256::from(2_500_000_000_000_000_000u64),
                owner: Address::from_str(owner).unwrap(),
                donations: Vec::new(),
                requests: vec![request(2, false), request(1, true)],
            }),
            in_flight: None,
            last_notice: None,
        }
    }

    #[test]
    fn test_owner_match_ignores_case() {
        let state = view(
            "0x4d3d95fbd81f68e98734290bf2e112d809321874",
            "0x4D3D95FBD81F68E98734290BF2E112D809321874",
        );
        assert!(state.is_owner());
        assert_eq!(
            state.available_actions(),
            vec![Action::Donate, Action::CreateRequest, Action::ExecuteRequest(2)]
        );
    }

    #[test]
    fn test_non_owner_only_donates() {
        let state = view(
            "0x1111111111111111111111111111111111111111",
            "0x4d3D95FBD81f68e98734290bf2E112d809321874",
        );
        assert!(!state.is_owner());
        assert_eq!(state.available_actions(), vec![Action::Donate]);
    }

    #[test]
    fn test_defaults_before_sync() {
        let state = ViewState::default();
        assert_eq!(state.balance(), "0.0");
        assert!(state.donations().is_empty());
        assert!(!state.is_owner());
        assert!(state.available_actions().is_empty());
    }

    #[test]
    fn test_gate_is_exclusive() {
        let handle = ViewHandle::default();
        handle.begin("Processing your donation... Please wait.").unwrap();
        match handle.begin("Executing request #1... Please wait.") {
            Err(Error::OperationInProgress(label)) => {
                assert_eq!(label, "Processing your donation... Please wait.")
            }
            other => panic!("expected OperationInProgress, got {:?}", other),
        }
        handle.finish();
        assert!(handle.in_flight().is_none());
        assert!(handle.begin("again").is_ok());
    }
}
