//! Client-side views of the contract's two append-only record sets.
//!
//! [`LedgerSync`] is the seam between callers and the retrieval strategy.
//! [`SequentialSync`] reads counters and indexed getters one call at a time;
//! a batched or event-indexed strategy can replace it without touching
//! callers.

pub mod sequential;

pub use sequential::SequentialSync;

use crate::error::Error;
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A donation as displayed, normalized from its on-chain entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Donation {
    pub donor: Address,
    /// Decimal amount in the native unit, e.g. `"0.1"`
    pub amount: String,
    pub amount_wei: U256,
    /// Human-readable moment, e.g. `"2024-01-01 00:00:00 UTC"`
    pub timestamp: String,
    pub recorded_at: DateTime<Utc>,
}

/// An owner-proposed withdrawal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpendingRequest {
    /// Assigned by the contract, starting at 1
    pub id: u64,
    pub description: String,
    pub amount: String,
    pub amount_wei: U256,
    pub recipient: Address,
    pub is_complete: bool,
    /// Identifier into an external content-addressed store
    pub receipt_reference: Option<String>,
}

impl SpendingRequest {
    /// Retrieval link for the receipt through a content gateway, e.g.
    /// `https://ipfs.io/ipfs/<cid>`. The reference is neither validated nor
    /// fetched.
    pub fn receipt_url(&self, gateway: &str) -> Option<String> {
        self.receipt_reference
            .as_ref()
            .map(|cid| format!("{}/ipfs/{}", gateway.trim_end_matches('/'), cid))
    }

    pub fn is_pending(&self) -> bool {
        !self.is_complete
    }
}

/// Everything one synchronization pass reads from the chain.
///
/// Lists are ordered most-recent-first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSnapshot {
    pub balance: String,
    pub balance_wei: U256,
    pub owner: Address,
    pub donations: Vec<Donation>,
    pub requests: Vec<SpendingRequest>,
}

/// Strategy that reconstructs a full [`LedgerSnapshot`] from the chain
#[async_trait]
pub trait LedgerSync: Send + Sync {
    /// Re-read every record. Fails with [`Error::Sync`] if any read fails; the
    /// caller's previous snapshot must then be kept as is.
    async fn refresh(&self) -> Result<LedgerSnapshot, Error>;
}
