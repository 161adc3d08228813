//! Ledger synchronization that re-reads every record on each pass.

use crate::error::Error;
use crate::evm::contracts::{ContractGateway, DonationRecord, SpendingRequestRecord};
use crate::evm::types::{format_native_amount, normalize_timestamp};
use crate::ledger::{Donation, LedgerSnapshot, LedgerSync, SpendingRequest};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use tracing::{debug, info, warn};

const MAX_PREALLOCATION: u64 = 1024;

/// Full re-synchronization through counters and indexed getters.
///
/// Reads are issued one at a time in index order, each awaited before the
/// next. Record sets are expected to stay small, so every refresh re-reads
/// everything instead of diffing against the previous pass.
#[derive(Debug, Clone)]
pub struct SequentialSync {
    gateway: ContractGateway,
}

impl SequentialSync {
    pub fn new(gateway: ContractGateway) -> Self {
        Self { gateway }
    }

    async fn read_donations(&self) -> Result<Vec<Donation>, Error> {
        let count = self
            .gateway
            .donation_count()
            .await
            .map_err(|e| sync_error("reading donation count", e))?;
        let count = record_count(count, "donation")?;
        debug!("Reading {} donations", count);

        // sized from an untrusted counter; grow as records actually arrive
        let mut donations = Vec::with_capacity(preallocation(count));
        for index in 0..count {
            let record = self
                .gateway
                .donation_at(index)
                .await
                .map_err(|e| sync_error(&format!("reading donation {}", index), e))?;
            if let Some(donation) = normalize_donation(index, record)? {
                donations.push(donation);
            }
        }
        donations.reverse();
        Ok(donations)
    }

    async fn read_requests(&self) -> Result<Vec<SpendingRequest>, Error> {
        let count = self
            .gateway
            .request_count()
            .await
            .map_err(|e| sync_error("reading request count", e))?;
        let count = record_count(count, "request")?;
        debug!("Reading {} spending requests", count);

        let mut requests = Vec::with_capacity(preallocation(count));
        // ids are 1-based; slot 0 is never a valid request
        for id in 1..=count {
            let record = self
                .gateway
                .request_at(id)
                .await
                .map_err(|e| sync_error(&format!("reading request {}", id), e))?;
            if let Some(request) = normalize_request(id, record)? {
                requests.push(request);
            }
        }
        requests.reverse();
        Ok(requests)
    }
}

#[async_trait]
impl LedgerSync for SequentialSync {
    async fn refresh(&self) -> Result<LedgerSnapshot, Error> {
        let balance_wei = self
            .gateway
            .balance()
            .await
            .map_err(|e| sync_error("reading balance", e))?;
        let owner = self
            .gateway
            .owner()
            .await
            .map_err(|e| sync_error("reading owner", e))?;
        let donations = self.read_donations().await?;
        let requests = self.read_requests().await?;

        info!(
            "Synchronized ledger: balance {}, {} donations, {} requests",
            format_native_amount(balance_wei),
            donations.len(),
            requests.len()
        );

        Ok(LedgerSnapshot {
            balance: format_native_amount(balance_wei),
            balance_wei,
            owner,
            donations,
            requests,
        })
    }
}

fn sync_error(context: &str, error: Error) -> Error {
    match error {
        Error::Sync(message) => Error::Sync(format!("{}: {}", context, message)),
        other => Error::Sync(format!("{}: {}", context, other)),
    }
}

fn record_count(count: U256, what: &str) -> Result<u64, Error> {
    if count > U256::from(u64::MAX) {
        return Err(Error::Sync(format!("{} count {} is out of range", what, count)));
    }
    Ok(count.to::<u64>())
}

fn preallocation(count: u64) -> usize {
    count.min(MAX_PREALLOCATION) as usize
}

/// Normalize a donation entry. An entry without a donor is a gap in the
/// array, not a donation, and is dropped. Zero-amount entries from real
/// donors are kept.
pub(crate) fn normalize_donation(
    index: u64,
    record: DonationRecord,
) -> Result<Option<Donation>, Error> {
    if record.donor == Address::ZERO {
        warn!("Skipping donation {} with no donor", index);
        return Ok(None);
    }
    let (recorded_at, timestamp) = normalize_timestamp(record.timestamp)
        .map_err(|e| sync_error(&format!("donation {}", index), e))?;

    Ok(Some(Donation {
        donor: record.donor,
        amount: format_native_amount(record.amount),
        amount_wei: record.amount,
        timestamp,
        recorded_at,
    }))
}

/// Normalize a spending-request entry. Entries with a non-positive id are
/// dropped as gaps.
pub(crate) fn normalize_request(
    slot: u64,
    record: SpendingRequestRecord,
) -> Result<Option<SpendingRequest>, Error> {
    if record.id.is_zero() {
        warn!("Skipping empty spending request at slot {}", slot);
        return Ok(None);
    }
    let id = record_count(record.id, "request id")?;
    let receipt_reference = Some(record.receiptCID).filter(|cid| !cid.trim().is_empty());

    Ok(Some(SpendingRequest {
        id,
        description: record.description,
        amount: format_native_amount(record.amount),
        amount_wei: record.amount,
        recipient: record.recipient,
        is_complete: record.isComplete,
        receipt_reference,
    }))
}
