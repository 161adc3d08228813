/// EVM contract interfaces and helpers
///
/// Type-safe interfaces for the contracts this client talks to, generated with
/// the Alloy `sol!` macro.
pub mod charity;

pub use charity::{ContractGateway, DonationRecord, ICharityLedger, SpendingRequestRecord};
