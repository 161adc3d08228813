/// Contract interface description
///
/// The deployed charity contract publishes a fixed JSON interface. It is
/// embedded at build time and parsed with `alloy-json-abi` so that calldata can
/// be named in diagnostics and so the typed `sol!` bindings can be checked
/// against the published description.
use crate::error::Error;
use alloy_json_abi::{Event, Function, JsonAbi};
use std::fs;
use std::path::Path;

/// Published JSON interface of the charity ledger contract.
pub const CHARITY_LEDGER_ABI: &str = include_str!("../../abi/CharityLedger.json");

/// Parsed call-interface description of a contract
#[derive(Debug, Clone)]
pub struct InterfaceDescription {
    abi: JsonAbi,
}

impl InterfaceDescription {
    /// Parse an interface description from a JSON string
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let abi: JsonAbi = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Failed to parse ABI JSON: {}", e)))?;
        Ok(Self { abi })
    }

    /// Load an interface description from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!(
                "Failed to read ABI file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    /// The embedded charity ledger description
    pub fn charity_ledger() -> Result<Self, Error> {
        Self::from_json(CHARITY_LEDGER_ABI)
    }

    /// Get a function by name
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.abi.functions().find(|f| f.name == name)
    }

    /// Get an event by name
    pub fn event(&self, name: &str) -> Option<&Event> {
        self.abi.events().find(|e| e.name == name)
    }

    /// Resolve the function targeted by a calldata payload.
    ///
    /// Returns the canonical signature, e.g. `executeSpendingRequest(uint256)`.
    pub fn describe_calldata(&self, data: &[u8]) -> Option<String> {
        let selector = data.get(..4)?;
        self.abi
            .functions()
            .find(|f| f.selector().as_slice() == selector)
            .map(|f| f.signature())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evm::contracts::ICharityLedger;
    use alloy_primitives::U256;
    use alloy_sol_types::SolCall;

    #[test]
    fn test_embedded_description_parses() {
        let description = InterfaceDescription::charity_ledger().unwrap();
        for name in [
            "donate",
            "createSpendingRequest",
            "executeSpendingRequest",
            "owner",
            "getDonationsCount",
            "donations",
            "requestCount",
            "spendingRequests",
        ] {
            assert!(description.function(name).is_some(), "missing {}", name);
        }
        assert!(description.event("Donated").is_some());
        assert!(description.event("RequestExecuted").is_some());
    }

    #[test]
    fn test_typed_bindings_match_description() {
        let description = InterfaceDescription::charity_ledger().unwrap();
        let pairs: [(&str, [u8; 4]); 6] = [
            ("donate", ICharityLedger::donateCall::SELECTOR),
            (
                "createSpendingRequest",
                ICharityLedger::createSpendingRequestCall::SELECTOR,
            ),
            (
                "executeSpendingRequest",
                ICharityLedger::executeSpendingRequestCall::SELECTOR,
            ),
            ("donations", ICharityLedger::donationsCall::SELECTOR),
            (
                "spendingRequests",
                ICharityLedger::spendingRequestsCall::SELECTOR,
            ),
            ("requestCount", ICharityLedger::requestCountCall::SELECTOR),
        ];
        for (name, selector) in pairs {
            let function = description.function(name).unwrap();
            assert_eq!(function.selector().0, selector, "selector drift for {}", name);
        }
    }

    #[test]
    fn test_describe_calldata() {
        let description = InterfaceDescription::charity_ledger().unwrap();
        let data = ICharityLedger::executeSpendingRequestCall { id: U256::from(3u64) }.abi_encode();
        assert_eq!(
            description.describe_calldata(&data).as_deref(),
            Some("executeSpendingRequest(uint256)")
        );
        assert_eq!(description.describe_calldata(&[0xde, 0xad]), None);
        assert_eq!(description.describe_calldata(&[0, 0, 0, 0]), None);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        assert!(matches!(
            InterfaceDescription::from_json("{not json"),
            Err(Error::Config(_))
        ));
    }
}
