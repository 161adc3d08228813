//! Client configuration
//!
//! Settings are layered: built-in defaults, then `charity.toml` /
//! `charity.json` files found on the search path, then `CHARITY_*`
//! environment variables. The merged result is validated before use.

use config::{Config as ConfigLoader, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::Address;

use crate::error::Error;
use crate::evm::abi::InterfaceDescription;
use crate::evm::tx::TxWaitPolicy;

/// Environment variable prefix for every override
const ENV_PREFIX: &str = "CHARITY";

/// Configuration file names, in order of preference
const CONFIG_FILES: [&str; 2] = ["charity.toml", "charity.json"];

/// Sepolia test network
pub const DEFAULT_CHAIN_ID: u64 = 11155111;

/// Deployed charity ledger contract on Sepolia
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x4d3D95FBD81f68e98734290bf2E112d809321874";

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

pub const DEFAULT_RECEIPT_GATEWAY: &str = "https://ipfs.io";

/// Network the client must be connected to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Display name (e.g., "sepolia")
    pub name: String,
    /// The single chain id the wallet must report
    pub chain_id: u64,
    /// JSON-RPC endpoint used by the command-line client
    pub rpc_url: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "sepolia".to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            rpc_url: DEFAULT_RPC_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    pub address: String,
    /// Interface description to use instead of the embedded one
    pub abi_path: Option<String>,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            abi_path: None,
        }
    }
}

/// How submitted transactions are awaited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Delay between receipt polls, in milliseconds
    pub poll_interval_ms: u64,
    /// Blocks required before a transaction counts as final
    pub confirmations: u64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            confirmations: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptConfig {
    /// Content gateway used to build receipt links
    pub gateway_url: String,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_RECEIPT_GATEWAY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (compact, pretty, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// Complete client configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub network: NetworkConfig,
    pub contract: ContractConfig,
    pub transactions: TransactionConfig,
    pub receipts: ReceiptConfig,
    pub logging: LoggingConfig,
    /// Files merged into this configuration, lowest precedence first
    #[serde(skip)]
    pub loaded_files: Vec<String>,
}

impl ClientConfig {
    /// Load configuration from files and the process environment
    pub fn load() -> Result<Self, Error> {
        let paths: Vec<PathBuf> = search_paths()
            .into_iter()
            .flat_map(|dir| CONFIG_FILES.iter().map(move |file| dir.join(file)))
            .filter(|path| path.exists())
            .collect();

        let mut config = Self::from_files(&paths)?;
        config.apply_env(|key| env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from one file, then apply environment overrides
    pub fn load_from_file(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let mut config = Self::from_files(&[path.to_path_buf()])?;
        config.apply_env(|key| env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Merge files over the defaults; later files take precedence
    fn from_files(paths: &[PathBuf]) -> Result<Self, Error> {
        let mut builder = ConfigLoader::builder();
        for path in paths {
            let format = match path.extension().and_then(|ext| ext.to_str()) {
                Some("json") => FileFormat::Json,
                _ => FileFormat::Toml,
            };
            builder = builder.add_source(File::from(path.as_path()).format(format));
        }

        let settings = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to load config file: {}", e)))?;
        let mut config: ClientConfig = settings
            .try_deserialize()
            .map_err(|e| Error::Config(format!("Invalid configuration: {}", e)))?;
        config.loaded_files = paths
            .iter()
            .map(|path| path.to_string_lossy().to_string())
            .collect();

        Ok(config)
    }

    /// Override settings from `CHARITY_*` variables resolved through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}_{}", ENV_PREFIX, name));

        if let Some(name) = var("NETWORK_NAME") {
            self.network.name = name;
        }
        if let Some(chain_id) = var("CHAIN_ID") {
            self.network.chain_id = parse_number("CHAIN_ID", &chain_id)?;
        }
        if let Some(rpc_url) = var("RPC_URL") {
            self.network.rpc_url = rpc_url;
        }
        if let Some(address) = var("CONTRACT_ADDRESS") {
            self.contract.address = address;
        }
        if let Some(abi_path) = var("ABI_PATH") {
            self.contract.abi_path = Some(abi_path);
        }
        if let Some(interval) = var("POLL_INTERVAL_MS") {
            self.transactions.poll_interval_ms = parse_number("POLL_INTERVAL_MS", &interval)?;
        }
        if let Some(confirmations) = var("CONFIRMATIONS") {
            self.transactions.confirmations = parse_number("CONFIRMATIONS", &confirmations)?;
        }
        if let Some(gateway_url) = var("RECEIPT_GATEWAY") {
            self.receipts.gateway_url = gateway_url;
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), Error> {
        if self.network.chain_id == 0 {
            return Err(Error::Config("Chain id must be greater than 0".to_string()));
        }

        if !is_http_url(&self.network.rpc_url) {
            return Err(Error::Config(
                "RPC URL must start with http:// or https://".to_string(),
            ));
        }

        self.contract_address()?;

        if self.transactions.poll_interval_ms == 0 {
            return Err(Error::Config(
                "Poll interval must be greater than 0".to_string(),
            ));
        }

        if self.transactions.confirmations == 0 {
            return Err(Error::Config(
                "Confirmations must be at least 1".to_string(),
            ));
        }

        if !is_http_url(&self.receipts.gateway_url) {
            return Err(Error::Config(
                "Receipt gateway URL must start with http:// or https://".to_string(),
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(Error::Config(format!(
                "Invalid log level '{}'. Must be one of: {:?}",
                self.logging.level, valid_levels
            )));
        }

        let valid_formats = ["compact", "pretty", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(Error::Config(format!(
                "Invalid log format '{}'. Must be one of: {:?}",
                self.logging.format, valid_formats
            )));
        }

        Ok(())
    }

    /// Parsed contract address
    pub fn contract_address(&self) -> Result<Address, Error> {
        Address::from_str(self.contract.address.trim()).map_err(|e| {
            Error::Config(format!(
                "Invalid contract address '{}': {}",
                self.contract.address, e
            ))
        })
    }

    pub fn wait_policy(&self) -> TxWaitPolicy {
        TxWaitPolicy {
            poll_interval: Duration::from_millis(self.transactions.poll_interval_ms),
            confirmations: self.transactions.confirmations,
        }
    }

    /// Interface description from `contract.abi_path`, or the embedded one
    pub fn interface(&self) -> Result<InterfaceDescription, Error> {
        match &self.contract.abi_path {
            Some(path) => InterfaceDescription::from_file(path),
            None => InterfaceDescription::charity_ledger(),
        }
    }

    /// Save configuration to file as TOML
    pub fn save_to_file(&self, file_path: &Path) -> Result<(), Error> {
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(file_path, content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;
        Ok(())
    }

    /// Default location for a user-level configuration file
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("charity-ledger")
            .join(CONFIG_FILES[0])
    }
}

/// Directories searched for configuration files, lowest precedence first
fn search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("charity-ledger"));
    }
    paths.push(PathBuf::from("."));
    paths.push(PathBuf::from("config"));
    if let Ok(dir) = env::var(format!("{}_CONFIG_DIR", ENV_PREFIX)) {
        paths.push(PathBuf::from(dir));
    }
    paths
}

fn parse_number(name: &str, value: &str) -> Result<u64, Error> {
    value.trim().parse().map_err(|e| {
        Error::Config(format!(
            "Invalid {}_{} value '{}': {}",
            ENV_PREFIX, name, value, e
        ))
    })
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
