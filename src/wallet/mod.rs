//! Wallet boundary: the injected provider capability and the session that
//! authenticates against it.

pub mod provider;
pub mod session;

pub use provider::{HttpWalletProvider, WalletProvider};
pub use session::{ChainSession, Connection, SessionState, Signer};
