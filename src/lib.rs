//! Fee-gated SPL token minting saga
//!
//! Validates an independently submitted fee payment on the ledger, then
//! creates a new fungible-token mint, funds the user's associated token
//! account with the initial supply, best-effort attaches metadata, and
//! hands mint authority over to the user.

pub mod config;
pub mod ledger;
pub mod saga;
pub mod types;
pub mod wallet;

#[cfg(test)]
#[path = "tests/mod.rs"]
mod tests;

// Re-export commonly used types
pub use config::Config;
pub use saga::{MintOutcome, SagaController, SagaError, SagaSettings};
pub use types::{MintReceipt, MintRequest, MintResponse, TokenRequest};
pub use wallet::CustodialSigner;
