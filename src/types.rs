//! Core domain types shared across the saga

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

/// User-supplied token parameters. Immutable once a saga starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
    /// Token display name
    pub name: String,

    /// Token ticker symbol
    pub symbol: String,

    /// Number of decimal places (0-18)
    pub decimals: u8,

    /// Initial supply before decimal scaling
    pub initial_supply: u64,

    /// Optional off-chain metadata pointer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Errors produced by [`TokenRequest::validate`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("token name must not be empty")]
    EmptyName,

    #[error("token symbol must not be empty")]
    EmptySymbol,

    #[error("decimals must be at most {max}, got {got}")]
    DecimalsOutOfRange { max: u8, got: u8 },

    #[error("initial supply must be positive")]
    ZeroSupply,

    #[error("scaled supply {supply} * 10^{decimals} exceeds the ledger amount field")]
    SupplyOverflow { supply: u64, decimals: u8 },
}

/// Maximum supported decimal places
pub const MAX_DECIMALS: u8 = 18;

impl TokenRequest {
    /// Validate all user-supplied fields.
    ///
    /// Called exactly once before a saga starts; the request is treated as
    /// immutable afterwards.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.name.trim().is_empty() {
            return Err(RequestError::EmptyName);
        }
        if self.symbol.trim().is_empty() {
            return Err(RequestError::EmptySymbol);
        }
        if self.decimals > MAX_DECIMALS {
            return Err(RequestError::DecimalsOutOfRange {
                max: MAX_DECIMALS,
                got: self.decimals,
            });
        }
        if self.initial_supply == 0 {
            return Err(RequestError::ZeroSupply);
        }
        // Fail early so no custodial resource is spent on an unmintable supply
        self.scaled_supply()?;
        Ok(())
    }

    /// The integer amount minted on-ledger: `initial_supply * 10^decimals`.
    ///
    /// Integer-only arithmetic; the intermediate runs in u128 so a supply
    /// that would overflow the ledger's u64 amount field is rejected
    /// instead of silently truncated.
    pub fn scaled_supply(&self) -> Result<u64, RequestError> {
        let scaled = (self.initial_supply as u128) * 10u128.pow(self.decimals as u32);
        u64::try_from(scaled).map_err(|_| RequestError::SupplyOverflow {
            supply: self.initial_supply,
            decimals: self.decimals,
        })
    }
}

/// Final output of a fully completed saga
#[derive(Debug, Clone)]
pub struct MintReceipt {
    /// The new mint address (public half of the ephemeral identity)
    pub mint_address: Pubkey,

    /// Associated token account holding the initial supply
    pub token_account_address: Pubkey,

    /// Signature of the finalized mint-creation transaction
    pub create_signature: Signature,

    /// Signature of the metadata transaction, absent when no URI was given
    /// or when the best-effort attachment failed
    pub metadata_signature: Option<Signature>,

    /// Signature of the finalized authority-transfer transaction
    pub authority_signature: Signature,

    /// The fee payment this saga consumed
    pub fee_signature: Signature,
}

/// Wire-format request accepted from callers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub initial_supply: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub user_address: String,
    pub fee_signature: String,
}

impl MintRequest {
    pub fn token_request(&self) -> TokenRequest {
        TokenRequest {
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            decimals: self.decimals,
            initial_supply: self.initial_supply,
            uri: self.uri.clone(),
        }
    }
}

/// Wire-format success response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintResponse {
    pub mint_address: String,
    pub token_account_address: String,
    pub create_signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_signature: Option<String>,
    pub authority_signature: String,
    pub fee_signature: String,
}

impl From<&MintReceipt> for MintResponse {
    fn from(receipt: &MintReceipt) -> Self {
        Self {
            mint_address: receipt.mint_address.to_string(),
            token_account_address: receipt.token_account_address.to_string(),
            create_signature: receipt.create_signature.to_string(),
            metadata_signature: receipt.metadata_signature.map(|s| s.to_string()),
            authority_signature: receipt.authority_signature.to_string(),
            fee_signature: receipt.fee_signature.to_string(),
        }
    }
}

/// Wire-format failure response.
///
/// `error_kind` is a stable machine-readable discriminant; `message` is a
/// generic description that never leaks raw RPC internals to untrusted
/// callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error_kind: String,
    pub message: String,
}

/// Target cluster for explorer links
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cluster {
    MainnetBeta,
    Devnet,
    Testnet,
}

impl Cluster {
    fn query_param(&self) -> &'static str {
        match self {
            Cluster::MainnetBeta => "",
            Cluster::Devnet => "?cluster=devnet",
            Cluster::Testnet => "?cluster=testnet",
        }
    }
}

/// Kind of entity an explorer link points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorerEntity {
    Address,
    Transaction,
}

/// Build a Solana explorer URL for an address or transaction signature.
pub fn explorer_url(entity: ExplorerEntity, id: &str, cluster: Cluster) -> String {
    let path = match entity {
        ExplorerEntity::Address => "address",
        ExplorerEntity::Transaction => "tx",
    };
    format!(
        "https://explorer.solana.com/{}/{}{}",
        path,
        id,
        cluster.query_param()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> TokenRequest {
        TokenRequest {
            name: "Test Token".to_string(),
            symbol: "TST".to_string(),
            decimals: 9,
            initial_supply: 1_000_000,
            uri: None,
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut req = valid_request();
        req.name = "   ".to_string();
        assert_eq!(req.validate(), Err(RequestError::EmptyName));
    }

    #[test]
    fn test_empty_symbol_rejected() {
        let mut req = valid_request();
        req.symbol = String::new();
        assert_eq!(req.validate(), Err(RequestError::EmptySymbol));
    }

    #[test]
    fn test_decimals_out_of_range() {
        let mut req = valid_request();
        req.decimals = 19;
        assert_eq!(
            req.validate(),
            Err(RequestError::DecimalsOutOfRange { max: 18, got: 19 })
        );
    }

    #[test]
    fn test_zero_supply_rejected() {
        let mut req = valid_request();
        req.initial_supply = 0;
        assert_eq!(req.validate(), Err(RequestError::ZeroSupply));
    }

    #[test]
    fn test_scaling_is_exact() {
        let req = valid_request();
        // 1_000_000 * 10^9
        assert_eq!(req.scaled_supply().unwrap(), 1_000_000_000_000_000);
    }

    #[test]
    fn test_scaling_overflow_rejected() {
        let mut req = valid_request();
        req.initial_supply = u64::MAX;
        req.decimals = 18;
        assert!(matches!(
            req.scaled_supply(),
            Err(RequestError::SupplyOverflow { .. })
        ));
    }

    #[test]
    fn test_explorer_url() {
        assert_eq!(
            explorer_url(ExplorerEntity::Address, "abc", Cluster::Devnet),
            "https://explorer.solana.com/address/abc?cluster=devnet"
        );
        assert_eq!(
            explorer_url(ExplorerEntity::Transaction, "sig", Cluster::MainnetBeta),
            "https://explorer.solana.com/tx/sig"
        );
    }

    mod scaling_props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn scaled_supply_never_truncates(supply in 1u64..=u64::MAX, decimals in 0u8..=18) {
                let req = TokenRequest {
                    name: "P".to_string(),
                    symbol: "P".to_string(),
                    decimals,
                    initial_supply: supply,
                    uri: None,
                };
                match req.scaled_supply() {
                    Ok(scaled) => {
                        // Exact: dividing back recovers the input
                        prop_assert_eq!(scaled as u128, (supply as u128) * 10u128.pow(decimals as u32));
                    }
                    Err(RequestError::SupplyOverflow { .. }) => {
                        prop_assert!((supply as u128) * 10u128.pow(decimals as u32) > u64::MAX as u128);
                    }
                    Err(other) => prop_assert!(false, "unexpected error: {}", other),
                }
            }
        }
    }
}
