//! Custodial fee-payer key management
//!
//! The custodial signer is loaded once per process and shared read-only
//! between sagas. The secret never appears in logs or in the Debug output;
//! decoded intermediate bytes are zeroized.

use anyhow::{Context, Result};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::sync::Arc;
use zeroize::Zeroize;

use crate::config::CUSTODIAL_KEY_ENV;

/// Process-wide custodial fee payer.
///
/// Owns the lamports that pay fees and rent during mint creation and acts
/// as temporary mint authority until handover.
#[derive(Clone)]
pub struct CustodialSigner {
    keypair: Arc<Keypair>,
}

impl CustodialSigner {
    /// Build from a base58-encoded 64-byte secret key.
    pub fn from_base58(secret: &str) -> Result<Self> {
        let mut bytes = bs58::decode(secret.trim())
            .into_vec()
            .context("Custodial key is not valid base58")?;

        let result = Self::from_secret_bytes(&bytes);
        bytes.zeroize();
        result
    }

    /// Build from the `TOKENFORGE_CUSTODIAL_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var(CUSTODIAL_KEY_ENV).with_context(|| {
            format!("Custodial key not configured (set {})", CUSTODIAL_KEY_ENV)
        })?;
        Self::from_base58(&secret)
    }

    fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 64 {
            anyhow::bail!(
                "Invalid custodial key length: expected 64 bytes, got {}",
                bytes.len()
            );
        }
        if bytes.iter().all(|&b| b == 0) {
            anyhow::bail!("Invalid custodial key: all-zero key rejected");
        }
        let keypair = Keypair::try_from(bytes).context("Invalid custodial keypair bytes")?;
        Ok(Self {
            keypair: Arc::new(keypair),
        })
    }

    /// Wrap an existing keypair (tests substitute a throwaway signer here).
    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Public key of the custodial payer
    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Borrow the keypair for signing
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

// Secret material must never leak through Debug output
impl std::fmt::Debug for CustodialSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustodialSigner")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_base58() {
        let keypair = Keypair::new();
        let encoded = bs58::encode(keypair.to_bytes()).into_string();
        let signer = CustodialSigner::from_base58(&encoded).unwrap();
        assert_eq!(signer.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(CustodialSigner::from_base58("not-base58-!!").is_err());
    }

    #[test]
    fn test_rejects_short_key() {
        let encoded = bs58::encode([1u8; 32]).into_string();
        let err = CustodialSigner::from_base58(&encoded).unwrap_err();
        assert!(err.to_string().contains("expected 64 bytes"));
    }

    #[test]
    fn test_rejects_all_zero_key() {
        let encoded = bs58::encode([0u8; 64]).into_string();
        let err = CustodialSigner::from_base58(&encoded).unwrap_err();
        assert!(err.to_string().contains("all-zero"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let keypair = Keypair::new();
        let secret = bs58::encode(keypair.to_bytes()).into_string();
        let signer = CustodialSigner::from_keypair(keypair);
        let debug = format!("{:?}", signer);
        assert!(debug.contains(&signer.pubkey().to_string()));
        assert!(!debug.contains(&secret));
    }
}
