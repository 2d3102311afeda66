//! Multi-party signing for saga transactions
//!
//! Two signer roles exist: the long-lived custodial fee payer and the
//! ephemeral per-mint keypair. The fee payer is fixed to the custodial key
//! for every saga-internal transaction (the user only pays the initial fee
//! transfer). Signing is synchronous and fails loudly; a partially-signed
//! transaction is never handed to the submitter.

use solana_sdk::{
    hash::Hash,
    signature::{Keypair, Signer},
    transaction::Transaction,
};

use crate::saga::errors::SigningError;
use crate::saga::instructions::InstructionPlan;
use crate::wallet::CustodialSigner;

/// Roles that can co-sign a saga transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerRole {
    /// Long-lived custodial fee payer
    CustodialFeePayer,

    /// Ephemeral per-mint identity
    EphemeralMint,
}

impl std::fmt::Display for SignerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CustodialFeePayer => write!(f, "custodial_fee_payer"),
            Self::EphemeralMint => write!(f, "ephemeral_mint"),
        }
    }
}

/// Attaches signatures for exactly the roles a plan requires
pub struct SigningCoordinator<'a> {
    custodial: &'a CustodialSigner,
}

impl<'a> SigningCoordinator<'a> {
    pub fn new(custodial: &'a CustodialSigner) -> Self {
        Self { custodial }
    }

    /// Build and fully sign a transaction from a plan against `blockhash`.
    ///
    /// `ephemeral_mint` must be present iff the plan's role set names
    /// [`SignerRole::EphemeralMint`].
    pub fn sign(
        &self,
        plan: &InstructionPlan,
        ephemeral_mint: Option<&Keypair>,
        blockhash: Hash,
    ) -> Result<Transaction, SigningError> {
        let mut signers: Vec<&Keypair> = Vec::with_capacity(plan.signer_roles.len());
        for role in &plan.signer_roles {
            match role {
                SignerRole::CustodialFeePayer => signers.push(self.custodial.keypair()),
                SignerRole::EphemeralMint => match ephemeral_mint {
                    Some(keypair) => signers.push(keypair),
                    None => {
                        return Err(SigningError::MissingSigner(
                            SignerRole::EphemeralMint.to_string(),
                        ))
                    }
                },
            }
        }
        if !plan.signer_roles.contains(&SignerRole::CustodialFeePayer) {
            // The custodial key pays the fee on every saga transaction, so
            // it must always be in the role set.
            return Err(SigningError::MissingSigner(
                SignerRole::CustodialFeePayer.to_string(),
            ));
        }

        let mut tx =
            Transaction::new_with_payer(&plan.instructions, Some(&self.custodial.pubkey()));
        tx.try_partial_sign(&signers, blockhash)
            .map_err(|e| SigningError::CustodialKey(e.to_string()))?;

        if !tx.is_signed() {
            return Err(SigningError::Incomplete);
        }
        Ok(tx)
    }
}
