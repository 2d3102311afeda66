//! Fee payment validation
//!
//! Confirms a claimed fee-payment transaction before any custodial
//! resource is spent: the checks run in order and short-circuit on the
//! first failure. Read-only apart from the in-process seen-signature set,
//! which rejects replaying one valid payment across multiple mint
//! requests; a signature is only consumed when validation fully succeeds,
//! so a user whose payment failed a check can retry with the same
//! signature after fixing the problem.

use dashmap::DashSet;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use tracing::{debug, info};

use crate::ledger::LedgerRpc;
use crate::saga::errors::{FeeError, SagaError};

/// Validates fee payments against the configured receiver and amount
pub struct FeeValidator {
    receiver: Pubkey,
    required_lamports: u64,
    max_age_secs: i64,
    seen: DashSet<Signature>,
}

impl FeeValidator {
    pub fn new(receiver: Pubkey, required_lamports: u64, max_age_secs: i64) -> Self {
        Self {
            receiver,
            required_lamports,
            max_age_secs,
            seen: DashSet::new(),
        }
    }

    /// Required fee in lamports
    pub fn required_lamports(&self) -> u64 {
        self.required_lamports
    }

    /// Run all checks against the ledger record of `signature`.
    ///
    /// Transport faults surface as [`SagaError::Ledger`]; every domain
    /// rejection is a [`FeeError`].
    pub async fn validate<L: LedgerRpc + ?Sized>(
        &self,
        ledger: &L,
        signature: &Signature,
        expected_payer: &Pubkey,
    ) -> Result<(), SagaError> {
        if self.seen.contains(signature) {
            return Err(FeeError::Replayed.into());
        }

        let tx = ledger
            .get_transaction(signature)
            .await?
            .ok_or(FeeError::NotFound)?;

        if !tx.executed_ok {
            return Err(FeeError::ExecutionFailed.into());
        }

        let now = chrono::Utc::now().timestamp();
        // No timestamp means freshness cannot be established
        let age_secs = match tx.block_time {
            Some(block_time) => now - block_time,
            None => i64::MAX,
        };
        if age_secs > self.max_age_secs {
            return Err(FeeError::Expired {
                age_secs,
                max_age_secs: self.max_age_secs,
            }
            .into());
        }

        let receiver_index = tx
            .account_keys
            .iter()
            .position(|key| *key == self.receiver)
            .ok_or(FeeError::InvalidReceiver)?;

        if !tx.account_keys.iter().any(|key| key == expected_payer) {
            return Err(FeeError::WrongSender.into());
        }

        let pre = tx.pre_balances.get(receiver_index).copied().unwrap_or(0);
        let post = tx.post_balances.get(receiver_index).copied().unwrap_or(0);
        let received = post.saturating_sub(pre);
        if received < self.required_lamports {
            return Err(FeeError::InsufficientFee {
                required: self.required_lamports,
                received,
            }
            .into());
        }

        // Consume only on full success
        if !self.seen.insert(*signature) {
            debug!(signature = %signature, "Fee signature raced to consumption");
            return Err(FeeError::Replayed.into());
        }

        info!(
            signature = %signature,
            payer = %expected_payer,
            received,
            age_secs,
            "Fee payment validated"
        );
        Ok(())
    }
}
