//! Transaction submission and finality tracking
//!
//! Each attempt fetches a fresh blockhash, asks the caller to re-sign
//! against it, submits, and waits for finalized commitment bounded by the
//! blockhash's last valid block height. Blockhashes are single-use and
//! time-bounded; a stale transaction is never resubmitted, it is rebuilt.
//! Retryable failures (expiry, drop, transient RPC faults) get a bounded
//! number of fresh attempts with jittered exponential backoff; exhaustion
//! surfaces the final error.

use solana_sdk::{signature::Signature, transaction::Transaction};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::ledger::{BlockhashInfo, LedgerRpc};
use crate::saga::errors::{FinalityError, SagaError, SigningError};

/// Jittered exponential backoff between submission attempts
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (first try included)
    pub max_attempts: u32,

    /// Base delay in milliseconds
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,

    /// Jitter factor (0.0 - 1.0)
    pub jitter_factor: f64,

    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 5000,
            jitter_factor: 0.1,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Delay before the attempt after `attempt` (0-based), or `None` once
    /// the cap is reached.
    pub fn calculate_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt + 1 >= self.max_attempts {
            return None;
        }

        let delay_ms = self.base_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        let delay_ms = delay_ms.min(self.max_delay_ms as f64);

        // Jitter prevents concurrent sagas from hammering in lockstep
        let jitter = (rand::random::<f64>() - 0.5) * 2.0 * self.jitter_factor;
        let jittered = (delay_ms * (1.0 + jitter)).max(0.0) as u64;

        Some(Duration::from_millis(jittered))
    }
}

/// Submits signed transactions and tracks them to finality
pub struct SubmissionTracker<L: LedgerRpc + ?Sized> {
    ledger: Arc<L>,
    retry: RetryPolicy,
}

impl<L: LedgerRpc + ?Sized> SubmissionTracker<L> {
    pub fn new(ledger: Arc<L>, retry: RetryPolicy) -> Self {
        Self { ledger, retry }
    }

    /// Drive one logical transaction to finality.
    ///
    /// `sign` receives a fresh [`BlockhashInfo`] per attempt and must
    /// return a fully signed transaction bound to it. Signing faults are
    /// never retried; a terminal on-chain execution error is surfaced
    /// immediately.
    pub async fn submit_finalized<F>(
        &self,
        label: &str,
        sign: F,
    ) -> Result<Signature, SagaError>
    where
        F: Fn(BlockhashInfo) -> Result<Transaction, SigningError>,
    {
        let mut attempt: u32 = 0;
        loop {
            match self.try_once(label, &sign, attempt).await {
                Ok(signature) => return Ok(signature),
                Err(SagaError::Signing(err)) => return Err(err.into()),
                Err(err) if err.is_retryable() => match self.retry.calculate_delay(attempt) {
                    Some(delay) => {
                        warn!(
                            label,
                            attempt,
                            error = %err,
                            delay_ms = delay.as_millis() as u64,
                            "Retrying with a fresh blockhash"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        warn!(label, attempt, error = %err, "Retry budget exhausted");
                        return Err(err);
                    }
                },
                Err(err) => return Err(err),
            }
        }
    }

    async fn try_once<F>(
        &self,
        label: &str,
        sign: &F,
        attempt: u32,
    ) -> Result<Signature, SagaError>
    where
        F: Fn(BlockhashInfo) -> Result<Transaction, SigningError>,
    {
        let blockhash_info = self.ledger.get_latest_blockhash().await?;
        debug!(
            label,
            attempt,
            blockhash = %blockhash_info.blockhash,
            last_valid_block_height = blockhash_info.last_valid_block_height,
            "Signing against fresh blockhash"
        );

        let tx = sign(blockhash_info)?;

        let signature = self
            .ledger
            .send_transaction(&tx)
            .await
            .map_err(|err| self.classify_ledger_fault(err))?;

        self.ledger
            .confirm_transaction(&signature, blockhash_info.last_valid_block_height)
            .await
            .map_err(|err| self.classify_ledger_fault(err))?;

        info!(label, signature = %signature, attempt, "Transaction finalized");
        Ok(signature)
    }

    /// Fold ledger faults seen while submitting or awaiting finality into
    /// the finality taxonomy, so the retry loop sees one surface. An
    /// on-chain execution error is a finality outcome too (terminal);
    /// every other non-retryable fault keeps its ledger identity.
    fn classify_ledger_fault(&self, err: crate::ledger::LedgerError) -> SagaError {
        use crate::ledger::LedgerError;

        match err {
            LedgerError::TransactionFailed { .. } => {
                SagaError::Finality(FinalityError::from_ledger(&err))
            }
            err if err.is_retryable() => SagaError::Finality(FinalityError::from_ledger(&err)),
            err => SagaError::Ledger(err),
        }
    }
}
