//! Narrow ledger RPC interface
//!
//! The saga talks to the ledger through the [`LedgerRpc`] trait so tests
//! can substitute a scripted mock. [`SolanaLedger`] is the production
//! implementation over the nonblocking RPC client.

use async_trait::async_trait;
use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcTransactionConfig;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    message::VersionedMessage,
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};
use solana_transaction_status::UiTransactionEncoding;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Ledger-level errors, classified for retry decisions
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// Transport-level errors (network, connection)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request timed out
    #[error("Timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// RPC response errors (from the RPC server)
    #[error("RPC response error: {message} (code: {code:?})")]
    RpcResponse {
        message: String,
        code: Option<i64>,
    },

    /// Blockhash no longer known to the cluster
    #[error("Blockhash not found")]
    BlockhashNotFound,

    /// Transaction outlived its blockhash's last valid block height
    #[error("Transaction expired (last valid block height {last_valid_block_height})")]
    TransactionExpired { last_valid_block_height: u64 },

    /// Transaction landed but executed with an on-chain error
    #[error("Transaction failed on-chain: {reason}")]
    TransactionFailed { reason: String },

    /// Payer cannot cover fees or rent
    #[error("Insufficient funds")]
    InsufficientFunds,
}

impl LedgerError {
    /// Whether retrying the operation might succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Timeout { .. } => true,
            Self::BlockhashNotFound => true,
            Self::TransactionExpired { .. } => true,
            Self::TransactionFailed { .. } => false,
            Self::InsufficientFunds => false,
            // Retry on server-side errors only
            Self::RpcResponse { code, .. } => matches!(code, Some(c) if *c >= 500 && *c < 600),
        }
    }

    /// Classify a raw client error by message content
    pub fn from_client_error(err: ClientError) -> Self {
        let err_str = err.to_string().to_lowercase();

        if err_str.contains("blockhash not found") {
            LedgerError::BlockhashNotFound
        } else if err_str.contains("transaction expired")
            || err_str.contains("block height exceeded")
        {
            LedgerError::TransactionExpired {
                last_valid_block_height: 0,
            }
        } else if err_str.contains("insufficient funds")
            || err_str.contains("insufficient lamports")
        {
            LedgerError::InsufficientFunds
        } else if err_str.contains("timeout") || err_str.contains("timed out") {
            LedgerError::Timeout { timeout_ms: 0 }
        } else if err_str.contains("connection") || err_str.contains("transport") {
            LedgerError::Transport(err.to_string())
        } else {
            let code = err_str
                .split("code:")
                .nth(1)
                .and_then(|s| s.split_whitespace().next())
                .and_then(|s| s.parse::<i64>().ok());

            LedgerError::RpcResponse {
                message: err.to_string(),
                code,
            }
        }
    }
}

/// Read-only snapshot of a confirmed transaction, as needed for fee
/// validation: execution status, timestamp, account keys and the balance
/// deltas around them.
#[derive(Debug, Clone)]
pub struct LedgerTransaction {
    pub executed_ok: bool,
    pub block_time: Option<i64>,
    pub account_keys: Vec<Pubkey>,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
}

/// A fresh blockhash with its expiry bound
#[derive(Debug, Clone, Copy)]
pub struct BlockhashInfo {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Narrow ledger surface the saga depends on
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Look up a transaction by signature. `Ok(None)` when unknown.
    async fn get_transaction(
        &self,
        signature: &Signature,
    ) -> Result<Option<LedgerTransaction>, LedgerError>;

    /// Current lamport balance of an address
    async fn get_balance(&self, address: &Pubkey) -> Result<u64, LedgerError>;

    /// Latest blockhash and its last valid block height
    async fn get_latest_blockhash(&self) -> Result<BlockhashInfo, LedgerError>;

    /// Rent-exempt minimum for an account of the given size
    async fn minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, LedgerError>;

    /// Submit a signed transaction
    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, LedgerError>;

    /// Wait until the transaction is finalized, the blockhash expires, or
    /// the transaction fails on-chain.
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
    ) -> Result<(), LedgerError>;
}

/// Production [`LedgerRpc`] over the Solana nonblocking RPC client
pub struct SolanaLedger {
    client: RpcClient,
    poll_interval: Duration,
}

impl SolanaLedger {
    pub fn new(endpoint: String, timeout: Duration, poll_interval: Duration) -> Self {
        let client = RpcClient::new_with_timeout_and_commitment(
            endpoint,
            timeout,
            CommitmentConfig::confirmed(),
        );
        Self {
            client,
            poll_interval,
        }
    }

    pub fn endpoint(&self) -> String {
        self.client.url()
    }
}

#[async_trait]
impl LedgerRpc for SolanaLedger {
    async fn get_transaction(
        &self,
        signature: &Signature,
    ) -> Result<Option<LedgerTransaction>, LedgerError> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };

        let encoded = match self.client.get_transaction_with_config(signature, config).await {
            Ok(tx) => tx,
            Err(err) => {
                // getTransaction reports an unknown signature as an error
                let msg = err.to_string().to_lowercase();
                if msg.contains("not found") || msg.contains("invalid param") {
                    return Ok(None);
                }
                return Err(LedgerError::from_client_error(err));
            }
        };

        let meta = match encoded.transaction.meta {
            Some(meta) => meta,
            None => return Ok(None),
        };

        let decoded = encoded
            .transaction
            .transaction
            .decode()
            .ok_or_else(|| LedgerError::RpcResponse {
                message: "Undecodable transaction payload".to_string(),
                code: None,
            })?;

        // Static keys only; the fee transfer is a plain legacy transfer and
        // both payer and receiver sit in the static section.
        let account_keys = match &decoded.message {
            VersionedMessage::Legacy(msg) => msg.account_keys.clone(),
            VersionedMessage::V0(msg) => msg.account_keys.clone(),
        };

        Ok(Some(LedgerTransaction {
            executed_ok: meta.err.is_none(),
            block_time: encoded.block_time,
            account_keys,
            pre_balances: meta.pre_balances,
            post_balances: meta.post_balances,
        }))
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<u64, LedgerError> {
        self.client
            .get_balance(address)
            .await
            .map_err(LedgerError::from_client_error)
    }

    async fn get_latest_blockhash(&self) -> Result<BlockhashInfo, LedgerError> {
        let (blockhash, last_valid_block_height) = self
            .client
            .get_latest_blockhash_with_commitment(CommitmentConfig::finalized())
            .await
            .map_err(LedgerError::from_client_error)?;
        Ok(BlockhashInfo {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, LedgerError> {
        self.client
            .get_minimum_balance_for_rent_exemption(data_len)
            .await
            .map_err(LedgerError::from_client_error)
    }

    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, LedgerError> {
        self.client
            .send_transaction(tx)
            .await
            .map_err(LedgerError::from_client_error)
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
    ) -> Result<(), LedgerError> {
        loop {
            let statuses = self
                .client
                .get_signature_statuses(&[*signature])
                .await
                .map_err(LedgerError::from_client_error)?;

            if let Some(Some(status)) = statuses.value.first() {
                if let Some(err) = &status.err {
                    return Err(LedgerError::TransactionFailed {
                        reason: err.to_string(),
                    });
                }
                if status.satisfies_commitment(CommitmentConfig::finalized()) {
                    return Ok(());
                }
            }

            // Blockhash expiry bounds the wait; past it the transaction can
            // never land.
            let block_height = self
                .client
                .get_block_height()
                .await
                .map_err(LedgerError::from_client_error)?;
            if block_height > last_valid_block_height {
                debug!(
                    signature = %signature,
                    block_height,
                    last_valid_block_height,
                    "Blockhash window closed while awaiting finality"
                );
                return Err(LedgerError::TransactionExpired {
                    last_valid_block_height,
                });
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(LedgerError::Transport("reset".to_string()).is_retryable());
        assert!(LedgerError::Timeout { timeout_ms: 5000 }.is_retryable());
        assert!(LedgerError::BlockhashNotFound.is_retryable());
        assert!(LedgerError::TransactionExpired {
            last_valid_block_height: 1
        }
        .is_retryable());

        assert!(!LedgerError::InsufficientFunds.is_retryable());
        assert!(!LedgerError::TransactionFailed {
            reason: "custom program error".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_rpc_response_retryable_on_server_errors_only() {
        let server = LedgerError::RpcResponse {
            message: "internal".to_string(),
            code: Some(503),
        };
        assert!(server.is_retryable());

        let client_side = LedgerError::RpcResponse {
            message: "bad request".to_string(),
            code: Some(400),
        };
        assert!(!client_side.is_retryable());

        let unknown = LedgerError::RpcResponse {
            message: "???".to_string(),
            code: None,
        };
        assert!(!unknown.is_retryable());
    }
}
