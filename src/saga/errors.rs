//! Error taxonomy for the minting saga
//!
//! Three domain error families map to the three ways a saga can go wrong
//! before completion: the fee payment is invalid ([`FeeError`]), a
//! transaction cannot be built or fully signed ([`SigningError`]), or a
//! submitted transaction never reaches finality ([`FinalityError`]).
//! Transport faults keep their own [`LedgerError`] identity instead of
//! being mislabeled as one of the domain families.

use thiserror::Error;

use crate::ledger::LedgerError;
use crate::types::{ErrorBody, RequestError};

/// Fee payment rejection reasons, in validator check order.
///
/// All of these are recoverable by the user submitting a fresh, valid fee
/// payment; none of them costs the custodial payer anything.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeError {
    /// Fee signature already consumed by an earlier mint request
    #[error("Fee payment already used for a previous mint request")]
    Replayed,

    /// No transaction with this signature on the ledger
    #[error("Fee transaction not found")]
    NotFound,

    /// The fee transaction itself failed on-chain
    #[error("Fee transaction failed on-chain")]
    ExecutionFailed,

    /// Payment older than the freshness window, or without a usable
    /// timestamp at all
    #[error("Fee payment expired (older than {max_age_secs}s); please make a new payment")]
    Expired { age_secs: i64, max_age_secs: i64 },

    /// Configured receiver not among the transaction's accounts
    #[error("Fee was not paid to the configured receiver")]
    InvalidReceiver,

    /// Expected payer not among the transaction's accounts
    #[error("Fee was not paid by the token creator")]
    WrongSender,

    /// Receiver credited less than the required amount
    #[error("Insufficient fee payment: required {required} lamports, received {received}")]
    InsufficientFee { required: u64, received: u64 },
}

/// Signing and transaction-construction faults.
///
/// These indicate configuration problems (custodial key) or logic bugs
/// (wrong signer set, unbuildable instruction); never retried without
/// operator intervention.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    /// Custodial key missing or malformed
    #[error("Custodial signer unavailable: {0}")]
    CustodialKey(String),

    /// A required signer role was not provided
    #[error("Missing required signer: {0}")]
    MissingSigner(String),

    /// Signature slots remain empty after signing
    #[error("Transaction not fully signed after attaching all roles")]
    Incomplete,

    /// An instruction could not be constructed
    #[error("Instruction build failed (program {program}): {reason}")]
    InstructionBuild { program: String, reason: String },
}

impl SigningError {
    pub fn instruction_failed(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InstructionBuild {
            program: program.into(),
            reason: reason.into(),
        }
    }
}

/// Failure to bring a submitted transaction to finality
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FinalityError {
    /// Blockhash window closed before the transaction landed
    #[error("Transaction expired before finalization")]
    Expired,

    /// The transaction landed but executed with an on-chain error
    #[error("Transaction executed with an on-chain error: {reason}")]
    ExecutionFailed { reason: String },

    /// The transaction was never observed by the cluster
    #[error("Transaction dropped")]
    Dropped,
}

impl FinalityError {
    /// Expired and dropped transactions can be rebuilt against a fresh
    /// blockhash; an on-chain execution error cannot.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Expired => true,
            Self::Dropped => true,
            Self::ExecutionFailed { .. } => false,
        }
    }

    /// Map a ledger fault observed between submission and finality
    pub fn from_ledger(err: &LedgerError) -> Self {
        match err {
            LedgerError::TransactionExpired { .. } | LedgerError::BlockhashNotFound => {
                Self::Expired
            }
            LedgerError::TransactionFailed { reason } => Self::ExecutionFailed {
                reason: reason.clone(),
            },
            _ => Self::Dropped,
        }
    }
}

/// Top-level saga error
#[derive(Debug, Clone, Error)]
pub enum SagaError {
    #[error("Invalid token request: {0}")]
    Request(#[from] RequestError),

    #[error("Fee validation failed: {0}")]
    Fee(#[from] FeeError),

    #[error("Signing failed: {0}")]
    Signing(#[from] SigningError),

    #[error("Finality failed: {0}")]
    Finality(#[from] FinalityError),

    /// Transport-level fault outside a submit/confirm window
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl SagaError {
    /// Stable machine-readable discriminant for wire responses and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Fee(_) => "fee",
            Self::Signing(_) => "signing",
            Self::Finality(_) => "finality",
            Self::Ledger(_) => "ledger",
        }
    }

    /// Whether a fresh attempt at the failed step could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) => false,
            Self::Fee(_) => false,
            Self::Signing(_) => false,
            Self::Finality(err) => err.is_retryable(),
            Self::Ledger(err) => err.is_retryable(),
        }
    }

    /// Generic description safe to hand to untrusted callers.
    ///
    /// Fee errors are precise on purpose (the user must fix their payment);
    /// everything else stays generic so raw RPC internals never leak.
    pub fn public_message(&self) -> String {
        match self {
            Self::Request(err) => err.to_string(),
            Self::Fee(err) => err.to_string(),
            Self::Signing(_) => "Token creation could not be signed; contact the operator".to_string(),
            Self::Finality(_) => "Token creation did not finalize; please retry".to_string(),
            Self::Ledger(_) => "Ledger temporarily unavailable; please retry".to_string(),
        }
    }

    /// Wire-format failure body for callers
    pub fn to_error_body(&self) -> ErrorBody {
        ErrorBody {
            error_kind: self.kind().to_string(),
            message: self.public_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FeeError::InsufficientFee {
            required: 99_000_000,
            received: 98_999_999,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient fee payment: required 99000000 lamports, received 98999999"
        );

        let err = SigningError::instruction_failed("spl-token", "bad mint");
        assert_eq!(
            err.to_string(),
            "Instruction build failed (program spl-token): bad mint"
        );
    }

    #[test]
    fn test_finality_retryability() {
        assert!(FinalityError::Expired.is_retryable());
        assert!(FinalityError::Dropped.is_retryable());
        assert!(!FinalityError::ExecutionFailed {
            reason: "custom program error: 0x1".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_finality_from_ledger() {
        assert_eq!(
            FinalityError::from_ledger(&LedgerError::TransactionExpired {
                last_valid_block_height: 100
            }),
            FinalityError::Expired
        );
        assert_eq!(
            FinalityError::from_ledger(&LedgerError::BlockhashNotFound),
            FinalityError::Expired
        );
        assert!(matches!(
            FinalityError::from_ledger(&LedgerError::TransactionFailed {
                reason: "boom".to_string()
            }),
            FinalityError::ExecutionFailed { .. }
        ));
        assert_eq!(
            FinalityError::from_ledger(&LedgerError::Transport("reset".to_string())),
            FinalityError::Dropped
        );
    }

    #[test]
    fn test_saga_error_kinds() {
        assert_eq!(SagaError::from(FeeError::NotFound).kind(), "fee");
        assert_eq!(SagaError::from(SigningError::Incomplete).kind(), "signing");
        assert_eq!(SagaError::from(FinalityError::Expired).kind(), "finality");
        assert_eq!(
            SagaError::from(LedgerError::BlockhashNotFound).kind(),
            "ledger"
        );
    }

    #[test]
    fn test_saga_retryability() {
        assert!(!SagaError::from(FeeError::NotFound).is_retryable());
        assert!(!SagaError::from(SigningError::Incomplete).is_retryable());
        assert!(SagaError::from(FinalityError::Expired).is_retryable());
    }

    #[test]
    fn test_public_message_hides_internals() {
        let err = SagaError::from(LedgerError::RpcResponse {
            message: "secret endpoint http://10.0.0.5:8899 refused".to_string(),
            code: Some(500),
        });
        assert!(!err.public_message().contains("10.0.0.5"));
    }
}
