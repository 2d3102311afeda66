//! Fee Payment Validator behavior against a scripted ledger

use solana_sdk::pubkey::Pubkey;

use crate::saga::errors::{FeeError, SagaError};
use crate::saga::fee::FeeValidator;
use crate::tests::mock_ledger::MockLedger;
use crate::tests::{random_signature, valid_fee_tx};

const FEE: u64 = 99_000_000;
const MAX_AGE: i64 = 600;

fn validator(receiver: Pubkey) -> FeeValidator {
    FeeValidator::new(receiver, FEE, MAX_AGE)
}

fn expect_fee_err(result: Result<(), SagaError>) -> FeeError {
    match result {
        Err(SagaError::Fee(err)) => err,
        other => panic!("expected fee error, got {:?}", other),
    }
}

#[tokio::test]
async fn valid_payment_passes_all_checks() {
    let payer = Pubkey::new_unique();
    let receiver = Pubkey::new_unique();
    let ledger = MockLedger::new();
    let sig = random_signature();
    ledger.insert_transaction(sig, valid_fee_tx(payer, receiver, FEE, 10));

    let validator = validator(receiver);
    assert!(validator.validate(&ledger, &sig, &payer).await.is_ok());
}

#[tokio::test]
async fn unknown_signature_is_not_found() {
    let payer = Pubkey::new_unique();
    let receiver = Pubkey::new_unique();
    let ledger = MockLedger::new();

    let err = expect_fee_err(
        validator(receiver)
            .validate(&ledger, &random_signature(), &payer)
            .await,
    );
    assert_eq!(err, FeeError::NotFound);
}

#[tokio::test]
async fn failed_payment_is_rejected() {
    let payer = Pubkey::new_unique();
    let receiver = Pubkey::new_unique();
    let ledger = MockLedger::new();
    let sig = random_signature();
    let mut tx = valid_fee_tx(payer, receiver, FEE, 10);
    tx.executed_ok = false;
    ledger.insert_transaction(sig, tx);

    let err = expect_fee_err(validator(receiver).validate(&ledger, &sig, &payer).await);
    assert_eq!(err, FeeError::ExecutionFailed);
}

#[tokio::test]
async fn missing_timestamp_is_expired() {
    let payer = Pubkey::new_unique();
    let receiver = Pubkey::new_unique();
    let ledger = MockLedger::new();
    let sig = random_signature();
    let mut tx = valid_fee_tx(payer, receiver, FEE, 10);
    tx.block_time = None;
    ledger.insert_transaction(sig, tx);

    let err = expect_fee_err(validator(receiver).validate(&ledger, &sig, &payer).await);
    assert!(matches!(err, FeeError::Expired { .. }));
}

#[tokio::test]
async fn freshness_boundary_at_600_seconds() {
    let payer = Pubkey::new_unique();
    let receiver = Pubkey::new_unique();
    let validator = validator(receiver);

    // 599 seconds old: accepted
    let ledger = MockLedger::new();
    let fresh_sig = random_signature();
    ledger.insert_transaction(fresh_sig, valid_fee_tx(payer, receiver, FEE, 599));
    assert!(validator.validate(&ledger, &fresh_sig, &payer).await.is_ok());

    // 601 seconds old: expired
    let stale_sig = random_signature();
    ledger.insert_transaction(stale_sig, valid_fee_tx(payer, receiver, FEE, 601));
    let err = expect_fee_err(validator.validate(&ledger, &stale_sig, &payer).await);
    assert!(matches!(err, FeeError::Expired { .. }));
}

#[tokio::test]
async fn receiver_absent_is_invalid_receiver() {
    let payer = Pubkey::new_unique();
    let receiver = Pubkey::new_unique();
    let ledger = MockLedger::new();
    let sig = random_signature();
    // Paid to somebody else entirely
    ledger.insert_transaction(sig, valid_fee_tx(payer, Pubkey::new_unique(), FEE, 10));

    let err = expect_fee_err(validator(receiver).validate(&ledger, &sig, &payer).await);
    assert_eq!(err, FeeError::InvalidReceiver);
}

#[tokio::test]
async fn payer_absent_is_wrong_sender() {
    let payer = Pubkey::new_unique();
    let receiver = Pubkey::new_unique();
    let ledger = MockLedger::new();
    let sig = random_signature();
    ledger.insert_transaction(sig, valid_fee_tx(Pubkey::new_unique(), receiver, FEE, 10));

    let err = expect_fee_err(validator(receiver).validate(&ledger, &sig, &payer).await);
    assert_eq!(err, FeeError::WrongSender);
}

#[tokio::test]
async fn fee_amount_boundary() {
    let payer = Pubkey::new_unique();
    let receiver = Pubkey::new_unique();
    let validator = validator(receiver);
    let ledger = MockLedger::new();

    // Exactly the required amount: accepted
    let exact_sig = random_signature();
    ledger.insert_transaction(exact_sig, valid_fee_tx(payer, receiver, FEE, 10));
    assert!(validator.validate(&ledger, &exact_sig, &payer).await.is_ok());

    // One lamport short: rejected
    let short_sig = random_signature();
    ledger.insert_transaction(short_sig, valid_fee_tx(payer, receiver, FEE - 1, 10));
    let err = expect_fee_err(validator.validate(&ledger, &short_sig, &payer).await);
    assert_eq!(
        err,
        FeeError::InsufficientFee {
            required: FEE,
            received: FEE - 1,
        }
    );
}

#[tokio::test]
async fn consumed_signature_is_rejected_on_replay() {
    let payer = Pubkey::new_unique();
    let receiver = Pubkey::new_unique();
    let ledger = MockLedger::new();
    let sig = random_signature();
    ledger.insert_transaction(sig, valid_fee_tx(payer, receiver, FEE, 10));

    let validator = validator(receiver);
    assert!(validator.validate(&ledger, &sig, &payer).await.is_ok());

    let err = expect_fee_err(validator.validate(&ledger, &sig, &payer).await);
    assert_eq!(err, FeeError::Replayed);
}

#[tokio::test]
async fn failed_validation_does_not_consume_signature() {
    let payer = Pubkey::new_unique();
    let receiver = Pubkey::new_unique();
    let ledger = MockLedger::new();
    let sig = random_signature();
    // First attempt: one lamport short
    ledger.insert_transaction(sig, valid_fee_tx(payer, receiver, FEE - 1, 10));

    let validator = validator(receiver);
    assert!(matches!(
        expect_fee_err(validator.validate(&ledger, &sig, &payer).await),
        FeeError::InsufficientFee { .. }
    ));

    // Ledger state corrected (e.g. looked up a fuller record): same
    // signature may validate now because it was never consumed
    ledger.insert_transaction(sig, valid_fee_tx(payer, receiver, FEE, 10));
    assert!(validator.validate(&ledger, &sig, &payer).await.is_ok());
}

#[tokio::test]
async fn validation_is_read_only() {
    let payer = Pubkey::new_unique();
    let receiver = Pubkey::new_unique();
    let ledger = MockLedger::new();
    let sig = random_signature();
    ledger.insert_transaction(sig, valid_fee_tx(payer, receiver, FEE, 10));

    validator(receiver)
        .validate(&ledger, &sig, &payer)
        .await
        .unwrap();
    assert_eq!(ledger.sends(), 0);
}
