//! Crate-internal test modules and shared fixtures


mod fee_validator_tests;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

use crate::ledger::LedgerTransaction;

/// A fee payment record that passes all validator checks for
/// `(payer, receiver, amount)`.
pub fn valid_fee_tx(
    payer: Pubkey,
    receiver: Pubkey,
    amount_lamports: u64,
    age_secs: i64,
) -> LedgerTransaction {
    LedgerTransaction {
        executed_ok: true,
        block_time: Some(chrono::Utc::now().timestamp() - age_secs),
        account_keys: vec![payer, receiver],
        pre_balances: vec![amount_lamports + 5_000, 1_000_000],
        post_balances: vec![0, 1_000_000 + amount_lamports],
    }
}

/// Fresh random signature for scripting the mock ledger
pub fn random_signature() -> Signature {
    Signature::from(rand::random::<[u8; 64]>())
}
