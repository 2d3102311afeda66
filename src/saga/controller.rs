//! Saga controller state machine
//!
//! Drives one request through the fixed phase sequence
//! `AwaitingFeeValidation → FeeValidated → MintCreated →
//! MetadataAttempted → AuthorityTransferred`, aborting cleanly before any
//! custodial spend on pre-`MintCreated` failures and reporting
//! `PartiallyComplete` (never silent failure, never fake success) when the
//! authority transfer fails after the mint already exists.
//!
//! The saga is a sequential pipeline per request; across requests, sagas
//! are independent and only share the read-only custodial keypair. A
//! counting semaphore bounds concurrent submit+finality sections so
//! concurrent sagas cannot starve the custodial payer's submission rate.

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::ledger::LedgerRpc;
use crate::saga::errors::SagaError;
use crate::saga::fee::FeeValidator;
use crate::saga::instructions::{
    associated_account_address, plan_authority_transfer, plan_metadata, plan_mint_creation,
    MINT_ACCOUNT_SIZE,
};
use crate::saga::signing::SigningCoordinator;
use crate::saga::submit::{RetryPolicy, SubmissionTracker};
use crate::types::{MintReceipt, TokenRequest};
use crate::wallet::CustodialSigner;

/// Phases of one saga instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaPhase {
    AwaitingFeeValidation,
    FeeValidated,
    MintCreated,
    MetadataAttempted,
    AuthorityTransferred,
    Aborted,
    PartiallyComplete,
}

impl std::fmt::Display for SagaPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::AwaitingFeeValidation => "awaiting_fee_validation",
            Self::FeeValidated => "fee_validated",
            Self::MintCreated => "mint_created",
            Self::MetadataAttempted => "metadata_attempted",
            Self::AuthorityTransferred => "authority_transferred",
            Self::Aborted => "aborted",
            Self::PartiallyComplete => "partially_complete",
        };
        write!(f, "{}", name)
    }
}

/// Terminal outcome of a saga that got past fee validation
#[derive(Debug, Clone)]
pub enum MintOutcome {
    /// Every step finalized; the user holds mint authority
    Completed(MintReceipt),

    /// The mint exists and is funded but remains under custodial
    /// authority; a follow-up authority transfer is required
    PartiallyComplete {
        mint_address: Pubkey,
        token_account_address: Pubkey,
        create_signature: Signature,
        metadata_signature: Option<Signature>,
        fee_signature: Signature,
        error: SagaError,
    },
}

impl MintOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn mint_address(&self) -> Pubkey {
        match self {
            Self::Completed(receipt) => receipt.mint_address,
            Self::PartiallyComplete { mint_address, .. } => *mint_address,
        }
    }
}

/// Saga-level settings distilled from [`Config`]
#[derive(Debug, Clone)]
pub struct SagaSettings {
    pub fee_receiver: Pubkey,
    pub fee_lamports: u64,
    pub fee_max_age_secs: i64,
    pub max_finality_retries: u32,
    pub max_concurrent_sagas: usize,
}

impl SagaSettings {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let fee_receiver = Pubkey::from_str(&config.fee.receiver).map_err(|e| {
            anyhow::anyhow!("Invalid fee receiver address '{}': {}", config.fee.receiver, e)
        })?;
        Ok(Self {
            fee_receiver,
            fee_lamports: config.fee.amount_lamports,
            fee_max_age_secs: config.fee.max_age_secs,
            max_finality_retries: config.saga.max_finality_retries,
            max_concurrent_sagas: config.saga.max_concurrent_sagas,
        })
    }
}

/// Logs if a saga is dropped between mint creation and a terminal state,
/// so a mint left under custodial authority is never silently forgotten.
struct CustodyGuard {
    mint: Pubkey,
    armed: bool,
}

impl CustodyGuard {
    fn arm(mint: Pubkey) -> Self {
        Self { mint, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CustodyGuard {
    fn drop(&mut self) {
        if self.armed {
            error!(
                mint = %self.mint,
                "Saga interrupted after mint creation; mint remains under custodial \
                 authority and needs a follow-up authority transfer"
            );
        }
    }
}

/// Orchestrates the full token-minting saga
pub struct SagaController<L: LedgerRpc + ?Sized> {
    ledger: Arc<L>,
    custodial: CustodialSigner,
    fee_validator: FeeValidator,
    tracker: SubmissionTracker<L>,
    limiter: Arc<Semaphore>,
}

impl<L: LedgerRpc + ?Sized> SagaController<L> {
    pub fn new(ledger: Arc<L>, custodial: CustodialSigner, settings: SagaSettings) -> Self {
        let fee_validator = FeeValidator::new(
            settings.fee_receiver,
            settings.fee_lamports,
            settings.fee_max_age_secs,
        );
        let tracker = SubmissionTracker::new(
            Arc::clone(&ledger),
            RetryPolicy::with_max_attempts(settings.max_finality_retries.max(1)),
        );
        Self {
            ledger,
            custodial,
            fee_validator,
            tracker,
            limiter: Arc::new(Semaphore::new(settings.max_concurrent_sagas.max(1))),
        }
    }

    /// Run one saga to a terminal state.
    ///
    /// `Err` is a clean abort: nothing custodial was spent. `Ok` carries
    /// either full completion or the distinct partially-complete outcome.
    pub async fn run(
        &self,
        request: TokenRequest,
        user: Pubkey,
        fee_signature: Signature,
    ) -> Result<MintOutcome, SagaError> {
        request.validate()?;
        let scaled_supply = request.scaled_supply()?;

        self.transition(SagaPhase::AwaitingFeeValidation, None);
        self.fee_validator
            .validate(self.ledger.as_ref(), &fee_signature, &user)
            .await
            .inspect_err(|err| self.abort(err))?;
        self.transition(SagaPhase::FeeValidated, None);

        let rent_lamports = self
            .ledger
            .minimum_balance_for_rent_exemption(MINT_ACCOUNT_SIZE)
            .await
            .map_err(SagaError::from)
            .inspect_err(|err| self.abort(err))?;

        // Ephemeral identity: lives exactly as long as the creation step
        let mint_keypair = Keypair::new();
        let mint_address = mint_keypair.pubkey();
        let token_account_address = associated_account_address(&mint_address, &user);

        let coordinator = SigningCoordinator::new(&self.custodial);
        let creation_plan = plan_mint_creation(
            &self.custodial.pubkey(),
            &user,
            &mint_address,
            &request,
            scaled_supply,
            rent_lamports,
        )
        .map_err(SagaError::from)
        .inspect_err(|err| self.abort(err))?;

        let create_signature = {
            let _permit = self
                .limiter
                .acquire()
                .await
                .expect("saga limiter is never closed");
            self.tracker
                .submit_finalized("create_mint", |blockhash_info| {
                    coordinator.sign(&creation_plan, Some(&mint_keypair), blockhash_info.blockhash)
                })
                .await
                .inspect_err(|err| self.abort(err))?
        };
        // The private half has co-signed its one transaction; discard it
        drop(mint_keypair);

        let mut custody = CustodyGuard::arm(mint_address);
        self.transition(SagaPhase::MintCreated, Some(&mint_address));

        let metadata_signature = self
            .attach_metadata(&coordinator, &request, &user, &mint_address)
            .await;
        self.transition(SagaPhase::MetadataAttempted, Some(&mint_address));

        let transfer_plan =
            match plan_authority_transfer(&self.custodial.pubkey(), &user, &mint_address) {
                Ok(plan) => plan,
                Err(err) => {
                    custody.disarm();
                    return Ok(self.partially_complete(
                        mint_address,
                        token_account_address,
                        create_signature,
                        metadata_signature,
                        fee_signature,
                        err.into(),
                    ));
                }
            };

        let authority_result = {
            let _permit = self
                .limiter
                .acquire()
                .await
                .expect("saga limiter is never closed");
            self.tracker
                .submit_finalized("transfer_authority", |blockhash_info| {
                    coordinator.sign(&transfer_plan, None, blockhash_info.blockhash)
                })
                .await
        };

        custody.disarm();
        match authority_result {
            Ok(authority_signature) => {
                self.transition(SagaPhase::AuthorityTransferred, Some(&mint_address));
                Ok(MintOutcome::Completed(MintReceipt {
                    mint_address,
                    token_account_address,
                    create_signature,
                    metadata_signature,
                    authority_signature,
                    fee_signature,
                }))
            }
            Err(err) => Ok(self.partially_complete(
                mint_address,
                token_account_address,
                create_signature,
                metadata_signature,
                fee_signature,
                err,
            )),
        }
    }

    /// Best-effort metadata attachment. The phase transition always
    /// happens; the underlying outcome is recorded as data and a failure
    /// is logged and absorbed, never escalated.
    async fn attach_metadata(
        &self,
        coordinator: &SigningCoordinator<'_>,
        request: &TokenRequest,
        user: &Pubkey,
        mint: &Pubkey,
    ) -> Option<Signature> {
        let plan = plan_metadata(&self.custodial.pubkey(), user, mint, request)?;

        let _permit = self
            .limiter
            .acquire()
            .await
            .expect("saga limiter is never closed");
        match self
            .tracker
            .submit_finalized("attach_metadata", |blockhash_info| {
                coordinator.sign(&plan, None, blockhash_info.blockhash)
            })
            .await
        {
            Ok(signature) => Some(signature),
            Err(err) => {
                warn!(
                    mint = %mint,
                    error = %err,
                    "Metadata attachment failed; mint is usable without it"
                );
                None
            }
        }
    }

    fn partially_complete(
        &self,
        mint_address: Pubkey,
        token_account_address: Pubkey,
        create_signature: Signature,
        metadata_signature: Option<Signature>,
        fee_signature: Signature,
        error: SagaError,
    ) -> MintOutcome {
        self.transition(SagaPhase::PartiallyComplete, Some(&mint_address));
        error!(
            mint = %mint_address,
            error = %error,
            "Authority transfer failed after mint creation; mint remains under \
             custodial authority"
        );
        MintOutcome::PartiallyComplete {
            mint_address,
            token_account_address,
            create_signature,
            metadata_signature,
            fee_signature,
            error,
        }
    }

    fn transition(&self, phase: SagaPhase, mint: Option<&Pubkey>) {
        match mint {
            Some(mint) => info!(phase = %phase, mint = %mint, "Saga phase"),
            None => info!(phase = %phase, "Saga phase"),
        }
    }

    fn abort(&self, err: &SagaError) {
        warn!(phase = %SagaPhase::Aborted, kind = err.kind(), error = %err, "Saga aborted");
    }
}
