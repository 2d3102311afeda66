//! Fee-gated token-minting saga
//!
//! The saga is split into focused modules:
//! - **errors**: fee / signing / finality error taxonomy
//! - **fee**: fee payment validation with replay protection
//! - **instructions**: instruction planning for the three transactions
//! - **signing**: multi-party signing over two signer roles
//! - **submit**: submission and finality tracking with bounded retry
//! - **controller**: the state machine driving one request end to end
//!
//! The underlying ledger offers no cross-transaction atomicity; the
//! controller's job is to make every non-atomic seam either abort cleanly
//! (before any custodial spend) or surface a reportable partial outcome.

pub mod controller;
pub mod errors;
pub mod fee;
pub mod instructions;
pub mod signing;
pub mod submit;

pub use controller::{MintOutcome, SagaController, SagaPhase, SagaSettings};
pub use errors::{FeeError, FinalityError, SagaError, SigningError};
pub use fee::FeeValidator;
pub use instructions::{
    associated_account_address, plan_authority_transfer, plan_metadata, plan_mint_creation,
    InstructionPlan, MINT_ACCOUNT_SIZE,
};
pub use signing::{SignerRole, SigningCoordinator};
pub use submit::{RetryPolicy, SubmissionTracker};
