//! Instruction planning for the minting saga
//!
//! Three plans, each its own transaction:
//! 1. Mint creation: create account → initialize mint → create associated
//!    token account → mint initial supply. Co-signed by the custodial
//!    payer and the ephemeral mint identity.
//! 2. Metadata attachment (only when a URI is present), best-effort.
//! 3. Authority transfer: custodial payer hands mint authority to the
//!    user. Deliberately a separate transaction sequenced after the
//!    creation transaction reaches finality: the authority only means
//!    anything once minting is complete, and metadata attachment may need
//!    the custodial authority in between.

use solana_sdk::{
    instruction::Instruction, program_pack::Pack, pubkey::Pubkey, system_instruction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account,
};
use spl_token::instruction::AuthorityType;

use crate::saga::errors::SigningError;
use crate::saga::signing::SignerRole;
use crate::types::TokenRequest;

/// Ordered instructions plus the signer roles the transaction requires
#[derive(Debug, Clone)]
pub struct InstructionPlan {
    /// The ordered list of instructions for the transaction
    pub instructions: Vec<Instruction>,

    /// Signer roles that must co-sign (fee payer is always custodial)
    pub signer_roles: Vec<SignerRole>,
}

impl InstructionPlan {
    pub fn new(instructions: Vec<Instruction>, signer_roles: Vec<SignerRole>) -> Self {
        Self {
            instructions,
            signer_roles,
        }
    }
}

/// Size of a mint account, for rent-exemption sizing
pub const MINT_ACCOUNT_SIZE: usize = spl_token::state::Mint::LEN;

/// Derive the associated token account for `(mint, user)`.
///
/// Pure function of the pair; never stored independently of it.
pub fn associated_account_address(mint: &Pubkey, user: &Pubkey) -> Pubkey {
    get_associated_token_address(user, mint)
}

/// Plan the mint-creation transaction.
///
/// `rent_lamports` must be the rent-exempt minimum for
/// [`MINT_ACCOUNT_SIZE`], paid by the custodial payer. Mint authority is
/// set to the custodial payer (it still has to mint the initial supply and
/// possibly attach metadata); freeze authority goes straight to the user.
pub fn plan_mint_creation(
    custodial: &Pubkey,
    user: &Pubkey,
    mint: &Pubkey,
    request: &TokenRequest,
    scaled_supply: u64,
    rent_lamports: u64,
) -> Result<InstructionPlan, SigningError> {
    let token_account = associated_account_address(mint, user);

    let create_account_ix = system_instruction::create_account(
        custodial,
        mint,
        rent_lamports,
        MINT_ACCOUNT_SIZE as u64,
        &spl_token::id(),
    );

    let init_mint_ix = spl_token::instruction::initialize_mint(
        &spl_token::id(),
        mint,
        custodial,
        Some(user),
        request.decimals,
    )
    .map_err(|e| SigningError::instruction_failed("spl-token", e.to_string()))?;

    let create_ata_ix = create_associated_token_account(custodial, user, mint, &spl_token::id());

    let mint_to_ix = spl_token::instruction::mint_to(
        &spl_token::id(),
        mint,
        &token_account,
        custodial,
        &[],
        scaled_supply,
    )
    .map_err(|e| SigningError::instruction_failed("spl-token", e.to_string()))?;

    let plan = InstructionPlan::new(
        vec![create_account_ix, init_mint_ix, create_ata_ix, mint_to_ix],
        vec![SignerRole::CustodialFeePayer, SignerRole::EphemeralMint],
    );
    sanity_check_creation_plan(&plan, mint)?;
    Ok(plan)
}

/// Plan the best-effort metadata transaction. `None` when the request has
/// no URI.
pub fn plan_metadata(
    custodial: &Pubkey,
    user: &Pubkey,
    mint: &Pubkey,
    request: &TokenRequest,
) -> Option<InstructionPlan> {
    let uri = request.uri.as_deref()?;

    let (metadata_pda, _bump) = mpl_token_metadata::accounts::Metadata::find_pda(mint);

    let data = mpl_token_metadata::types::DataV2 {
        name: request.name.clone(),
        symbol: request.symbol.clone(),
        uri: uri.to_string(),
        seller_fee_basis_points: 0,
        creators: None,
        collection: None,
        uses: None,
    };

    let ix = mpl_token_metadata::instructions::CreateMetadataAccountV3Builder::new()
        .metadata(metadata_pda)
        .mint(*mint)
        .mint_authority(*custodial)
        .payer(*custodial)
        .update_authority(*user, false)
        .data(data)
        .is_mutable(true)
        .instruction();

    Some(InstructionPlan::new(
        vec![ix],
        vec![SignerRole::CustodialFeePayer],
    ))
}

/// Plan the authority-transfer transaction: mint authority moves from the
/// custodial payer to the user.
pub fn plan_authority_transfer(
    custodial: &Pubkey,
    user: &Pubkey,
    mint: &Pubkey,
) -> Result<InstructionPlan, SigningError> {
    let set_authority_ix = spl_token::instruction::set_authority(
        &spl_token::id(),
        mint,
        Some(user),
        AuthorityType::MintTokens,
        custodial,
        &[],
    )
    .map_err(|e| SigningError::instruction_failed("spl-token", e.to_string()))?;

    Ok(InstructionPlan::new(
        vec![set_authority_ix],
        vec![SignerRole::CustodialFeePayer],
    ))
}

/// Ordering sanity check for the creation plan (debug/test builds only).
///
/// The account must exist before it is initialized, and be initialized
/// before it is minted to; the authority transfer must never be bundled
/// into this transaction.
#[cfg(debug_assertions)]
fn sanity_check_creation_plan(
    plan: &InstructionPlan,
    mint: &Pubkey,
) -> Result<(), SigningError> {
    if plan.instructions.len() != 4 {
        return Err(SigningError::instruction_failed(
            "saga",
            format!(
                "Creation plan must hold exactly 4 instructions, got {}",
                plan.instructions.len()
            ),
        ));
    }

    let first = &plan.instructions[0];
    if first.program_id != solana_sdk::system_program::id() {
        return Err(SigningError::instruction_failed(
            "saga",
            "Creation plan must start with the system create-account instruction",
        ));
    }
    if !first.accounts.iter().any(|meta| meta.pubkey == *mint) {
        return Err(SigningError::instruction_failed(
            "saga",
            "Create-account instruction does not reference the new mint",
        ));
    }

    // set_authority (discriminator 6) must not appear in this transaction
    for ix in &plan.instructions {
        if ix.program_id == spl_token::id() && ix.data.first() == Some(&6) {
            return Err(SigningError::instruction_failed(
                "saga",
                "Authority transfer must not be bundled into the creation transaction",
            ));
        }
    }

    Ok(())
}

#[cfg(not(debug_assertions))]
#[inline]
fn sanity_check_creation_plan(
    _plan: &InstructionPlan,
    _mint: &Pubkey,
) -> Result<(), SigningError> {
    Ok(())
}
