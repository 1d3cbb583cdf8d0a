//! Prove a pool validator's identity against the validator Merkle root

use anchor_lang::prelude::*;

use crate::errors::JobMarketError;
use crate::events::ValidatorIdentityVerified;
use crate::state::{ProtocolConfig, ValidatorPool, HASH_SIZE};
use crate::utils::identity::is_authorized;
use crate::utils::version::check_version_compatible;

#[derive(Accounts)]
pub struct VerifyValidatorIdentity<'info> {
    #[account(
        seeds = [b"protocol"],
        bump = protocol_config.bump
    )]
    pub protocol_config: Account<'info, ProtocolConfig>,

    #[account(
        mut,
        seeds = [b"validator_pool"],
        bump = validator_pool.bump
    )]
    pub validator_pool: Account<'info, ValidatorPool>,

    pub validator: Signer<'info>,
}

pub fn handler(
    ctx: Context<VerifyValidatorIdentity>,
    label: [u8; HASH_SIZE],
    proof: Vec<[u8; HASH_SIZE]>,
) -> Result<()> {
    let config = &ctx.accounts.protocol_config;
    check_version_compatible(config)?;

    let validator = ctx.accounts.validator.key();
    let root = config.validator_root;
    let entry = ctx
        .accounts
        .validator_pool
        .entry_mut(&validator)
        .ok_or(JobMarketError::ValidatorNotInPool)?;

    require!(
        is_authorized(&root, false, &validator, &label, &proof),
        JobMarketError::UnauthorizedIdentity
    );
    entry.identity_verified = true;

    emit!(ValidatorIdentityVerified {
        validator,
        timestamp: Clock::get()?.unix_timestamp,
    });

    Ok(())
}
