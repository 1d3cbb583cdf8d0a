//! Allow-list a pool validator, bypassing identity verification

use anchor_lang::prelude::*;

use crate::errors::JobMarketError;
use crate::events::ValidatorAllowlistUpdated;
use crate::state::{ProtocolConfig, ValidatorPool};
use crate::utils::version::check_version_compatible;

#[derive(Accounts)]
pub struct SetValidatorAllowlist<'info> {
    #[account(
        seeds = [b"protocol"],
        bump = protocol_config.bump,
        has_one = authority @ JobMarketError::UnauthorizedAuthority
    )]
    pub protocol_config: Account<'info, ProtocolConfig>,

    #[account(
        mut,
        seeds = [b"validator_pool"],
        bump = validator_pool.bump
    )]
    pub validator_pool: Account<'info, ValidatorPool>,

    pub authority: Signer<'info>,
}

pub fn handler(ctx: Context<SetValidatorAllowlist>, validator: Pubkey, allowed: bool) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;

    let entry = ctx
        .accounts
        .validator_pool
        .entry_mut(&validator)
        .ok_or(JobMarketError::ValidatorNotInPool)?;
    entry.allowlisted = allowed;

    emit!(ValidatorAllowlistUpdated {
        validator,
        allowed,
        timestamp: Clock::get()?.unix_timestamp,
    });

    Ok(())
}
