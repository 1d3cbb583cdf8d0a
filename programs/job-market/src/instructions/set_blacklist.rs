//! Authority override of an address's blacklist flag

use anchor_lang::prelude::*;

use crate::errors::JobMarketError;
use crate::events::BlacklistUpdated;
use crate::state::{ProtocolConfig, ReputationRecord};
use crate::utils::version::check_version_compatible;

#[derive(Accounts)]
#[instruction(user: Pubkey)]
pub struct SetBlacklist<'info> {
    #[account(
        seeds = [b"protocol"],
        bump = protocol_config.bump,
        has_one = authority @ JobMarketError::UnauthorizedAuthority
    )]
    pub protocol_config: Account<'info, ProtocolConfig>,

    #[account(
        init_if_needed,
        payer = authority,
        space = ReputationRecord::SIZE,
        seeds = [b"reputation", user.as_ref()],
        bump
    )]
    pub reputation: Account<'info, ReputationRecord>,

    #[account(mut)]
    pub authority: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn handler(ctx: Context<SetBlacklist>, user: Pubkey, blacklisted: bool) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;
    let clock = Clock::get()?;

    let record = &mut ctx.accounts.reputation;
    if record.owner == Pubkey::default() {
        record.owner = user;
        record.last_updated = clock.unix_timestamp;
        record.bump = ctx.bumps.reputation;
    }
    record.blacklisted = blacklisted;

    emit!(BlacklistUpdated {
        user,
        blacklisted,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
