//! Commit a hidden validation vote

use crate::errors::JobMarketError;
use crate::events::ValidationCommitted;
use crate::state::{Job, JobState, ProtocolConfig, ValidationRound, HASH_SIZE};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;

#[derive(Accounts)]
pub struct CommitValidation<'info> {
    #[account(
        seeds = [b"protocol"],
        bump = protocol_config.bump
    )]
    pub protocol_config: Account<'info, ProtocolConfig>,

    #[account(
        seeds = [b"job", job.job_id.to_le_bytes().as_ref()],
        bump = job.bump
    )]
    pub job: Account<'info, Job>,

    #[account(
        mut,
        seeds = [b"round", job.key().as_ref(), job.validation_nonce.to_le_bytes().as_ref()],
        bump = round.bump
    )]
    pub round: Box<Account<'info, ValidationRound>>,

    pub validator: Signer<'info>,
}

pub fn handler(ctx: Context<CommitValidation>, commitment: [u8; HASH_SIZE]) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;
    let clock = Clock::get()?;

    let job = &ctx.accounts.job;
    require!(
        job.state == JobState::Submitted && job.round_open,
        JobMarketError::RoundNotOpen
    );

    let validator = ctx.accounts.validator.key();
    let round = &mut ctx.accounts.round;
    round.commit(&validator, commitment, clock.unix_timestamp)?;

    emit!(ValidationCommitted {
        job_id: job.job_id,
        nonce: round.nonce,
        validator,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
