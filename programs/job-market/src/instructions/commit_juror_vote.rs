//! Commit a hidden juror vote

use crate::errors::JobMarketError;
use crate::events::JurorVoteCommitted;
use crate::state::{DisputeCase, Job, JobState, ProtocolConfig, HASH_SIZE};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;

#[derive(Accounts)]
pub struct CommitJurorVote<'info> {
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
        seeds = [b"case", job.key().as_ref()],
        bump = case.bump
    )]
    pub case: Box<Account<'info, DisputeCase>>,

    pub juror: Signer<'info>,
}

pub fn handler(ctx: Context<CommitJurorVote>, commitment: [u8; HASH_SIZE]) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;
    let clock = Clock::get()?;
    let job = &ctx.accounts.job;
    require!(job.state == JobState::Disputed, JobMarketError::InvalidJobState);

    let juror = ctx.accounts.juror.key();
    ctx.accounts
        .case
        .commit(&juror, commitment, clock.unix_timestamp)?;

    emit!(JurorVoteCommitted {
        job_id: job.job_id,
        juror,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
