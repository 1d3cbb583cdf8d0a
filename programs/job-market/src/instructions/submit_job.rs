//! Submit completed work, opening the job for validation

use crate::errors::JobMarketError;
use crate::events::JobSubmitted;
use crate::state::{Job, JobState, ProtocolConfig, HASH_SIZE};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;

#[derive(Accounts)]
pub struct SubmitJob<'info> {
    #[account(
        seeds = [b"protocol"],
        bump = protocol_config.bump
    )]
    pub protocol_config: Account<'info, ProtocolConfig>,

    #[account(
        mut,
        seeds = [b"job", job.job_id.to_le_bytes().as_ref()],
        bump = job.bump,
        constraint = job.agent == agent.key() @ JobMarketError::NotAssignedAgent
    )]
    pub job: Account<'info, Job>,

    pub agent: Signer<'info>,
}

pub fn handler(ctx: Context<SubmitJob>, result_hash: [u8; HASH_SIZE]) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;
    let clock = Clock::get()?;

    let job = &mut ctx.accounts.job;
    require!(job.state == JobState::Applied, JobMarketError::InvalidJobState);
    job.result_hash = result_hash;
    job.transition(JobState::Submitted, clock.unix_timestamp)?;

    emit!(JobSubmitted {
        job_id: job.job_id,
        agent: job.agent,
        result_hash,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
