//! Apply for an open job, locking the required agent stake

use crate::errors::JobMarketError;
use crate::events::{stake_action, JobApplied};
use crate::instructions::ledger_helpers::emit_stake_changed;
use crate::state::{Job, JobState, ProtocolConfig, ReputationRecord, StakeAccount, StakeRole, HASH_SIZE};
use crate::utils::identity::is_authorized;
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;

#[derive(Accounts)]
pub struct ApplyForJob<'info> {
    #[account(
        seeds = [b"protocol"],
        bump = protocol_config.bump
    )]
    pub protocol_config: Box<Account<'info, ProtocolConfig>>,

    #[account(
        mut,
        seeds = [b"job", job.job_id.to_le_bytes().as_ref()],
        bump = job.bump
    )]
    pub job: Box<Account<'info, Job>>,

    /// Required when the job asks for a stake
    #[account(
        mut,
        seeds = [b"stake", agent.key().as_ref(), &[StakeRole::Agent as u8]],
        bump = agent_stake.bump
    )]
    pub agent_stake: Option<Box<Account<'info, StakeAccount>>>,

    #[account(
        init_if_needed,
        payer = agent,
        space = ReputationRecord::SIZE,
        seeds = [b"reputation", agent.key().as_ref()],
        bump
    )]
    pub agent_reputation: Box<Account<'info, ReputationRecord>>,

    #[account(mut)]
    pub agent: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn handler(
    ctx: Context<ApplyForJob>,
    label: [u8; HASH_SIZE],
    proof: Vec<[u8; HASH_SIZE]>,
) -> Result<()> {
    let config = &ctx.accounts.protocol_config;
    check_version_compatible(config)?;
    let clock = Clock::get()?;
    let agent = ctx.accounts.agent.key();

    let job = &mut ctx.accounts.job;
    require!(job.state == JobState::Created, JobMarketError::InvalidJobState);
    require!(agent != job.employer, JobMarketError::EmployerCannotApply);
    require!(
        is_authorized(&config.agent_root, false, &agent, &label, &proof),
        JobMarketError::UnauthorizedIdentity
    );

    let reputation = &mut ctx.accounts.agent_reputation;
    if reputation.owner == Pubkey::default() {
        reputation.owner = agent;
        reputation.last_updated = clock.unix_timestamp;
        reputation.bump = ctx.bumps.agent_reputation;
    }
    require!(!reputation.blacklisted, JobMarketError::Blacklisted);

    if job.stake > 0 {
        let stake = ctx
            .accounts
            .agent_stake
            .as_mut()
            .ok_or(JobMarketError::InsufficientStake)?;
        let delta = stake.lock(job.stake)?;
        emit_stake_changed(stake, stake_action::LOCK, job.stake, delta, clock.unix_timestamp);
    }

    job.agent = agent;
    job.transition(JobState::Applied, clock.unix_timestamp)?;

    emit!(JobApplied {
        job_id: job.job_id,
        agent,
        stake_locked: job.stake,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
