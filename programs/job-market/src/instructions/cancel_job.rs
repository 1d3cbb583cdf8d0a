//! Cancel a job and refund the employer.
//!
//! Open before submission, and for a submitted job that has waited
//! `selection_timeout` without a seated committee, as happens when too few
//! validators are eligible. The agent's job stake is unlocked.

use crate::errors::JobMarketError;
use crate::events::{stake_action, JobCancelled};
use crate::instructions::ledger_helpers::emit_stake_changed;
use crate::instructions::token_helpers::VaultSigner;
use crate::state::{Job, JobState, ProtocolConfig, StakeAccount, StakeRole};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

#[derive(Accounts)]
pub struct CancelJob<'info> {
    #[account(
        seeds = [b"protocol"],
        bump = protocol_config.bump
    )]
    pub protocol_config: Box<Account<'info, ProtocolConfig>>,

    #[account(
        mut,
        seeds = [b"job", job.job_id.to_le_bytes().as_ref()],
        bump = job.bump,
        has_one = employer @ JobMarketError::NotEmployer
    )]
    pub job: Box<Account<'info, Job>>,

    /// Required when an agent holds the job with a stake
    #[account(
        mut,
        seeds = [b"stake", job.agent.as_ref(), &[StakeRole::Agent as u8]],
        bump = agent_stake.bump
    )]
    pub agent_stake: Option<Box<Account<'info, StakeAccount>>>,

    #[account(
        mut,
        address = protocol_config.vault @ JobMarketError::TokenAccountMismatch
    )]
    pub vault: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        token::mint = protocol_config.stake_mint,
        token::authority = employer
    )]
    pub employer_token_account: Box<Account<'info, TokenAccount>>,

    pub employer: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

pub fn handler(ctx: Context<CancelJob>) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;
    let clock = Clock::get()?;

    let job = &mut ctx.accounts.job;
    job.check_cancellable(clock.unix_timestamp, ctx.accounts.protocol_config.selection_timeout)?;
    job.enter_critical()?;

    let mut stake_unlocked = 0;
    if job.state != JobState::Created && job.stake > 0 {
        let stake = ctx
            .accounts
            .agent_stake
            .as_mut()
            .ok_or(JobMarketError::StakeAccountMismatch)?;
        let delta = stake.unlock(job.stake)?;
        emit_stake_changed(stake, stake_action::UNLOCK, job.stake, delta, clock.unix_timestamp);
        stake_unlocked = job.stake;
    }
    job.transition(JobState::Cancelled, clock.unix_timestamp)?;

    let vault_info = ctx.accounts.vault.to_account_info();
    let config_info = ctx.accounts.protocol_config.to_account_info();
    let token_program_info = ctx.accounts.token_program.to_account_info();
    let signer = VaultSigner {
        vault: &vault_info,
        protocol_config: &config_info,
        config_bump: ctx.accounts.protocol_config.bump,
        token_program: &token_program_info,
    };
    signer.pay(&ctx.accounts.employer_token_account.to_account_info(), job.reward)?;

    job.exit_critical();

    emit!(JobCancelled {
        job_id: job.job_id,
        refund: job.reward,
        stake_unlocked,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
