//! Appeal a validation outcome to the arbitrator committee.
//!
//! The agent may appeal a failed job, the employer a successful one, once per
//! job. The appellant escrows the appeal bond and the jurors are the
//! validators seated in the job's final round.

use crate::errors::JobMarketError;
use crate::events::DisputeRaised;
use crate::instructions::token_helpers::deposit_to_vault;
use crate::state::{
    DisputeCase, Job, JobState, JurorSeat, ProtocolConfig, ValidationRound, HASH_SIZE,
};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

#[derive(Accounts)]
pub struct RaiseDispute<'info> {
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

    #[account(
        seeds = [b"round", job.key().as_ref(), job.validation_nonce.to_le_bytes().as_ref()],
        bump = round.bump
    )]
    pub round: Box<Account<'info, ValidationRound>>,

    #[account(
        init,
        payer = appellant,
        space = DisputeCase::SIZE,
        seeds = [b"case", job.key().as_ref()],
        bump
    )]
    pub case: Box<Account<'info, DisputeCase>>,

    #[account(
        mut,
        address = protocol_config.vault @ JobMarketError::TokenAccountMismatch
    )]
    pub vault: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        token::mint = protocol_config.stake_mint,
        token::authority = appellant
    )]
    pub appellant_token_account: Box<Account<'info, TokenAccount>>,

    #[account(mut)]
    pub appellant: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

pub fn handler(ctx: Context<RaiseDispute>, evidence_hash: [u8; HASH_SIZE]) -> Result<()> {
    let config = &ctx.accounts.protocol_config;
    check_version_compatible(config)?;
    let clock = Clock::get()?;
    let appellant = ctx.accounts.appellant.key();

    let job = &mut ctx.accounts.job;
    require!(job.state == JobState::Completed, JobMarketError::NotDisputable);
    require!(!job.dispute_raised, JobMarketError::DisputeAlreadyRaised);

    let appellant_is_agent = appellant == job.agent;
    let may_appeal = if appellant_is_agent {
        !job.success
    } else {
        appellant == job.employer && job.success
    };
    require!(may_appeal, JobMarketError::NotDisputable);

    let round = &ctx.accounts.round;
    require!(round.tallied, JobMarketError::NotDisputable);
    require!(!round.seats.is_empty(), JobMarketError::InsufficientValidators);

    let commit_deadline = clock
        .unix_timestamp
        .checked_add(config.juror_commit_window)
        .ok_or(JobMarketError::ArithmeticOverflow)?;
    let reveal_deadline = commit_deadline
        .checked_add(config.juror_reveal_window)
        .ok_or(JobMarketError::ArithmeticOverflow)?;

    let case = &mut ctx.accounts.case;
    case.job = job.key();
    case.job_id = job.job_id;
    case.appellant = appellant;
    case.appellant_is_agent = appellant_is_agent;
    case.evidence_hash = evidence_hash;
    case.bond = config.appeal_bond;
    case.jurors = round
        .seats
        .iter()
        .map(|seat| JurorSeat {
            juror: seat.validator,
            ..Default::default()
        })
        .collect();
    case.commit_deadline = commit_deadline;
    case.reveal_deadline = reveal_deadline;
    case.opened_at = clock.unix_timestamp;
    case.bump = ctx.bumps.case;

    job.dispute_raised = true;
    job.transition(JobState::Disputed, clock.unix_timestamp)?;

    deposit_to_vault(
        &ctx.accounts.appellant_token_account.to_account_info(),
        &ctx.accounts.vault.to_account_info(),
        &ctx.accounts.appellant.to_account_info(),
        config.appeal_bond,
        &ctx.accounts.token_program.to_account_info(),
    )?;

    emit!(DisputeRaised {
        job_id: job.job_id,
        appellant,
        bond: config.appeal_bond,
        jurors: case.jurors.len() as u8,
        commit_deadline,
        reveal_deadline,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
