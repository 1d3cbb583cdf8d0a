//! Create a job and escrow its reward in the vault

use crate::errors::JobMarketError;
use crate::events::JobCreated;
use crate::instructions::token_helpers::deposit_to_vault;
use crate::state::{Job, JobState, ProtocolConfig, HASH_SIZE};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

#[derive(Accounts)]
pub struct CreateJob<'info> {
    #[account(
        mut,
        seeds = [b"protocol"],
        bump = protocol_config.bump
    )]
    pub protocol_config: Box<Account<'info, ProtocolConfig>>,

    #[account(
        init,
        payer = employer,
        space = Job::SIZE,
        seeds = [b"job", protocol_config.next_job_id.to_le_bytes().as_ref()],
        bump
    )]
    pub job: Box<Account<'info, Job>>,

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

    #[account(mut)]
    pub employer: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

pub fn handler(
    ctx: Context<CreateJob>,
    reward: u64,
    stake: u64,
    spec_hash: [u8; HASH_SIZE],
) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;
    require!(reward > 0, JobMarketError::InvalidReward);
    let clock = Clock::get()?;

    let config = &mut ctx.accounts.protocol_config;
    let job_id = config.next_job_id;
    config.next_job_id = job_id
        .checked_add(1)
        .ok_or(JobMarketError::ArithmeticOverflow)?;

    let job = &mut ctx.accounts.job;
    job.job_id = job_id;
    job.employer = ctx.accounts.employer.key();
    job.agent = Pubkey::default();
    job.reward = reward;
    job.stake = stake;
    job.fee_bps = config.protocol_fee_bps;
    job.spec_hash = spec_hash;
    job.validation_nonce = 0;
    job.created_at = clock.unix_timestamp;
    job.bump = ctx.bumps.job;
    job.transition(JobState::Created, clock.unix_timestamp)?;

    deposit_to_vault(
        &ctx.accounts.employer_token_account.to_account_info(),
        &ctx.accounts.vault.to_account_info(),
        &ctx.accounts.employer.to_account_info(),
        reward,
        &ctx.accounts.token_program.to_account_info(),
    )?;

    emit!(JobCreated {
        job_id,
        employer: job.employer,
        reward,
        stake,
        fee_bps: job.fee_bps,
        spec_hash,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
