//! Settle a completed job.
//!
//! On success the agent receives the reward minus the protocol fee plus its
//! locked stake, the fee goes to the fee pool and a certificate is minted.
//! On failure the employer is refunded and `agent_slash_pct` of the agent's
//! job stake is slashed, split between the employer and the treasury.

use crate::errors::JobMarketError;
use crate::events::{reputation_reason, CertificateMinted, FeeDeposited, JobFinalized};
use crate::instructions::constants::{REPUTATION_JOB_FAILURE_LOSS, REPUTATION_PER_COMPLETION};
use crate::instructions::ledger_helpers::{
    penalize_reputation, reward_reputation, settle_agent_stake,
};
use crate::instructions::settlement_helpers::{check_certificate_slot, plan_job_settlement};
use crate::instructions::token_helpers::VaultSigner;
use crate::state::{
    Certificate, Job, JobState, ProtocolConfig, ReputationRecord, StakeAccount, StakeRole,
};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

#[derive(Accounts)]
pub struct FinalizeJob<'info> {
    #[account(
        mut,
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

    /// Required when the job carries an agent stake
    #[account(
        mut,
        seeds = [b"stake", job.agent.as_ref(), &[StakeRole::Agent as u8]],
        bump = agent_stake.bump
    )]
    pub agent_stake: Option<Box<Account<'info, StakeAccount>>>,

    #[account(
        mut,
        seeds = [b"reputation", job.agent.as_ref()],
        bump = agent_reputation.bump
    )]
    pub agent_reputation: Box<Account<'info, ReputationRecord>>,

    /// Required on success, must be omitted on failure
    #[account(
        init,
        payer = caller,
        space = Certificate::SIZE,
        seeds = [b"certificate", job.key().as_ref()],
        bump
    )]
    pub certificate: Option<Box<Account<'info, Certificate>>>,

    #[account(
        mut,
        address = protocol_config.vault @ JobMarketError::TokenAccountMismatch
    )]
    pub vault: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        token::mint = protocol_config.stake_mint,
        constraint = agent_token_account.owner == job.agent @ JobMarketError::TokenAccountMismatch
    )]
    pub agent_token_account: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        token::mint = protocol_config.stake_mint,
        constraint = employer_token_account.owner == job.employer @ JobMarketError::TokenAccountMismatch
    )]
    pub employer_token_account: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        address = protocol_config.fee_pool @ JobMarketError::TokenAccountMismatch
    )]
    pub fee_pool: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        address = protocol_config.treasury @ JobMarketError::TokenAccountMismatch
    )]
    pub treasury: Box<Account<'info, TokenAccount>>,

    #[account(mut)]
    pub caller: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

pub fn handler(ctx: Context<FinalizeJob>) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;
    let clock = Clock::get()?;
    let now = clock.unix_timestamp;

    let job = &mut ctx.accounts.job;
    require!(job.state != JobState::Finalized, JobMarketError::JobAlreadyFinalized);
    require!(job.state == JobState::Completed, JobMarketError::InvalidJobState);
    check_certificate_slot(job.success, ctx.accounts.certificate.is_some())?;
    job.enter_critical()?;

    let config = &mut ctx.accounts.protocol_config;
    let plan = plan_job_settlement(
        job.reward,
        job.stake,
        job.fee_bps,
        job.success,
        config.agent_slash_pct,
    )?;
    job.transition(JobState::Finalized, now)?;

    settle_agent_stake(
        ctx.accounts.agent_stake.as_mut().map(|stake| &mut ***stake),
        job.stake,
        job.success,
        &plan,
        now,
    )?;

    let policy = config.reputation_policy();
    let reputation = &mut ctx.accounts.agent_reputation;
    if job.success {
        reward_reputation(
            reputation,
            REPUTATION_PER_COMPLETION,
            &policy,
            reputation_reason::JOB_COMPLETED,
            now,
        );

        let certificate = ctx
            .accounts
            .certificate
            .as_mut()
            .ok_or(JobMarketError::CertificateAccountMissing)?;
        certificate.job = job.key();
        certificate.job_id = job.job_id;
        certificate.owner = job.agent;
        certificate.metadata_hash = job.result_hash;
        certificate.token_id = config.next_certificate_id;
        certificate.minted_at = now;
        certificate.bump = ctx.bumps.certificate.unwrap_or_default();
        config.next_certificate_id = config
            .next_certificate_id
            .checked_add(1)
            .ok_or(JobMarketError::ArithmeticOverflow)?;

        emit!(CertificateMinted {
            job_id: job.job_id,
            owner: job.agent,
            token_id: certificate.token_id,
            metadata_hash: certificate.metadata_hash,
            timestamp: now,
        });

        config.completed_jobs = config
            .completed_jobs
            .checked_add(1)
            .ok_or(JobMarketError::ArithmeticOverflow)?;
        config.total_value_distributed = config
            .total_value_distributed
            .checked_add(plan.agent_payout)
            .ok_or(JobMarketError::ArithmeticOverflow)?;
    } else {
        penalize_reputation(
            reputation,
            REPUTATION_JOB_FAILURE_LOSS,
            &policy,
            reputation_reason::JOB_FAILED,
            now,
        );
    }

    let vault_info = ctx.accounts.vault.to_account_info();
    let config_info = config.to_account_info();
    let token_program_info = ctx.accounts.token_program.to_account_info();
    let signer = VaultSigner {
        vault: &vault_info,
        protocol_config: &config_info,
        config_bump: config.bump,
        token_program: &token_program_info,
    };

    if job.success {
        let agent_total = plan
            .agent_payout
            .checked_add(plan.stake_released)
            .ok_or(JobMarketError::ArithmeticOverflow)?;
        signer.pay(&ctx.accounts.agent_token_account.to_account_info(), agent_total)?;
        signer.pay(&ctx.accounts.fee_pool.to_account_info(), plan.fee)?;
        if plan.fee > 0 {
            emit!(FeeDeposited {
                job_id: job.job_id,
                amount: plan.fee,
                timestamp: now,
            });
        }
    } else {
        signer.pay(
            &ctx.accounts.employer_token_account.to_account_info(),
            plan.employer_refund,
        )?;
        signer.pay_slash(
            job.agent,
            StakeRole::Agent as u8,
            plan.stake_slashed,
            config.slash_recipient_pct,
            &ctx.accounts.employer_token_account.to_account_info(),
            &ctx.accounts.treasury.to_account_info(),
            now,
        )?;
    }

    job.exit_critical();

    emit!(JobFinalized {
        job_id: job.job_id,
        success: job.success,
        agent_payout: plan.agent_payout,
        fee: plan.fee,
        employer_refund: plan.employer_refund,
        stake_released: plan.stake_released,
        stake_slashed: plan.stake_slashed,
        timestamp: now,
    });

    Ok(())
}
