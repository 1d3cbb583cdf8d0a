//! Close an arbitration case once every juror has revealed.
//!
//! The majority verdict replaces the job outcome and the appeal bond goes to
//! the winning party. The case account is closed back to the appellant.

use crate::errors::JobMarketError;
use crate::events::{resolution_path, DisputeResolved};
use crate::instructions::token_helpers::VaultSigner;
use crate::state::{DisputeCase, Job, JobState, ProtocolConfig};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

#[derive(Accounts)]
pub struct FinalizeCase<'info> {
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
        mut,
        close = appellant,
        seeds = [b"case", job.key().as_ref()],
        bump = case.bump,
        constraint = case.job == job.key() @ JobMarketError::CaseJobMismatch
    )]
    pub case: Box<Account<'info, DisputeCase>>,

    /// CHECK: receives the case rent, checked against the case
    #[account(mut, address = case.appellant)]
    pub appellant: UncheckedAccount<'info>,

    #[account(
        mut,
        address = protocol_config.vault @ JobMarketError::TokenAccountMismatch
    )]
    pub vault: Box<Account<'info, TokenAccount>>,

    /// Token account of the winning party, checked in the handler
    #[account(
        mut,
        token::mint = protocol_config.stake_mint
    )]
    pub bond_recipient_token_account: Box<Account<'info, TokenAccount>>,

    pub caller: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

/// Apply a verdict to the job and pay the appeal bond to the winner.
pub(crate) fn settle_case<'info>(
    job: &mut Job,
    case: &DisputeCase,
    employer_wins: bool,
    path: u8,
    bond_recipient: &Account<'info, TokenAccount>,
    signer: &VaultSigner<'_, 'info>,
    now: i64,
) -> Result<()> {
    require!(job.state == JobState::Disputed, JobMarketError::InvalidJobState);
    job.enter_critical()?;
    job.resolve_dispute(employer_wins, now)?;

    let winner = if employer_wins { job.employer } else { job.agent };
    require_keys_eq!(
        bond_recipient.owner,
        winner,
        JobMarketError::TokenAccountMismatch
    );
    signer.pay(&bond_recipient.to_account_info(), case.bond)?;
    job.exit_critical();

    msg!(
        "Case for job {} resolved: employer_wins={} ({} of {} revealed)",
        job.job_id,
        employer_wins,
        case.reveals,
        case.jurors.len()
    );

    emit!(DisputeResolved {
        job_id: job.job_id,
        employer_wins,
        path,
        reveals: case.reveals,
        employer_votes: case.employer_votes,
        bond_recipient: winner,
        timestamp: now,
    });

    Ok(())
}

pub fn handler(ctx: Context<FinalizeCase>) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;
    let clock = Clock::get()?;

    let employer_wins = ctx.accounts.case.decide()?;

    let vault_info = ctx.accounts.vault.to_account_info();
    let config_info = ctx.accounts.protocol_config.to_account_info();
    let token_program_info = ctx.accounts.token_program.to_account_info();
    let signer = VaultSigner {
        vault: &vault_info,
        protocol_config: &config_info,
        config_bump: ctx.accounts.protocol_config.bump,
        token_program: &token_program_info,
    };

    settle_case(
        &mut ctx.accounts.job,
        &ctx.accounts.case,
        employer_wins,
        resolution_path::UNANIMOUS_REVEAL,
        &ctx.accounts.bond_recipient_token_account,
        &signer,
        clock.unix_timestamp,
    )
}
