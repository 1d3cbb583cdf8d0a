//! Tally a validation round after its reveal window.
//!
//! `remaining_accounts` carries one `(stake, reputation)` pair per seat, in
//! seat order. Validators whose revealed vote matches the outcome get their
//! round lock released and a reputation reward. Everyone else (wrong vote or
//! no reveal) loses the locked amount, split between the employer and the
//! treasury, and reputation.

use crate::errors::JobMarketError;
use crate::events::{StakeSlashed, ValidationFinalized};
use crate::instructions::ledger_helpers::{
    load_reputation, load_stake_account, settle_validator_seat, store_program_account,
};
use crate::instructions::token_helpers::VaultSigner;
use crate::state::{Job, JobState, ProtocolConfig, StakeRole, ValidationRound};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

#[derive(Accounts)]
pub struct FinalizeValidation<'info> {
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
        seeds = [b"round", job.key().as_ref(), job.validation_nonce.to_le_bytes().as_ref()],
        bump = round.bump
    )]
    pub round: Box<Account<'info, ValidationRound>>,

    #[account(
        mut,
        address = protocol_config.vault @ JobMarketError::TokenAccountMismatch
    )]
    pub vault: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        token::mint = protocol_config.stake_mint,
        constraint = employer_token_account.owner == job.employer @ JobMarketError::TokenAccountMismatch
    )]
    pub employer_token_account: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        address = protocol_config.treasury @ JobMarketError::TokenAccountMismatch
    )]
    pub treasury: Box<Account<'info, TokenAccount>>,

    pub caller: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

pub fn handler<'info>(ctx: Context<'_, '_, 'info, 'info, FinalizeValidation<'info>>) -> Result<()> {
    let config = &ctx.accounts.protocol_config;
    check_version_compatible(config)?;
    let clock = Clock::get()?;

    require!(!ctx.accounts.round.tallied, JobMarketError::AlreadyTallied);
    let job = &mut ctx.accounts.job;
    require!(
        job.state == JobState::Submitted && job.round_open,
        JobMarketError::RoundNotOpen
    );

    let success = ctx
        .accounts
        .round
        .tally(config.approval_threshold, clock.unix_timestamp)?;
    let round = &ctx.accounts.round;
    require!(
        ctx.remaining_accounts.len() == round.seats.len() * 2,
        JobMarketError::InvalidRemainingAccounts
    );

    let employer_key = ctx.accounts.employer_token_account.key();
    let mut slashed_total: u64 = 0;
    let mut to_employer: u64 = 0;
    let mut to_treasury: u64 = 0;

    for (index, seat) in round.seats.iter().enumerate() {
        let stake_info = &ctx.remaining_accounts[index * 2];
        let reputation_info = &ctx.remaining_accounts[index * 2 + 1];
        let mut stake = load_stake_account(stake_info, &seat.validator, StakeRole::Validator)?;
        let mut reputation = load_reputation(reputation_info, &seat.validator)?;

        let slash = settle_validator_seat(
            seat,
            success,
            &mut stake,
            &mut reputation,
            config,
            clock.unix_timestamp,
        )?;
        if let Some(split) = slash {
            emit!(StakeSlashed {
                owner: seat.validator,
                role: StakeRole::Validator as u8,
                amount: seat.locked,
                recipient: employer_key,
                to_recipient: split.to_recipient,
                to_treasury: split.to_treasury,
                timestamp: clock.unix_timestamp,
            });
            slashed_total = slashed_total
                .checked_add(seat.locked)
                .ok_or(JobMarketError::ArithmeticOverflow)?;
            to_employer = to_employer
                .checked_add(split.to_recipient)
                .ok_or(JobMarketError::ArithmeticOverflow)?;
            to_treasury = to_treasury
                .checked_add(split.to_treasury)
                .ok_or(JobMarketError::ArithmeticOverflow)?;
        }

        store_program_account(stake_info, &stake)?;
        store_program_account(reputation_info, &reputation)?;
    }

    job.finalize_after_validation(success, clock.unix_timestamp)?;

    let vault_info = ctx.accounts.vault.to_account_info();
    let config_info = ctx.accounts.protocol_config.to_account_info();
    let token_program_info = ctx.accounts.token_program.to_account_info();
    let signer = VaultSigner {
        vault: &vault_info,
        protocol_config: &config_info,
        config_bump: config.bump,
        token_program: &token_program_info,
    };
    signer.pay(&ctx.accounts.employer_token_account.to_account_info(), to_employer)?;
    signer.pay(&ctx.accounts.treasury.to_account_info(), to_treasury)?;

    msg!(
        "Job {} round {} tallied: success={} slashed={}",
        job.job_id,
        round.nonce,
        success,
        slashed_total
    );

    emit!(ValidationFinalized {
        job_id: job.job_id,
        nonce: round.nonce,
        success,
        approvals: round.approvals,
        rejections: round.rejections,
        slashed_total,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
