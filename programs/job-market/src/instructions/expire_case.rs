//! Resolve an arbitration case whose jurors did not all reveal in time.
//!
//! Callable once `reveal_deadline + case_expiry_grace` has passed. The
//! majority of the revealed votes decides; with no reveals at all the
//! appellant loses. `remaining_accounts` carries the reputation record of
//! every juror, in juror order; jurors who never revealed are penalized.

use crate::errors::JobMarketError;
use crate::events::{reputation_reason, resolution_path};
use crate::instructions::constants::REPUTATION_ABSENT_JUROR_LOSS;
use crate::instructions::finalize_case::settle_case;
use crate::instructions::ledger_helpers::{load_reputation, penalize_reputation, store_program_account};
use crate::instructions::token_helpers::VaultSigner;
use crate::state::{DisputeCase, Job, ProtocolConfig};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

#[derive(Accounts)]
pub struct ExpireCase<'info> {
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

pub fn handler<'info>(ctx: Context<'_, '_, 'info, 'info, ExpireCase<'info>>) -> Result<()> {
    let config = &ctx.accounts.protocol_config;
    check_version_compatible(config)?;
    let clock = Clock::get()?;

    let employer_wins = ctx
        .accounts
        .case
        .decide_expired(config.case_expiry_grace, clock.unix_timestamp)?;

    let case = &ctx.accounts.case;
    require!(
        ctx.remaining_accounts.len() == case.jurors.len(),
        JobMarketError::InvalidRemainingAccounts
    );
    let policy = config.reputation_policy();
    for (seat, reputation_info) in case.jurors.iter().zip(ctx.remaining_accounts.iter()) {
        if seat.revealed {
            continue;
        }
        let mut reputation = load_reputation(reputation_info, &seat.juror)?;
        penalize_reputation(
            &mut reputation,
            REPUTATION_ABSENT_JUROR_LOSS,
            &policy,
            reputation_reason::ABSENT_JUROR,
            clock.unix_timestamp,
        );
        store_program_account(reputation_info, &reputation)?;
    }

    let vault_info = ctx.accounts.vault.to_account_info();
    let config_info = ctx.accounts.protocol_config.to_account_info();
    let token_program_info = ctx.accounts.token_program.to_account_info();
    let signer = VaultSigner {
        vault: &vault_info,
        protocol_config: &config_info,
        config_bump: config.bump,
        token_program: &token_program_info,
    };

    settle_case(
        &mut ctx.accounts.job,
        case,
        employer_wins,
        resolution_path::EXPIRED,
        &ctx.accounts.bond_recipient_token_account,
        &signer,
        clock.unix_timestamp,
    )
}
