//! Void a stuck validation round so a fresh committee can be drawn.
//!
//! `remaining_accounts` carries the stake account of every seat, in seat
//! order; each seat's round lock is released. Votes committed under the old
//! nonce can never be revealed against the next round.

use crate::errors::JobMarketError;
use crate::events::{stake_action, JobNonceReset};
use crate::instructions::ledger_helpers::{emit_stake_changed, load_stake_account, store_program_account};
use crate::state::{Job, JobState, ProtocolConfig, StakeRole, ValidationRound};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;

#[derive(Accounts)]
pub struct ResetJobNonce<'info> {
    #[account(
        seeds = [b"protocol"],
        bump = protocol_config.bump,
        has_one = authority @ JobMarketError::UnauthorizedAuthority
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

    pub authority: Signer<'info>,
}

pub fn handler<'info>(ctx: Context<'_, '_, 'info, 'info, ResetJobNonce<'info>>) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;
    let clock = Clock::get()?;

    let job = &mut ctx.accounts.job;
    require!(
        job.state == JobState::Submitted && job.round_open,
        JobMarketError::RoundNotOpen
    );

    let round = &mut ctx.accounts.round;
    require!(!round.tallied, JobMarketError::AlreadyTallied);
    require!(!round.voided, JobMarketError::RoundVoided);
    require!(
        ctx.remaining_accounts.len() == round.seats.len(),
        JobMarketError::InvalidRemainingAccounts
    );

    for (seat, stake_info) in round.seats.iter().zip(ctx.remaining_accounts.iter()) {
        if seat.locked == 0 {
            continue;
        }
        let mut stake = load_stake_account(stake_info, &seat.validator, StakeRole::Validator)?;
        let delta = stake.unlock(seat.locked)?;
        store_program_account(stake_info, &stake)?;
        emit_stake_changed(&stake, stake_action::UNLOCK, seat.locked, delta, clock.unix_timestamp);
    }
    round.voided = true;

    let old_nonce = job.validation_nonce;
    job.validation_nonce = old_nonce
        .checked_add(1)
        .ok_or(JobMarketError::ArithmeticOverflow)?;
    job.round_open = false;
    job.updated_at = clock.unix_timestamp;

    emit!(JobNonceReset {
        job_id: job.job_id,
        old_nonce,
        new_nonce: job.validation_nonce,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
