//! Seat a stake-weighted validator committee for a submitted job.
//!
//! `remaining_accounts` carries one `(stake, reputation)` pair per pool
//! member, in pool order. Eligible members have available stake and no
//! blacklist flag, and pass the identity gate when a validator root is set.
//! The job's employer and agent never sit on its committee. Selected
//! validators have `validator_slash_pct` of their frozen stake locked for
//! the round.

use crate::errors::JobMarketError;
use crate::events::{stake_action, ValidatorsSelected};
use crate::instructions::ledger_helpers::{
    emit_stake_changed, load_candidate, load_stake_account, store_program_account,
};
use crate::instructions::validation_helpers::{draw_committee, eligible_candidates};
use crate::state::{Job, JobState, ProtocolConfig, StakeRole, ValidationRound, ValidatorPool};
use crate::utils::randomness::{latest_slot_hash, selection_seed};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;
use anchor_lang::solana_program::sysvar;

#[derive(Accounts)]
pub struct SelectValidators<'info> {
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
        seeds = [b"validator_pool"],
        bump = validator_pool.bump
    )]
    pub validator_pool: Box<Account<'info, ValidatorPool>>,

    #[account(
        init,
        payer = payer,
        space = ValidationRound::SIZE,
        seeds = [b"round", job.key().as_ref(), job.validation_nonce.to_le_bytes().as_ref()],
        bump
    )]
    pub round: Box<Account<'info, ValidationRound>>,

    /// CHECK: address-checked SlotHashes sysvar, read raw
    #[account(address = sysvar::slot_hashes::ID)]
    pub slot_hashes: UncheckedAccount<'info>,

    #[account(mut)]
    pub payer: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn handler<'info>(ctx: Context<'_, '_, 'info, 'info, SelectValidators<'info>>) -> Result<()> {
    let config = &ctx.accounts.protocol_config;
    check_version_compatible(config)?;
    let clock = Clock::get()?;

    let job = &mut ctx.accounts.job;
    require!(job.state == JobState::Submitted, JobMarketError::InvalidJobState);
    require!(!job.round_open, JobMarketError::ValidatorsAlreadySelected);

    let pool = &ctx.accounts.validator_pool;
    require!(
        ctx.remaining_accounts.len() == pool.entries.len() * 2,
        JobMarketError::InvalidRemainingAccounts
    );

    let identity_required = config.validator_root != [0u8; 32];
    let candidates = eligible_candidates(
        &pool.entries,
        identity_required,
        &[job.employer, job.agent],
        |index, entry| {
            load_candidate(
                &ctx.remaining_accounts[index * 2],
                &ctx.remaining_accounts[index * 2 + 1],
                &entry.validator,
            )
        },
    )?;

    let slot_hash = latest_slot_hash(&ctx.accounts.slot_hashes.to_account_info())?;
    let seed = selection_seed(&slot_hash, job.job_id, job.validation_nonce);
    let committee = draw_committee(
        &pool.entries,
        &candidates,
        config.min_validators,
        config.max_validators,
        config.validator_slash_pct,
        &seed,
    )?;

    let mut seats = Vec::with_capacity(committee.len());
    for (pool_index, seat) in committee {
        if seat.locked > 0 {
            let stake_info = &ctx.remaining_accounts[pool_index * 2];
            let mut stake = load_stake_account(stake_info, &seat.validator, StakeRole::Validator)?;
            let delta = stake.lock(seat.locked)?;
            store_program_account(stake_info, &stake)?;
            emit_stake_changed(&stake, stake_action::LOCK, seat.locked, delta, clock.unix_timestamp);
        }
        seats.push(seat);
    }

    let commit_deadline = clock
        .unix_timestamp
        .checked_add(config.commit_window)
        .ok_or(JobMarketError::ArithmeticOverflow)?;
    let reveal_deadline = commit_deadline
        .checked_add(config.reveal_window)
        .ok_or(JobMarketError::ArithmeticOverflow)?;

    let validators: Vec<Pubkey> = seats.iter().map(|s| s.validator).collect();
    msg!(
        "Seated {} of {} candidates for job {} (nonce {})",
        seats.len(),
        candidates.len(),
        job.job_id,
        job.validation_nonce
    );

    let round = &mut ctx.accounts.round;
    round.job = job.key();
    round.job_id = job.job_id;
    round.nonce = job.validation_nonce;
    round.seats = seats;
    round.commit_deadline = commit_deadline;
    round.reveal_deadline = reveal_deadline;
    round.bump = ctx.bumps.round;

    job.round_open = true;
    job.updated_at = clock.unix_timestamp;

    emit!(ValidatorsSelected {
        job_id: job.job_id,
        nonce: job.validation_nonce,
        validators,
        commit_deadline,
        reveal_deadline,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
