//! Deposit tokens into the caller's stake ledger entry for a role

use crate::errors::JobMarketError;
use crate::events::stake_action;
use crate::instructions::ledger_helpers::emit_stake_changed;
use crate::instructions::token_helpers::deposit_to_vault;
use crate::state::{ProtocolConfig, ReputationRecord, StakeAccount, StakeRole};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

#[derive(Accounts)]
#[instruction(role: StakeRole)]
pub struct DepositStake<'info> {
    #[account(
        seeds = [b"protocol"],
        bump = protocol_config.bump
    )]
    pub protocol_config: Box<Account<'info, ProtocolConfig>>,

    #[account(
        init_if_needed,
        payer = owner,
        space = StakeAccount::SIZE,
        seeds = [b"stake", owner.key().as_ref(), &[role as u8]],
        bump
    )]
    pub stake: Box<Account<'info, StakeAccount>>,

    #[account(
        init_if_needed,
        payer = owner,
        space = ReputationRecord::SIZE,
        seeds = [b"reputation", owner.key().as_ref()],
        bump
    )]
    pub reputation: Box<Account<'info, ReputationRecord>>,

    #[account(
        mut,
        address = protocol_config.vault @ JobMarketError::TokenAccountMismatch
    )]
    pub vault: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        token::mint = protocol_config.stake_mint,
        token::authority = owner
    )]
    pub owner_token_account: Box<Account<'info, TokenAccount>>,

    #[account(mut)]
    pub owner: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

pub fn handler(ctx: Context<DepositStake>, role: StakeRole, amount: u64) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;
    let clock = Clock::get()?;
    let owner = ctx.accounts.owner.key();

    let stake = &mut ctx.accounts.stake;
    if stake.owner == Pubkey::default() {
        stake.owner = owner;
        stake.role = role;
        stake.bump = ctx.bumps.stake;
    }
    let delta = stake.deposit(amount)?;

    let reputation = &mut ctx.accounts.reputation;
    if reputation.owner == Pubkey::default() {
        reputation.owner = owner;
        reputation.last_updated = clock.unix_timestamp;
        reputation.bump = ctx.bumps.reputation;
    }

    deposit_to_vault(
        &ctx.accounts.owner_token_account.to_account_info(),
        &ctx.accounts.vault.to_account_info(),
        &ctx.accounts.owner.to_account_info(),
        amount,
        &ctx.accounts.token_program.to_account_info(),
    )?;

    emit_stake_changed(
        &ctx.accounts.stake,
        stake_action::DEPOSIT,
        amount,
        delta,
        clock.unix_timestamp,
    );

    Ok(())
}
