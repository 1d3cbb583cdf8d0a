//! Withdraw unlocked stake back to the owner

use crate::errors::JobMarketError;
use crate::events::stake_action;
use crate::instructions::ledger_helpers::emit_stake_changed;
use crate::instructions::token_helpers::VaultSigner;
use crate::state::{ProtocolConfig, StakeAccount, StakeRole};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

#[derive(Accounts)]
#[instruction(role: StakeRole)]
pub struct WithdrawStake<'info> {
    #[account(
        seeds = [b"protocol"],
        bump = protocol_config.bump
    )]
    pub protocol_config: Box<Account<'info, ProtocolConfig>>,

    #[account(
        mut,
        seeds = [b"stake", owner.key().as_ref(), &[role as u8]],
        bump = stake.bump,
        constraint = stake.owner == owner.key() @ JobMarketError::StakeAccountMismatch
    )]
    pub stake: Box<Account<'info, StakeAccount>>,

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

    pub owner: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

pub fn handler(ctx: Context<WithdrawStake>, _role: StakeRole, amount: u64) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;
    let clock = Clock::get()?;

    let delta = ctx.accounts.stake.withdraw(amount)?;

    let vault_info = ctx.accounts.vault.to_account_info();
    let config_info = ctx.accounts.protocol_config.to_account_info();
    let token_program_info = ctx.accounts.token_program.to_account_info();
    let signer = VaultSigner {
        vault: &vault_info,
        protocol_config: &config_info,
        config_bump: ctx.accounts.protocol_config.bump,
        token_program: &token_program_info,
    };
    signer.pay(&ctx.accounts.owner_token_account.to_account_info(), amount)?;

    emit_stake_changed(
        &ctx.accounts.stake,
        stake_action::WITHDRAW,
        amount,
        delta,
        clock.unix_timestamp,
    );

    Ok(())
}
