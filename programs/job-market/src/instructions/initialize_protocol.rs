//! Initialize protocol configuration, vault and validator pool

use crate::errors::JobMarketError;
use crate::events::ProtocolInitialized;
use crate::state::{ProtocolConfig, ProtocolParams, ValidatorPool, CURRENT_PROTOCOL_VERSION, MIN_SUPPORTED_VERSION};
use crate::utils::multisig::{count_owner_signatures, validate_multisig_owners};
use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

#[derive(Accounts)]
pub struct InitializeProtocol<'info> {
    #[account(
        init,
        payer = authority,
        space = ProtocolConfig::SIZE,
        seeds = [b"protocol"],
        bump
    )]
    pub protocol_config: Box<Account<'info, ProtocolConfig>>,

    /// Vault holding every stake, escrowed reward and appeal bond
    #[account(
        init,
        payer = authority,
        seeds = [b"vault"],
        bump,
        token::mint = stake_mint,
        token::authority = protocol_config
    )]
    pub vault: Box<Account<'info, TokenAccount>>,

    #[account(
        init,
        payer = authority,
        space = ValidatorPool::SIZE,
        seeds = [b"validator_pool"],
        bump
    )]
    pub validator_pool: Box<Account<'info, ValidatorPool>>,

    pub stake_mint: Box<Account<'info, Mint>>,

    /// Receives the treasury share of slashes
    #[account(token::mint = stake_mint)]
    pub treasury: Box<Account<'info, TokenAccount>>,

    /// Receives protocol fees
    #[account(token::mint = stake_mint)]
    pub fee_pool: Box<Account<'info, TokenAccount>>,

    #[account(mut)]
    pub authority: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

pub fn handler(
    ctx: Context<InitializeProtocol>,
    params: ProtocolParams,
    multisig_threshold: u8,
    multisig_owners: Vec<Pubkey>,
) -> Result<()> {
    // Validate everything before writing any config
    params.validate()?;
    validate_multisig_owners(&multisig_owners, multisig_threshold)?;
    require!(
        count_owner_signatures(&multisig_owners, ctx.remaining_accounts)
            >= multisig_threshold as usize,
        JobMarketError::MultisigNotEnoughSigners
    );

    let clock = Clock::get()?;
    let config = &mut ctx.accounts.protocol_config;
    config.authority = ctx.accounts.authority.key();
    config.treasury = ctx.accounts.treasury.key();
    config.fee_pool = ctx.accounts.fee_pool.key();
    config.stake_mint = ctx.accounts.stake_mint.key();
    config.vault = ctx.accounts.vault.key();
    config.apply_params(&params);
    config.next_job_id = 0;
    config.completed_jobs = 0;
    config.total_value_distributed = 0;
    config.next_certificate_id = 0;
    config.bump = ctx.bumps.protocol_config;
    config.vault_bump = ctx.bumps.vault;
    config.protocol_version = CURRENT_PROTOCOL_VERSION;
    config.min_supported_version = MIN_SUPPORTED_VERSION;
    config.multisig_threshold = multisig_threshold;
    config.multisig_owners_len = multisig_owners.len() as u8;
    config.multisig_owners = [Pubkey::default(); ProtocolConfig::MAX_MULTISIG_OWNERS];
    for (index, owner) in multisig_owners.iter().enumerate() {
        config.multisig_owners[index] = *owner;
    }

    let pool = &mut ctx.accounts.validator_pool;
    pool.entries = Vec::new();
    pool.bump = ctx.bumps.validator_pool;

    emit!(ProtocolInitialized {
        authority: config.authority,
        treasury: config.treasury,
        fee_pool: config.fee_pool,
        stake_mint: config.stake_mint,
        approval_threshold: config.approval_threshold,
        protocol_fee_bps: config.protocol_fee_bps,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
