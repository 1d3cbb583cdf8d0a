//! Update protocol parameters (multisig gated)

use anchor_lang::prelude::*;

use crate::events::ProtocolConfigUpdated;
use crate::state::{ProtocolConfig, ProtocolParams};
use crate::utils::multisig::require_multisig;
use crate::utils::version::check_version_compatible;

#[derive(Accounts)]
pub struct UpdateProtocolConfig<'info> {
    #[account(
        mut,
        seeds = [b"protocol"],
        bump = protocol_config.bump
    )]
    pub protocol_config: Account<'info, ProtocolConfig>,
}

pub fn handler(ctx: Context<UpdateProtocolConfig>, params: ProtocolParams) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;
    params.validate()?;
    require_multisig(&ctx.accounts.protocol_config, ctx.remaining_accounts)?;

    let config = &mut ctx.accounts.protocol_config;
    config.apply_params(&params);

    emit!(ProtocolConfigUpdated {
        protocol_fee_bps: params.protocol_fee_bps,
        approval_threshold: params.approval_threshold,
        validator_slash_pct: params.validator_slash_pct,
        agent_slash_pct: params.agent_slash_pct,
        slash_recipient_pct: params.slash_recipient_pct,
        min_validators: params.min_validators,
        max_validators: params.max_validators,
        appeal_bond: params.appeal_bond,
        timestamp: Clock::get()?.unix_timestamp,
    });

    Ok(())
}
