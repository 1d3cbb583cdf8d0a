//! Replace the static validator pool (multisig gated)

use anchor_lang::prelude::*;

use crate::errors::JobMarketError;
use crate::events::ValidatorPoolUpdated;
use crate::state::{PoolEntry, ProtocolConfig, ValidatorPool, MAX_POOL_SIZE};
use crate::utils::multisig::require_multisig;
use crate::utils::version::check_version_compatible;

#[derive(Accounts)]
pub struct SetValidatorPool<'info> {
    #[account(
        seeds = [b"protocol"],
        bump = protocol_config.bump
    )]
    pub protocol_config: Account<'info, ProtocolConfig>,

    #[account(
        mut,
        seeds = [b"validator_pool"],
        bump = validator_pool.bump
    )]
    pub validator_pool: Account<'info, ValidatorPool>,
}

/// Build the new entry list, keeping allow-list and identity flags of
/// validators that stay in the pool.
pub fn rebuild_pool(current: &[PoolEntry], validators: &[Pubkey]) -> Result<Vec<PoolEntry>> {
    require!(
        validators.len() <= MAX_POOL_SIZE,
        JobMarketError::InvalidValidatorPool
    );
    let mut entries: Vec<PoolEntry> = Vec::with_capacity(validators.len());
    for validator in validators {
        require!(
            *validator != Pubkey::default(),
            JobMarketError::InvalidValidatorPool
        );
        require!(
            !entries.iter().any(|e| e.validator == *validator),
            JobMarketError::InvalidValidatorPool
        );
        let entry = current
            .iter()
            .find(|e| e.validator == *validator)
            .copied()
            .unwrap_or(PoolEntry {
                validator: *validator,
                allowlisted: false,
                identity_verified: false,
            });
        entries.push(entry);
    }
    Ok(entries)
}

pub fn handler(ctx: Context<SetValidatorPool>, validators: Vec<Pubkey>) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;
    require_multisig(&ctx.accounts.protocol_config, ctx.remaining_accounts)?;

    let pool = &mut ctx.accounts.validator_pool;
    pool.entries = rebuild_pool(&pool.entries, &validators)?;

    emit!(ValidatorPoolUpdated {
        size: pool.entries.len() as u8,
        timestamp: Clock::get()?.unix_timestamp,
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebuild_keeps_flags_of_remaining_validators() {
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        let c = Pubkey::new_unique();
        let current = vec![
            PoolEntry {
                validator: a,
                allowlisted: true,
                identity_verified: false,
            },
            PoolEntry {
                validator: b,
                allowlisted: false,
                identity_verified: true,
            },
        ];
        let rebuilt = rebuild_pool(&current, &[b, c]).unwrap();
        assert_eq!(rebuilt.len(), 2);
        assert!(rebuilt[0].identity_verified);
        assert_eq!(rebuilt[1].validator, c);
        assert!(!rebuilt[1].allowlisted);
    }

    #[test]
    fn test_rebuild_rejects_duplicates_and_oversize() {
        let a = Pubkey::new_unique();
        assert!(rebuild_pool(&[], &[a, a]).is_err());
        assert!(rebuild_pool(&[], &[Pubkey::default()]).is_err());
        let many: Vec<Pubkey> = (0..MAX_POOL_SIZE + 1).map(|_| Pubkey::new_unique()).collect();
        assert!(rebuild_pool(&[], &many).is_err());
    }
}
