//! Multisig approval helpers for governance instructions

use anchor_lang::prelude::*;

use crate::errors::JobMarketError;
use crate::state::ProtocolConfig;

/// Validate multisig owner pubkeys before config is written
pub fn validate_multisig_owners(owners: &[Pubkey], threshold: u8) -> Result<()> {
    require!(
        !owners.is_empty() && owners.len() <= ProtocolConfig::MAX_MULTISIG_OWNERS,
        JobMarketError::MultisigInvalidSigners
    );
    require!(
        threshold > 0 && (threshold as usize) <= owners.len(),
        JobMarketError::MultisigInvalidThreshold
    );
    for (index, owner) in owners.iter().enumerate() {
        require!(
            *owner != Pubkey::default(),
            JobMarketError::MultisigDefaultSigner
        );
        for other in owners.iter().skip(index + 1) {
            require!(*owner != *other, JobMarketError::MultisigDuplicateSigner);
        }
    }
    Ok(())
}

/// Count distinct configured owners among the signers in `accounts`
pub fn count_owner_signatures(owners: &[Pubkey], accounts: &[AccountInfo]) -> usize {
    owners
        .iter()
        .filter(|owner| {
            accounts
                .iter()
                .any(|account| account.is_signer && account.key == *owner)
        })
        .count()
}

/// Require `multisig_threshold` configured owners to have signed.
/// Signers are passed in `remaining_accounts`.
pub fn require_multisig(config: &ProtocolConfig, remaining_accounts: &[AccountInfo]) -> Result<()> {
    let owners_len = config.multisig_owners_len as usize;
    let threshold = config.multisig_threshold as usize;

    if owners_len == 0 || owners_len > ProtocolConfig::MAX_MULTISIG_OWNERS {
        return Err(error!(JobMarketError::MultisigInvalidSigners));
    }

    if threshold == 0 || threshold > owners_len {
        return Err(error!(JobMarketError::MultisigInvalidThreshold));
    }

    let owners = &config.multisig_owners[..owners_len];
    if owners.iter().any(|owner| *owner == Pubkey::default()) {
        return Err(error!(JobMarketError::MultisigDefaultSigner));
    }

    if count_owner_signatures(owners, remaining_accounts) < threshold {
        return Err(error!(JobMarketError::MultisigNotEnoughSigners));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_validation() {
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        assert!(validate_multisig_owners(&[a, b], 2).is_ok());
        assert!(validate_multisig_owners(&[a, b], 3).is_err());
        assert!(validate_multisig_owners(&[a, b], 0).is_err());
        assert!(validate_multisig_owners(&[a, a], 1).is_err());
        assert!(validate_multisig_owners(&[a, Pubkey::default()], 1).is_err());
        assert!(validate_multisig_owners(&[], 1).is_err());
    }
}
