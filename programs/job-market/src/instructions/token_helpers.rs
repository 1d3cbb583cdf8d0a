//! SPL token transfers into and out of the protocol vault.
//!
//! The vault is a token account whose authority is the `["protocol"]` config
//! PDA, so every outgoing transfer is signed with the config seeds.

use crate::errors::JobMarketError;
use crate::events::StakeSlashed;
use crate::instructions::settlement_helpers::{split_slash, SlashSplit};
use anchor_lang::prelude::*;
use anchor_spl::token::{self, Transfer};

/// Transfer `amount` from a user-owned token account into the vault.
pub fn deposit_to_vault<'info>(
    from: &AccountInfo<'info>,
    vault: &AccountInfo<'info>,
    owner: &AccountInfo<'info>,
    amount: u64,
    token_program: &AccountInfo<'info>,
) -> Result<()> {
    if amount == 0 {
        return Ok(());
    }

    token::transfer(
        CpiContext::new(
            token_program.clone(),
            Transfer {
                from: from.clone(),
                to: vault.clone(),
                authority: owner.clone(),
            },
        ),
        amount,
    )
    .map_err(|_| JobMarketError::TokenTransferFailed)?;

    Ok(())
}

/// Accounts needed to sign transfers out of the vault.
pub struct VaultSigner<'a, 'info> {
    pub vault: &'a AccountInfo<'info>,
    pub protocol_config: &'a AccountInfo<'info>,
    pub config_bump: u8,
    pub token_program: &'a AccountInfo<'info>,
}

impl<'a, 'info> VaultSigner<'a, 'info> {
    /// Transfer `amount` from the vault to `recipient` using a PDA-signed CPI.
    pub fn pay(&self, recipient: &AccountInfo<'info>, amount: u64) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }

        let bump = [self.config_bump];
        let seeds: &[&[u8]] = &[b"protocol", &bump];
        let signer_seeds: &[&[&[u8]]] = &[seeds];

        token::transfer(
            CpiContext::new_with_signer(
                self.token_program.clone(),
                Transfer {
                    from: self.vault.clone(),
                    to: recipient.clone(),
                    authority: self.protocol_config.clone(),
                },
                signer_seeds,
            ),
            amount,
        )
        .map_err(|_| JobMarketError::TokenTransferFailed)?;

        Ok(())
    }

    /// Pay out a slash already removed from `owner`'s ledger, split between
    /// `recipient` and `treasury`, and emit `StakeSlashed`.
    #[allow(clippy::too_many_arguments)]
    pub fn pay_slash(
        &self,
        owner: Pubkey,
        role: u8,
        amount: u64,
        recipient_pct: u8,
        recipient: &AccountInfo<'info>,
        treasury: &AccountInfo<'info>,
        timestamp: i64,
    ) -> Result<SlashSplit> {
        let split = split_slash(amount, recipient_pct)?;
        self.pay(recipient, split.to_recipient)?;
        self.pay(treasury, split.to_treasury)?;

        if amount > 0 {
            emit!(StakeSlashed {
                owner,
                role,
                amount,
                recipient: recipient.key(),
                to_recipient: split.to_recipient,
                to_treasury: split.to_treasury,
                timestamp,
            });
        }

        Ok(split)
    }
}
