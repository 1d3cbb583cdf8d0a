//! Payout arithmetic for job finalization and slashing.

use crate::errors::JobMarketError;
use crate::instructions::constants::BASIS_POINTS_DIVISOR;
use crate::instructions::validation_helpers::percentage_of;
use anchor_lang::prelude::*;

/// Protocol fee on a reward: `reward * fee_bps / 10000`
pub fn calculate_fee(reward: u64, fee_bps: u16) -> Result<u64> {
    let fee = (reward as u128)
        .checked_mul(fee_bps as u128)
        .ok_or(JobMarketError::ArithmeticOverflow)?
        / BASIS_POINTS_DIVISOR as u128;
    u64::try_from(fee).map_err(|_| JobMarketError::ArithmeticOverflow.into())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlashSplit {
    pub to_recipient: u64,
    pub to_treasury: u64,
}

/// Split a slashed amount between the recipient and the treasury.
/// Rounding remainders go to the treasury.
pub fn split_slash(amount: u64, recipient_pct: u8) -> Result<SlashSplit> {
    let to_recipient = percentage_of(amount, recipient_pct)?;
    let to_treasury = amount
        .checked_sub(to_recipient)
        .ok_or(JobMarketError::ArithmeticOverflow)?;
    Ok(SlashSplit {
        to_recipient,
        to_treasury,
    })
}

/// Token movements produced by finalizing a job
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JobSettlement {
    /// Reward minus fee, paid to the agent
    pub agent_payout: u64,
    /// Protocol fee, paid to the fee pool
    pub fee: u64,
    /// Reward returned to the employer
    pub employer_refund: u64,
    /// Locked job stake paid back to the agent
    pub stake_released: u64,
    /// Locked job stake slashed from the agent
    pub stake_slashed: u64,
    /// Locked job stake unlocked but kept on the agent's ledger
    pub stake_unlocked: u64,
}

/// Success: reward minus fee and the whole job stake go to the agent.
/// Failure: reward is refunded and `agent_slash_pct` of the job stake is
/// slashed, the rest unlocked.
pub fn plan_job_settlement(
    reward: u64,
    stake: u64,
    fee_bps: u16,
    success: bool,
    agent_slash_pct: u8,
) -> Result<JobSettlement> {
    if success {
        let fee = calculate_fee(reward, fee_bps)?;
        let agent_payout = reward
            .checked_sub(fee)
            .ok_or(JobMarketError::ArithmeticOverflow)?;
        Ok(JobSettlement {
            agent_payout,
            fee,
            stake_released: stake,
            ..Default::default()
        })
    } else {
        let stake_slashed = percentage_of(stake, agent_slash_pct)?;
        let stake_unlocked = stake
            .checked_sub(stake_slashed)
            .ok_or(JobMarketError::ArithmeticOverflow)?;
        Ok(JobSettlement {
            employer_refund: reward,
            stake_slashed,
            stake_unlocked,
            ..Default::default()
        })
    }
}

/// A certificate account must accompany a successful finalization and must
/// be absent from a failed one.
pub fn check_certificate_slot(success: bool, provided: bool) -> Result<()> {
    match (success, provided) {
        (true, false) => err!(JobMarketError::CertificateAccountMissing),
        (false, true) => err!(JobMarketError::CertificateNotExpected),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_calculation() {
        assert_eq!(calculate_fee(100, 0).unwrap(), 0);
        assert_eq!(calculate_fee(10_000, 100).unwrap(), 100);
        assert_eq!(calculate_fee(99, 100).unwrap(), 0);
        assert_eq!(calculate_fee(u64::MAX, 1000).unwrap(), u64::MAX / 10);
    }

    #[test]
    fn test_slash_split_conserves_amount() {
        let split = split_slash(11, 50).unwrap();
        assert_eq!(split.to_recipient, 5);
        assert_eq!(split.to_treasury, 6);
        assert_eq!(split_slash(10, 0).unwrap().to_treasury, 10);
        assert_eq!(split_slash(10, 100).unwrap().to_recipient, 10);
        assert!(split_slash(10, 101).is_err());
    }

    #[test]
    fn test_success_settlement_pays_agent() {
        let plan = plan_job_settlement(100, 50, 0, true, 100).unwrap();
        assert_eq!(plan.agent_payout + plan.stake_released, 150);
        assert_eq!(plan.employer_refund, 0);
        assert_eq!(plan.stake_slashed, 0);

        let plan = plan_job_settlement(100, 50, 500, true, 100).unwrap();
        assert_eq!(plan.fee, 5);
        assert_eq!(plan.agent_payout, 95);
    }

    #[test]
    fn test_failure_settlement_refunds_and_slashes() {
        let plan = plan_job_settlement(100, 50, 500, false, 40).unwrap();
        assert_eq!(plan.employer_refund, 100);
        assert_eq!(plan.fee, 0);
        assert_eq!(plan.agent_payout, 0);
        assert_eq!(plan.stake_slashed, 20);
        assert_eq!(plan.stake_unlocked, 30);
    }

    #[test]
    fn test_certificate_slot_follows_outcome() {
        assert!(check_certificate_slot(true, true).is_ok());
        assert!(check_certificate_slot(false, false).is_ok());
        assert_eq!(
            check_certificate_slot(true, false).unwrap_err(),
            JobMarketError::CertificateAccountMissing.into()
        );
        assert_eq!(
            check_certificate_slot(false, true).unwrap_err(),
            JobMarketError::CertificateNotExpected.into()
        );
    }
}
