//! Fuzz target for the stake ledger
//!
//! Tests invariants:
//! - locked stake never exceeds staked stake
//! - failed ledger operations leave the entry untouched
//! - deposits and withdrawals conserve tokens between wallet and vault
//!
//! Run with: cargo test --release -p job-market-fuzz stake_ledger

use crate::*;
use anchor_lang::prelude::Pubkey;
use job_market::errors::JobMarketError;
use job_market::state::{StakeAccount, StakeRole};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum LedgerOp {
    Deposit(u64),
    Withdraw(u64),
    Lock(u64),
    Unlock(u64),
    Slash(u64),
    Release(u64),
}

fn arb_ledger_op() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        arb_amount().prop_map(LedgerOp::Deposit),
        arb_amount().prop_map(LedgerOp::Withdraw),
        arb_amount().prop_map(LedgerOp::Lock),
        arb_amount().prop_map(LedgerOp::Unlock),
        arb_amount().prop_map(LedgerOp::Slash),
        arb_amount().prop_map(LedgerOp::Release),
    ]
}

/// Reference model of the ledger: `(staked, locked)` or `None` when the
/// operation must be rejected.
fn model(staked: u64, locked: u64, op: LedgerOp) -> Option<(u64, u64)> {
    let available = staked - locked;
    match op {
        LedgerOp::Deposit(a) if a > 0 => Some((staked.checked_add(a)?, locked)),
        LedgerOp::Withdraw(a) if a > 0 && a <= available => Some((staked - a, locked)),
        LedgerOp::Lock(a) if a <= available => Some((staked, locked + a)),
        LedgerOp::Unlock(a) if a <= locked => Some((staked, locked - a)),
        LedgerOp::Slash(a) | LedgerOp::Release(a) if a <= locked => Some((staked - a, locked - a)),
        _ => None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Every ledger operation matches the reference model
    #[test]
    fn fuzz_stake_ledger_ops(ops in prop::collection::vec(arb_ledger_op(), 1..64)) {
        let mut stake = StakeAccount {
            owner: Pubkey::new_from_array([1u8; 32]),
            role: StakeRole::Validator,
            ..Default::default()
        };

        for op in ops {
            let (staked, locked) = (stake.staked, stake.locked);
            let result = match op {
                LedgerOp::Deposit(a) => stake.deposit(a),
                LedgerOp::Withdraw(a) => stake.withdraw(a),
                LedgerOp::Lock(a) => stake.lock(a),
                LedgerOp::Unlock(a) => stake.unlock(a),
                LedgerOp::Slash(a) => stake.slash(a),
                LedgerOp::Release(a) => stake.release(a),
            };

            match model(staked, locked, op) {
                Some((expected_staked, expected_locked)) => {
                    prop_assert!(result.is_ok(), "{:?} rejected on ({}, {})", op, staked, locked);
                    prop_assert_eq!(stake.staked, expected_staked);
                    prop_assert_eq!(stake.locked, expected_locked);
                    let delta = result.unwrap();
                    prop_assert_eq!(delta.staked_before, staked);
                    prop_assert_eq!(delta.locked_after, expected_locked);
                }
                None => {
                    prop_assert!(result.is_err(), "{:?} accepted on ({}, {})", op, staked, locked);
                    prop_assert_eq!(stake.staked, staked);
                    prop_assert_eq!(stake.locked, locked);
                }
            }

            prop_assert_eq!(
                check_stake_bounds(stake.staked, stake.locked),
                StakeInvariantResult::Valid
            );
        }
    }

    /// Deposits and withdrawals through the market move tokens one to one
    #[test]
    fn fuzz_deposit_withdraw_conserves_tokens(
        funding in 0u64..MAX_AMOUNT,
        deposit in arb_amount(),
        withdraw in arb_amount(),
    ) {
        let mut market = SimulatedMarket::new(Default::default()).unwrap();
        let owner = actor(3);
        market.fund(owner, funding);

        let deposited = outcome(market.deposit_stake(owner, StakeRole::Agent, deposit));
        if deposit == 0 {
            prop_assert!(deposited.is_error_code(JobMarketError::InvalidStakeAmount));
        } else if deposit > funding {
            prop_assert!(deposited.is_error_code(JobMarketError::TokenTransferFailed));
        } else {
            prop_assert!(deposited.is_success());
        }
        let staked = market.stake(&owner, StakeRole::Agent).map(|s| s.staked).unwrap_or_default();

        let withdrawn = outcome(market.withdraw_stake(owner, StakeRole::Agent, withdraw));
        if withdrawn.is_success() {
            prop_assert!(withdraw > 0 && withdraw <= staked);
        }

        let staked_after = market.stake(&owner, StakeRole::Agent).map(|s| s.staked).unwrap_or_default();
        prop_assert_eq!(market.balance(&owner) + staked_after, funding);
        prop_assert_eq!(market.vault, staked_after);
        prop_assert!(market.check_invariants().is_ok());
    }
}

#[test]
fn test_locked_stake_cannot_be_withdrawn() {
    let mut market = SimulatedMarket::new(Default::default()).unwrap();
    let agent = actor(2);
    market.fund(actor(1), 100);
    market.fund(agent, 50);
    market.deposit_stake(agent, StakeRole::Agent, 50).unwrap();
    let job_id = market.create_job(actor(1), 100, 40).unwrap();
    market.apply_for_job(job_id, agent).unwrap();

    let result = outcome(market.withdraw_stake(agent, StakeRole::Agent, 11));
    assert!(result.is_error_code(JobMarketError::InsufficientStake));
    market.withdraw_stake(agent, StakeRole::Agent, 10).unwrap();
    assert_eq!(market.balance(&agent), 10);
    assert!(market.check_invariants().is_ok());
}

#[test]
fn test_roles_have_separate_ledgers() {
    let mut market = SimulatedMarket::new(Default::default()).unwrap();
    let owner = actor(4);
    market.fund(owner, 30);
    market.deposit_stake(owner, StakeRole::Agent, 10).unwrap();
    market.deposit_stake(owner, StakeRole::Validator, 20).unwrap();

    let result = outcome(market.withdraw_stake(owner, StakeRole::Agent, 11));
    assert!(result.is_error_code(JobMarketError::InsufficientStake));
    assert_eq!(market.stake(&owner, StakeRole::Validator).unwrap().staked, 20);

    let result = outcome(market.withdraw_stake(owner, StakeRole::Platform, 1));
    assert!(result.is_error_code(JobMarketError::StakeAccountMismatch));
}
