//! Fuzz target for the job lifecycle and settlement
//!
//! Tests invariants:
//! - settlement conserves the reward and the job stake
//! - the fee never exceeds the configured cap
//! - terminal jobs cannot be finalized, cancelled or re-applied
//! - arbitrary operation sequences keep the vault solvent and tokens conserved
//!
//! Run with: cargo test --release -p job-market-fuzz job_lifecycle

use crate::*;
use job_market::errors::JobMarketError;
use job_market::instructions::constants::MAX_PROTOCOL_FEE_BPS;
use job_market::instructions::settlement_helpers::{plan_job_settlement, split_slash};
use job_market::state::{JobState, ProtocolParams, StakeRole};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn fuzz_settlement_plan_conserves(input in any::<JobSettlementInput>()) {
        let plan = plan_job_settlement(
            input.reward,
            input.stake,
            input.fee_bps,
            input.success,
            input.agent_slash_pct,
        )
        .unwrap();

        if input.success {
            prop_assert_eq!(plan.agent_payout + plan.fee, input.reward);
            prop_assert_eq!(plan.stake_released, input.stake);
            prop_assert!(plan.fee as u128 * 10_000 <= input.reward as u128 * MAX_PROTOCOL_FEE_BPS as u128);
            prop_assert_eq!(plan.employer_refund, 0);
        } else {
            prop_assert_eq!(plan.employer_refund, input.reward);
            prop_assert_eq!(plan.stake_slashed + plan.stake_unlocked, input.stake);
            prop_assert_eq!(plan.agent_payout, 0);
            prop_assert_eq!(plan.fee, 0);
        }

        let split = split_slash(plan.stake_slashed, input.slash_recipient_pct).unwrap();
        prop_assert_eq!(split.to_recipient + split.to_treasury, plan.stake_slashed);
    }

    /// A full lifecycle pays out exactly what the plan says
    #[test]
    fn fuzz_job_lifecycle_settlement(input in any::<JobSettlementInput>()) {
        prop_assume!(input.reward > 0);
        let params = ProtocolParams {
            protocol_fee_bps: input.fee_bps,
            agent_slash_pct: input.agent_slash_pct,
            slash_recipient_pct: input.slash_recipient_pct,
            ..Default::default()
        };
        let mut market = market_with_validators(params, &[10, 10, 10]).unwrap();
        let job_id = submitted_job(&mut market, input.reward, input.stake).unwrap();
        market.select_validators(job_id, [6u8; 32]).unwrap();
        let votes: Vec<_> = (10u8..13).map(|v| (actor(v), input.success)).collect();
        prop_assert_eq!(run_round(&mut market, job_id, &votes).unwrap(), input.success);

        let plan = market.finalize_job(job_id).unwrap();
        let (employer, agent) = (actor(1), actor(2));
        if input.success {
            prop_assert_eq!(market.balance(&agent), plan.agent_payout + input.stake);
            prop_assert_eq!(market.fee_pool, plan.fee);
            prop_assert_eq!(market.balance(&employer), 0);
            prop_assert!(market.certificates.contains_key(&job_id));
        } else {
            let split = split_slash(plan.stake_slashed, input.slash_recipient_pct).unwrap();
            prop_assert_eq!(market.balance(&employer), input.reward + split.to_recipient);
            prop_assert_eq!(market.treasury, split.to_treasury);
            prop_assert_eq!(
                market.stake(&agent, StakeRole::Agent).map(|s| s.staked).unwrap_or_default(),
                plan.stake_unlocked
            );
            prop_assert!(!market.certificates.contains_key(&job_id));
        }

        let again = outcome(market.finalize_job(job_id));
        prop_assert!(again.is_error_code(JobMarketError::JobAlreadyFinalized));
        prop_assert!(market.check_invariants().is_ok());
    }

    /// Random instruction sequences never break a market-wide invariant
    #[test]
    fn fuzz_market_operation_sequences(ops in arb_market_ops(64)) {
        let mut market = market_with_validators(Default::default(), &[100, 80, 60, 40, 20, 10]).unwrap();
        for n in (1u8..=4).chain(10u8..=15) {
            market.fund(actor(n), 10 * MAX_AMOUNT);
        }

        for op in &ops {
            let result = market.step(op);
            prop_assert!(!result.is_invariant_violation(), "{:?}", result);
        }
    }
}

#[test]
fn test_successful_job_pays_agent_and_slashes_dissenter() {
    let mut market = market_with_validators(Default::default(), &[30, 20, 10]).unwrap();
    let job_id = submitted_job(&mut market, 100, 50).unwrap();
    market.select_validators(job_id, [1u8; 32]).unwrap();
    let votes = [(actor(10), true), (actor(11), true), (actor(12), false)];
    assert!(run_round(&mut market, job_id, &votes).unwrap());

    market.finalize_job(job_id).unwrap();
    assert_eq!(market.balance(&actor(2)), 150);
    assert_eq!(market.stake(&actor(2), StakeRole::Agent).unwrap().staked, 0);
    assert_eq!(market.stake(&actor(12), StakeRole::Validator).unwrap().staked, 8);
    assert_eq!(market.stake(&actor(10), StakeRole::Validator).unwrap().staked, 30);
    // Half of the 2 slashed goes to the employer, the rest to the treasury
    assert_eq!(market.balance(&actor(1)), 1);
    assert_eq!(market.treasury, 1);

    let certificate = &market.certificates[&job_id];
    assert_eq!(certificate.owner, actor(2));
    assert_eq!(certificate.token_id, 0);
    assert_eq!(market.config.completed_jobs, 1);
    assert_eq!(market.job(job_id).unwrap().state, JobState::Finalized);
    assert!(market.check_invariants().is_ok());
}

#[test]
fn test_failed_job_refunds_employer_and_slashes_agent() {
    let mut market = market_with_validators(Default::default(), &[30, 20, 10]).unwrap();
    let job_id = submitted_job(&mut market, 100, 50).unwrap();
    market.select_validators(job_id, [1u8; 32]).unwrap();
    let votes = [(actor(10), false), (actor(11), false), (actor(12), false)];
    assert!(!run_round(&mut market, job_id, &votes).unwrap());

    market.finalize_job(job_id).unwrap();
    assert_eq!(market.balance(&actor(1)), 125);
    assert_eq!(market.treasury, 25);
    assert_eq!(market.balance(&actor(2)), 0);
    assert_eq!(market.stake(&actor(2), StakeRole::Agent).unwrap().staked, 0);
    assert!(market.reputations[&actor(10)].score > 0);
    assert!(market.check_invariants().is_ok());
}

#[test]
fn test_cancel_before_submission_refunds() {
    let mut market = SimulatedMarket::new(Default::default()).unwrap();
    let (employer, agent) = (actor(1), actor(2));
    market.fund(employer, 200);
    market.fund(agent, 30);
    market.deposit_stake(agent, StakeRole::Agent, 30).unwrap();

    let open = market.create_job(employer, 100, 0).unwrap();
    market.cancel_job(open, employer).unwrap();

    let taken = market.create_job(employer, 100, 30).unwrap();
    market.apply_for_job(taken, agent).unwrap();
    let result = outcome(market.cancel_job(taken, agent));
    assert!(result.is_error_code(JobMarketError::NotEmployer));
    market.cancel_job(taken, employer).unwrap();

    assert_eq!(market.balance(&employer), 200);
    assert_eq!(market.stake(&agent, StakeRole::Agent).unwrap().locked, 0);

    let result = outcome(market.cancel_job(taken, employer));
    assert!(result.is_error_code(JobMarketError::InvalidJobState));
    let result = outcome(market.apply_for_job(open, agent));
    assert!(result.is_error_code(JobMarketError::InvalidJobState));
    assert!(market.check_invariants().is_ok());
}

#[test]
fn test_submission_without_committee_cancellable_after_timeout() {
    // Two staked validators cannot fill the default minimum of three
    let mut market = market_with_validators(Default::default(), &[10, 10]).unwrap();
    let (employer, agent) = (actor(1), actor(2));
    let job_id = submitted_job(&mut market, 200, 50).unwrap();

    let result = outcome(market.select_validators(job_id, [6u8; 32]));
    assert!(result.is_error_code(JobMarketError::InsufficientValidators));
    let result = outcome(market.cancel_job(job_id, employer));
    assert!(result.is_error_code(JobMarketError::SelectionTimeoutNotElapsed));

    market.advance(market.config.selection_timeout - 1);
    let result = outcome(market.cancel_job(job_id, employer));
    assert!(result.is_error_code(JobMarketError::SelectionTimeoutNotElapsed));
    let result = outcome(market.cancel_job(job_id, agent));
    assert!(result.is_error_code(JobMarketError::NotEmployer));

    market.advance(1);
    market.cancel_job(job_id, employer).unwrap();
    assert_eq!(market.job(job_id).unwrap().state, JobState::Cancelled);
    assert_eq!(market.balance(&employer), 200);
    let stake = market.stake(&agent, StakeRole::Agent).unwrap();
    assert_eq!((stake.staked, stake.locked), (50, 0));
    assert_eq!(market.vault, 70);
    market.withdraw_stake(agent, StakeRole::Agent, 50).unwrap();
    assert!(market.check_invariants().is_ok());
}

#[test]
fn test_seated_committee_blocks_cancel_until_reset() {
    let mut market = market_with_validators(Default::default(), &[10, 10, 10]).unwrap();
    let employer = actor(1);
    let job_id = submitted_job(&mut market, 100, 0).unwrap();
    market.select_validators(job_id, [6u8; 32]).unwrap();

    market.advance(market.config.selection_timeout);
    let result = outcome(market.cancel_job(job_id, employer));
    assert!(result.is_error_code(JobMarketError::InvalidJobState));

    // A reset restarts the selection timer
    market.reset_job_nonce(job_id).unwrap();
    let result = outcome(market.cancel_job(job_id, employer));
    assert!(result.is_error_code(JobMarketError::SelectionTimeoutNotElapsed));
    market.advance(market.config.selection_timeout);
    market.cancel_job(job_id, employer).unwrap();
    assert_eq!(market.balance(&employer), 100);
    assert!(market.check_invariants().is_ok());
}

#[test]
fn test_application_rules() {
    let mut market = SimulatedMarket::new(Default::default()).unwrap();
    let (employer, agent) = (actor(1), actor(2));
    market.fund(employer, 100);
    let job_id = market.create_job(employer, 100, 10).unwrap();

    let result = outcome(market.apply_for_job(job_id, employer));
    assert!(result.is_error_code(JobMarketError::EmployerCannotApply));
    let result = outcome(market.apply_for_job(job_id, agent));
    assert!(result.is_error_code(JobMarketError::InsufficientStake));

    market.set_blacklist(agent, true);
    let result = outcome(market.apply_for_job(job_id, agent));
    assert!(result.is_error_code(JobMarketError::Blacklisted));

    let result = outcome(market.create_job(employer, 0, 0));
    assert!(result.is_error_code(JobMarketError::InvalidReward));
}

#[test]
fn test_submission_requires_assigned_agent() {
    let mut market = SimulatedMarket::new(Default::default()).unwrap();
    market.fund(actor(1), 100);
    let job_id = market.create_job(actor(1), 100, 0).unwrap();
    market.apply_for_job(job_id, actor(2)).unwrap();

    let result = outcome(market.submit_job(job_id, actor(3), [1u8; 32]));
    assert!(result.is_error_code(JobMarketError::NotAssignedAgent));
    market.submit_job(job_id, actor(2), [1u8; 32]).unwrap();
    let result = outcome(market.cancel_job(job_id, actor(1)));
    assert!(result.is_error_code(JobMarketError::InvalidJobState));
    let result = outcome(market.finalize_job(job_id));
    assert!(result.is_error_code(JobMarketError::InvalidJobState));
}

#[test]
fn test_fee_frozen_at_creation() {
    let params = ProtocolParams {
        protocol_fee_bps: 500,
        ..Default::default()
    };
    let mut market = market_with_validators(params, &[10, 10, 10]).unwrap();
    let job_id = submitted_job(&mut market, 1_000, 0).unwrap();
    market.config.protocol_fee_bps = 1_000;
    market.select_validators(job_id, [1u8; 32]).unwrap();
    let votes: Vec<_> = (10u8..13).map(|v| (actor(v), true)).collect();
    run_round(&mut market, job_id, &votes).unwrap();

    let plan = market.finalize_job(job_id).unwrap();
    assert_eq!(plan.fee, 50);
    assert_eq!(market.fee_pool, 50);
    assert_eq!(market.balance(&actor(2)), 950);
}
