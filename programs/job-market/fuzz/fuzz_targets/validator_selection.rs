//! Fuzz target for stake-weighted committee selection
//!
//! Tests invariants:
//! - selected indices are distinct and in range
//! - exactly `min(count, candidates)` seats are filled while weight remains
//! - selection is a pure function of weights, count and seed
//! - zero-weight candidates are never drawn
//!
//! Run with: cargo test --release -p job-market-fuzz validator_selection

use crate::*;
use job_market::instructions::validation_helpers::select_weighted;
use job_market::state::StakeRole;
use job_market::utils::randomness::selection_seed;
use proptest::prelude::*;
use std::collections::BTreeSet;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn fuzz_selection_distinct_and_sized(input in any::<SelectionInput>()) {
        let picks = select_weighted(&input.weights, input.count, &input.seed).unwrap();

        prop_assert_eq!(picks.len(), input.count.min(input.weights.len()));
        let unique: BTreeSet<usize> = picks.iter().copied().collect();
        prop_assert_eq!(unique.len(), picks.len(), "duplicate seat in {:?}", picks);
        prop_assert!(picks.iter().all(|i| *i < input.weights.len()));
    }

    #[test]
    fn fuzz_selection_deterministic(input in any::<SelectionInput>()) {
        let first = select_weighted(&input.weights, input.count, &input.seed).unwrap();
        let second = select_weighted(&input.weights, input.count, &input.seed).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn fuzz_selection_skips_zero_weight(
        weights in prop::collection::vec(prop_oneof![Just(0u64), arb_stake()], 1..=32),
        seed in arb_hash(),
    ) {
        let positive = weights.iter().filter(|w| **w > 0).count();
        prop_assume!(positive > 0);

        let picks = select_weighted(&weights, positive, &seed).unwrap();
        prop_assert_eq!(picks.len(), positive);
        for pick in picks {
            prop_assert!(weights[pick] > 0, "zero-weight index {} selected", pick);
        }
    }

    /// Seeds derived for different nonces of the same job draw independently
    #[test]
    fn fuzz_selection_seed_binds_job_and_nonce(
        slot_hash in arb_hash(),
        job_id in any::<u64>(),
        nonce in 0u64..u64::MAX,
    ) {
        let seed = selection_seed(&slot_hash, job_id, nonce);
        prop_assert_ne!(seed, selection_seed(&slot_hash, job_id, nonce + 1));
        prop_assert_ne!(seed, selection_seed(&slot_hash, job_id.wrapping_add(1), nonce));
    }
}

#[test]
fn test_zero_total_weight_rejected() {
    let result = outcome(select_weighted(&[0, 0, 0], 2, &[1u8; 32]));
    assert!(result.is_error_code(job_market::errors::JobMarketError::ZeroTotalWeight));
}

#[test]
fn test_single_candidate_always_selected() {
    for seed in 0u8..16 {
        assert_eq!(select_weighted(&[0, 5, 0], 3, &[seed; 32]).unwrap(), vec![1]);
    }
}

#[test]
fn test_heavy_validator_usually_seated_first() {
    let mut first_seat_wins = 0;
    for seed in 0u8..=255 {
        let picks = select_weighted(&[1_000_000, 1, 1], 1, &[seed; 32]).unwrap();
        if picks[0] == 0 {
            first_seat_wins += 1;
        }
    }
    assert!(first_seat_wins > 250);
}

#[test]
fn test_market_selection_seats_whole_small_pool() {
    let mut market = market_with_validators(Default::default(), &[30, 20, 10]).unwrap();
    let job_id = submitted_job(&mut market, 100, 0).unwrap();
    let seated = market.select_validators(job_id, [9u8; 32]).unwrap();

    let seated: BTreeSet<_> = seated.into_iter().collect();
    let expected: BTreeSet<_> = (10u8..13).map(actor).collect();
    assert_eq!(seated, expected);
    assert!(market.check_invariants().is_ok());
}

#[test]
fn test_market_selection_caps_committee() {
    let mut market = market_with_validators(Default::default(), &[10; 8]).unwrap();
    let job_id = submitted_job(&mut market, 100, 0).unwrap();
    let seated = market.select_validators(job_id, [3u8; 32]).unwrap();
    assert_eq!(seated.len(), market.config.max_validators as usize);
}

#[test]
fn test_blacklisted_and_unstaked_validators_skipped() {
    let mut market = market_with_validators(Default::default(), &[10, 10, 10, 10]).unwrap();
    market.set_blacklist(actor(10), true);
    let job_id = submitted_job(&mut market, 100, 0).unwrap();
    let seated = market.select_validators(job_id, [5u8; 32]).unwrap();
    assert_eq!(seated.len(), 3);
    assert!(!seated.contains(&actor(10)));

    let mut market = market_with_validators(Default::default(), &[10, 10]).unwrap();
    let mut pool: Vec<_> = market.pool.iter().map(|e| e.validator).collect();
    pool.push(actor(20));
    market.set_pool(&pool).unwrap();
    let job_id = submitted_job(&mut market, 100, 0).unwrap();
    let result = outcome(market.select_validators(job_id, [5u8; 32]));
    assert!(result.is_error_code(job_market::errors::JobMarketError::InsufficientValidators));
}

#[test]
fn test_job_parties_never_seated_on_their_own_job() {
    let mut market = market_with_validators(Default::default(), &[10, 10, 10]).unwrap();
    let (employer, agent) = (actor(1), actor(2));
    for party in [employer, agent] {
        market.fund(party, 1_000);
        market.deposit_stake(party, StakeRole::Validator, 1_000).unwrap();
    }
    let mut pool: Vec<_> = market.pool.iter().map(|e| e.validator).collect();
    pool.extend([employer, agent]);
    market.set_pool(&pool).unwrap();

    let job_id = submitted_job(&mut market, 100, 0).unwrap();
    let seated = market.select_validators(job_id, [9u8; 32]).unwrap();
    assert_eq!(seated.len(), 3);
    assert!(!seated.contains(&employer));
    assert!(!seated.contains(&agent));
    assert_eq!(market.stake(&employer, StakeRole::Validator).unwrap().locked, 0);

    // Without the parties the pool is too thin
    let mut market = market_with_validators(Default::default(), &[10, 10]).unwrap();
    market.fund(agent, 1_000);
    market.deposit_stake(agent, StakeRole::Validator, 1_000).unwrap();
    let mut pool: Vec<_> = market.pool.iter().map(|e| e.validator).collect();
    pool.push(agent);
    market.set_pool(&pool).unwrap();
    let job_id = submitted_job(&mut market, 100, 0).unwrap();
    let result = outcome(market.select_validators(job_id, [9u8; 32]));
    assert!(result.is_error_code(job_market::errors::JobMarketError::InsufficientValidators));
}
