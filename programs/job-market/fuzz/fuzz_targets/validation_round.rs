//! Fuzz target for commit-reveal validation rounds
//!
//! Tests invariants:
//! - tallies equal the frozen stake of revealed seats
//! - the outcome follows the weighted threshold rule, ties included
//! - only seats that revealed with the outcome keep their stake
//! - a reveal must match its commitment exactly
//! - a job has at most one live round, and tallying happens once
//!
//! Run with: cargo test --release -p job-market-fuzz validation_round

use crate::*;
use anchor_lang::prelude::Pubkey;
use job_market::errors::JobMarketError;
use job_market::instructions::validation_helpers::{percentage_of, validation_commitment};
use job_market::instructions::settlement_helpers::split_slash;
use job_market::state::{JobState, ProtocolParams, StakeRole};
use proptest::prelude::*;
use std::collections::BTreeMap;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn fuzz_validation_round(input in any::<ValidationRoundInput>()) {
        let params = ProtocolParams {
            approval_threshold: input.threshold,
            validator_slash_pct: input.validator_slash_pct,
            slash_recipient_pct: input.slash_recipient_pct,
            max_validators: input.stakes.len() as u8,
            ..Default::default()
        };
        let mut market = market_with_validators(params, &input.stakes).unwrap();
        let job_id = submitted_job(&mut market, 1_000, 0).unwrap();
        let seated = market.select_validators(job_id, input.slot_hash).unwrap();
        prop_assert_eq!(seated.len(), input.stakes.len());

        let stake_of: BTreeMap<Pubkey, u64> = input
            .stakes
            .iter()
            .enumerate()
            .map(|(i, s)| (actor(10 + i as u8), *s))
            .collect();

        let ballots: Vec<(Pubkey, bool, bool)> = seated
            .iter()
            .zip(&input.ballots)
            .filter_map(|(v, b)| b.map(|(approve, reveal)| (*v, approve, reveal)))
            .collect();
        for (validator, approve, _) in &ballots {
            market.vote(job_id, *validator, *approve).unwrap();
        }
        market.advance(market.config.commit_window);

        let (mut approvals, mut rejections) = (0u64, 0u64);
        for (validator, approve, reveal) in &ballots {
            if !reveal {
                continue;
            }
            let weight = market.reveal_ballot(job_id, *validator).unwrap();
            prop_assert_eq!(weight, stake_of[validator]);
            if *approve {
                approvals += weight;
            } else {
                rejections += weight;
            }
        }

        let early = outcome(market.finalize_validation(job_id));
        prop_assert!(early.is_error_code(JobMarketError::RevealWindowStillOpen));

        market.advance(market.config.reveal_window);
        let employer_before = market.balance(&actor(1));
        let success = market.finalize_validation(job_id).unwrap();

        let round = market.current_round(job_id).unwrap().clone();
        prop_assert_eq!(round.approvals, approvals);
        prop_assert_eq!(round.rejections, rejections);
        prop_assert_eq!(
            check_weighted_outcome(approvals, rejections, input.threshold, success),
            RoundInvariantResult::Valid
        );

        let mut to_employer = 0u64;
        for seat in &round.seats {
            let original = stake_of[&seat.validator];
            let ledger = market.stake(&seat.validator, StakeRole::Validator).unwrap();
            prop_assert_eq!(ledger.locked, 0);
            if seat.revealed && seat.approve == success {
                prop_assert_eq!(ledger.staked, original);
            } else {
                let slashed = percentage_of(original, input.validator_slash_pct).unwrap();
                prop_assert_eq!(ledger.staked, original - slashed);
                to_employer += split_slash(slashed, input.slash_recipient_pct).unwrap().to_recipient;
            }
        }
        prop_assert_eq!(market.balance(&actor(1)), employer_before + to_employer);

        let job = market.job(job_id).unwrap();
        prop_assert_eq!(job.state, JobState::Completed);
        prop_assert_eq!(job.success, success);
        prop_assert!(!job.round_open);

        let again = outcome(market.finalize_validation(job_id));
        prop_assert!(again.is_error_code(JobMarketError::AlreadyTallied));
        prop_assert!(market.check_invariants().is_ok());
    }

    /// Flipping the vote or the salt never opens a commitment
    #[test]
    fn fuzz_reveal_must_match_commitment(
        approve in any::<bool>(),
        salt in arb_hash(),
        other_salt in arb_hash(),
    ) {
        prop_assume!(salt != other_salt);
        let mut market = market_with_validators(Default::default(), &[10, 10, 10]).unwrap();
        let job_id = submitted_job(&mut market, 100, 0).unwrap();
        let seated = market.select_validators(job_id, [1u8; 32]).unwrap();
        let validator = seated[0];

        let commitment = validation_commitment(job_id, 0, &validator, approve, &salt);
        market.commit_validation(job_id, validator, commitment).unwrap();
        market.advance(market.config.commit_window);

        let flipped = outcome(market.reveal_validation(job_id, validator, !approve, salt));
        prop_assert!(flipped.is_error_code(JobMarketError::InvalidReveal));
        let wrong_salt = outcome(market.reveal_validation(job_id, validator, approve, other_salt));
        prop_assert!(wrong_salt.is_error_code(JobMarketError::InvalidReveal));

        market.reveal_validation(job_id, validator, approve, salt).unwrap();
        let twice = outcome(market.reveal_validation(job_id, validator, approve, salt));
        prop_assert!(twice.is_error_code(JobMarketError::AlreadyRevealed));
    }
}

fn round_market() -> (SimulatedMarket, u64, Vec<Pubkey>) {
    let mut market = market_with_validators(Default::default(), &[30, 20, 10]).unwrap();
    let job_id = submitted_job(&mut market, 100, 0).unwrap();
    let seated = market.select_validators(job_id, [2u8; 32]).unwrap();
    (market, job_id, seated)
}

#[test]
fn test_commitment_bound_to_validator() {
    let (mut market, job_id, seated) = round_market();
    let salt = [4u8; 32];
    let copied = validation_commitment(job_id, 0, &seated[0], true, &salt);
    market.commit_validation(job_id, seated[0], copied).unwrap();
    market.commit_validation(job_id, seated[1], copied).unwrap();
    market.advance(market.config.commit_window);

    market.reveal_validation(job_id, seated[0], true, salt).unwrap();
    let result = outcome(market.reveal_validation(job_id, seated[1], true, salt));
    assert!(result.is_error_code(JobMarketError::InvalidReveal));
}

#[test]
fn test_round_windows_enforced() {
    let (mut market, job_id, seated) = round_market();
    market.vote(job_id, seated[0], true).unwrap();

    let result = outcome(market.vote(job_id, seated[0], false));
    assert!(result.is_error_code(JobMarketError::AlreadyCommitted));
    let result = outcome(market.reveal_ballot(job_id, seated[0]));
    assert!(result.is_error_code(JobMarketError::RevealWindowNotOpen));
    let result = outcome(market.vote(job_id, actor(99), true));
    assert!(result.is_error_code(JobMarketError::NotSelectedValidator));

    market.advance(market.config.commit_window);
    let result = outcome(market.vote(job_id, seated[1], true));
    assert!(result.is_error_code(JobMarketError::CommitWindowClosed));
    let result = outcome(market.reveal_ballot(job_id, seated[2]));
    assert!(result.is_error_code(JobMarketError::NotCommitted));

    market.advance(market.config.reveal_window);
    let result = outcome(market.reveal_ballot(job_id, seated[0]));
    assert!(result.is_error_code(JobMarketError::RevealWindowClosed));
}

#[test]
fn test_single_round_per_job() {
    let (mut market, job_id, _) = round_market();
    let result = outcome(market.select_validators(job_id, [3u8; 32]));
    assert!(result.is_error_code(JobMarketError::ValidatorsAlreadySelected));
}

#[test]
fn test_reset_nonce_voids_round_and_unlocks_seats() {
    let (mut market, job_id, seated) = round_market();
    market.vote(job_id, seated[0], true).unwrap();
    let stale = validation_commitment(job_id, 0, &seated[0], true, &salt_for(&seated[0], 0));

    assert_eq!(market.reset_job_nonce(job_id).unwrap(), 1);
    for validator in &seated {
        assert_eq!(market.stake(validator, StakeRole::Validator).unwrap().locked, 0);
    }
    assert!(market.check_invariants().is_ok());
    let result = outcome(market.reset_job_nonce(job_id));
    assert!(result.is_error_code(JobMarketError::RoundNotOpen));

    let reseated = market.select_validators(job_id, [2u8; 32]).unwrap();
    assert_eq!(market.current_round(job_id).unwrap().nonce, 1);

    // A commitment from the voided round does not open in the new one
    market.commit_validation(job_id, reseated[0], stale).unwrap();
    market.advance(market.config.commit_window);
    let salt = salt_for(&reseated[0], 0);
    let result = outcome(market.reveal_validation(job_id, reseated[0], true, salt));
    assert!(result.is_error_code(JobMarketError::InvalidReveal));
}

#[test]
fn test_threshold_tie_counts_as_approval() {
    let mut market = market_with_validators(Default::default(), &[25, 25, 50]).unwrap();
    let job_id = submitted_job(&mut market, 100, 0).unwrap();
    market.select_validators(job_id, [8u8; 32]).unwrap();
    let votes = [(actor(10), false), (actor(11), false), (actor(12), true)];

    assert!(run_round(&mut market, job_id, &votes).unwrap());
    let round = market.current_round(job_id).unwrap();
    assert_eq!((round.approvals, round.rejections), (50, 50));
}

#[test]
fn test_silent_round_fails_and_slashes_everyone() {
    let (mut market, job_id, seated) = round_market();
    market.advance(market.config.commit_window + market.config.reveal_window);

    assert!(!market.finalize_validation(job_id).unwrap());
    // 25% of 30, 20 and 10
    assert_eq!(market.stake(&actor(10), StakeRole::Validator).unwrap().staked, 23);
    assert_eq!(market.stake(&actor(11), StakeRole::Validator).unwrap().staked, 15);
    assert_eq!(market.stake(&actor(12), StakeRole::Validator).unwrap().staked, 8);
    assert_eq!(seated.len(), 3);
    assert!(market.check_invariants().is_ok());
}

#[test]
fn test_unrevealed_vote_slashed_like_minority() {
    let (mut market, job_id, _) = round_market();
    market.vote(job_id, actor(10), true).unwrap();
    market.vote(job_id, actor(11), true).unwrap();
    market.vote(job_id, actor(12), true).unwrap();
    market.advance(market.config.commit_window);
    market.reveal_ballot(job_id, actor(10)).unwrap();
    market.reveal_ballot(job_id, actor(11)).unwrap();
    market.advance(market.config.reveal_window);

    assert!(market.finalize_validation(job_id).unwrap());
    assert_eq!(market.stake(&actor(12), StakeRole::Validator).unwrap().staked, 8);
    assert_eq!(market.stake(&actor(11), StakeRole::Validator).unwrap().staked, 20);
}
