//! Fuzz target for appeals and juror arbitration
//!
//! Tests invariants:
//! - only the losing side may appeal, and only once
//! - a case is decided by reveals only when every juror revealed
//! - the expiry fallback follows the majority of revealed votes, and an
//!   empty jury rules against the appellant
//! - the appeal bond goes to the winner and the verdict sets the outcome
//!
//! Run with: cargo test --release -p job-market-fuzz dispute_lifecycle

use crate::*;
use anchor_lang::prelude::Pubkey;
use job_market::errors::JobMarketError;
use job_market::state::{JobState, ProtocolParams, StakeRole};
use proptest::prelude::*;

/// Job with reward 100 and agent stake 50 whose round ended with `votes`.
fn validated_job(params: ProtocolParams, stakes: &[u64], votes: &[(Pubkey, bool)]) -> (SimulatedMarket, u64) {
    let mut market = market_with_validators(params, stakes).unwrap();
    let job_id = submitted_job(&mut market, 100, 50).unwrap();
    market.select_validators(job_id, [4u8; 32]).unwrap();
    run_round(&mut market, job_id, votes).unwrap();
    (market, job_id)
}

fn jurors(market: &SimulatedMarket, job_id: u64) -> Vec<Pubkey> {
    market.cases[&job_id].jurors.iter().map(|j| j.juror).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn fuzz_dispute_lifecycle(input in any::<DisputeInput>()) {
        let n = input.juror_votes.len();
        let params = ProtocolParams {
            appeal_bond: input.appeal_bond,
            ..Default::default()
        };
        let votes: Vec<_> = (0..n).map(|i| (actor(10 + i as u8), !input.agent_appeals)).collect();
        let (mut market, job_id) = validated_job(params, &vec![10; n], &votes);
        prop_assert_eq!(market.job(job_id).unwrap().success, !input.agent_appeals);

        let (employer, agent) = (actor(1), actor(2));
        let appellant = if input.agent_appeals { agent } else { employer };
        market.fund(appellant, input.appeal_bond);
        market.raise_dispute(job_id, appellant).unwrap();
        prop_assert_eq!(market.job(job_id).unwrap().state, JobState::Disputed);

        let seated = jurors(&market, job_id);
        prop_assert_eq!(seated.len(), n);
        let (mut reveals, mut employer_votes) = (0u8, 0u8);
        for (juror, vote) in seated.iter().zip(&input.juror_votes) {
            if let Some(employer_wins) = vote {
                market.juror_vote(job_id, *juror, *employer_wins).unwrap();
            }
        }
        market.advance(market.config.juror_commit_window);
        for (juror, vote) in seated.iter().zip(&input.juror_votes) {
            if let Some(employer_wins) = vote {
                market.reveal_juror_ballot(job_id, *juror).unwrap();
                reveals += 1;
                employer_votes += *employer_wins as u8;
            }
        }
        prop_assert_eq!(
            check_case_counters(&market.cases[&job_id]),
            DisputeInvariantResult::Valid
        );

        let winner_balances = (market.balance(&employer), market.balance(&agent));
        let employer_wins = if reveals as usize == n {
            market.finalize_case(job_id).unwrap()
        } else {
            let blocked = outcome(market.finalize_case(job_id));
            prop_assert!(blocked.is_error_code(JobMarketError::JurorsNotRevealed));
            market.advance(market.config.juror_reveal_window);
            let early = outcome(market.expire_case(job_id));
            prop_assert!(early.is_error_code(JobMarketError::CaseNotExpired));
            market.advance(market.config.case_expiry_grace);
            market.expire_case(job_id).unwrap()
        };

        if reveals == 0 {
            prop_assert_eq!(employer_wins, input.agent_appeals);
        } else {
            prop_assert_eq!(
                check_majority_verdict(employer_votes, reveals, employer_wins),
                DisputeInvariantResult::Valid
            );
        }

        let (employer_after, agent_after) = (market.balance(&employer), market.balance(&agent));
        if employer_wins {
            prop_assert_eq!(employer_after, winner_balances.0 + input.appeal_bond);
            prop_assert_eq!(agent_after, winner_balances.1);
        } else {
            prop_assert_eq!(agent_after, winner_balances.1 + input.appeal_bond);
            prop_assert_eq!(employer_after, winner_balances.0);
        }

        for (juror, vote) in seated.iter().zip(&input.juror_votes) {
            // Every juror earned 10 for voting with the round; absentees lose 50
            let expected = if vote.is_some() { 10 } else { 0 };
            prop_assert_eq!(market.reputations[juror].score, expected);
        }

        let job = market.job(job_id).unwrap();
        prop_assert_eq!(job.state, JobState::Completed);
        prop_assert_eq!(job.success, !employer_wins);
        prop_assert!(!market.cases.contains_key(&job_id));

        let again = outcome(market.raise_dispute(job_id, appellant));
        prop_assert!(again.is_error_code(JobMarketError::DisputeAlreadyRaised));
        market.finalize_job(job_id).unwrap();
        prop_assert!(market.check_invariants().is_ok());
    }
}

#[test]
fn test_agent_appeal_overturns_failure() {
    let params = ProtocolParams {
        appeal_bond: 5,
        ..Default::default()
    };
    let votes = [(actor(10), false), (actor(11), false), (actor(12), true)];
    let (mut market, job_id) = validated_job(params, &[30, 20, 10], &votes);
    assert!(!market.job(job_id).unwrap().success);

    let agent = actor(2);
    market.fund(agent, 5);
    market.raise_dispute(job_id, agent).unwrap();
    assert_eq!(market.vault_liabilities(), market.vault);

    let verdicts = [(actor(10), false), (actor(11), false), (actor(12), true)];
    for (juror, employer_wins) in verdicts {
        market.juror_vote(job_id, juror, employer_wins).unwrap();
    }
    market.advance(market.config.juror_commit_window);
    for (juror, _) in verdicts {
        market.reveal_juror_ballot(job_id, juror).unwrap();
    }
    assert!(!market.finalize_case(job_id).unwrap());
    assert!(market.job(job_id).unwrap().success);

    market.finalize_job(job_id).unwrap();
    assert_eq!(market.balance(&agent), 155);
    assert_eq!(market.stake(&agent, StakeRole::Agent).unwrap().staked, 0);
    assert!(market.certificates.contains_key(&job_id));
    // The dissenting validator's slash from the round stands
    assert_eq!(market.stake(&actor(12), StakeRole::Validator).unwrap().staked, 8);
    assert!(market.check_invariants().is_ok());
}

#[test]
fn test_employer_appeal_upheld_refunds_and_slashes_agent() {
    let params = ProtocolParams {
        appeal_bond: 5,
        ..Default::default()
    };
    let votes: Vec<_> = (10u8..13).map(|v| (actor(v), true)).collect();
    let (mut market, job_id) = validated_job(params, &[10, 10, 10], &votes);

    let employer = actor(1);
    market.fund(employer, 5);
    market.raise_dispute(job_id, employer).unwrap();
    for juror in jurors(&market, job_id) {
        market.juror_vote(job_id, juror, true).unwrap();
    }
    market.advance(market.config.juror_commit_window);
    for juror in jurors(&market, job_id) {
        market.reveal_juror_ballot(job_id, juror).unwrap();
    }
    assert!(market.finalize_case(job_id).unwrap());

    market.finalize_job(job_id).unwrap();
    // Bond back, reward refunded, half of the 50 agent slash
    assert_eq!(market.balance(&employer), 130);
    assert_eq!(market.treasury, 25);
    assert!(!market.certificates.contains_key(&job_id));
    assert!(market.check_invariants().is_ok());
}

#[test]
fn test_only_losing_side_may_appeal() {
    let votes: Vec<_> = (10u8..13).map(|v| (actor(v), false)).collect();
    let (mut market, job_id) = validated_job(Default::default(), &[10, 10, 10], &votes);

    let result = outcome(market.raise_dispute(job_id, actor(1)));
    assert!(result.is_error_code(JobMarketError::NotDisputable));
    let result = outcome(market.raise_dispute(job_id, actor(7)));
    assert!(result.is_error_code(JobMarketError::NotDisputable));

    market.finalize_job(job_id).unwrap();
    let result = outcome(market.raise_dispute(job_id, actor(2)));
    assert!(result.is_error_code(JobMarketError::NotDisputable));
}

#[test]
fn test_appeal_requires_tallied_round() {
    let mut market = market_with_validators(Default::default(), &[10, 10, 10]).unwrap();
    let job_id = submitted_job(&mut market, 100, 0).unwrap();
    market.select_validators(job_id, [4u8; 32]).unwrap();
    let result = outcome(market.raise_dispute(job_id, actor(2)));
    assert!(result.is_error_code(JobMarketError::NotDisputable));
}

#[test]
fn test_silent_jury_rules_against_appellant() {
    let params = ProtocolParams {
        appeal_bond: 7,
        ..Default::default()
    };
    let votes: Vec<_> = (10u8..13).map(|v| (actor(v), false)).collect();
    let (mut market, job_id) = validated_job(params, &[10, 10, 10], &votes);
    market.fund(actor(2), 7);
    market.raise_dispute(job_id, actor(2)).unwrap();

    let result = outcome(market.juror_vote(job_id, actor(20), true));
    assert!(result.is_error_code(JobMarketError::NotJuror));
    let result = outcome(market.finalize_case(job_id));
    assert!(result.is_error_code(JobMarketError::JurorsNotRevealed));

    market.advance(
        market.config.juror_commit_window + market.config.juror_reveal_window + market.config.case_expiry_grace,
    );
    assert!(market.expire_case(job_id).unwrap());
    assert!(!market.job(job_id).unwrap().success);
    assert_eq!(market.balance(&actor(1)), 7);
    for juror in (10u8..13).map(actor) {
        assert_eq!(market.reputations[&juror].score, 0);
    }
    assert!(market.check_invariants().is_ok());
}

#[test]
fn test_juror_tie_favours_agent() {
    let votes: Vec<_> = (10u8..14).map(|v| (actor(v), true)).collect();
    let (mut market, job_id) = validated_job(Default::default(), &[10, 10, 10, 10], &votes);
    market.raise_dispute(job_id, actor(1)).unwrap();

    let seated = jurors(&market, job_id);
    for (i, juror) in seated.iter().enumerate() {
        market.juror_vote(job_id, *juror, i % 2 == 0).unwrap();
    }
    market.advance(market.config.juror_commit_window);
    for juror in &seated {
        market.reveal_juror_ballot(job_id, *juror).unwrap();
    }
    assert!(!market.finalize_case(job_id).unwrap());
    assert!(market.job(job_id).unwrap().success);
}

#[test]
fn test_juror_reveal_must_match_commitment() {
    let votes: Vec<_> = (10u8..13).map(|v| (actor(v), true)).collect();
    let (mut market, job_id) = validated_job(Default::default(), &[10, 10, 10], &votes);
    market.raise_dispute(job_id, actor(1)).unwrap();
    let juror = jurors(&market, job_id)[0];
    market.juror_vote(job_id, juror, true).unwrap();
    market.advance(market.config.juror_commit_window);

    let salt = salt_for(&juror, u64::MAX);
    let result = outcome(market.reveal_juror_vote(job_id, juror, false, salt));
    assert!(result.is_error_code(JobMarketError::InvalidReveal));
    market.reveal_juror_vote(job_id, juror, true, salt).unwrap();
}
