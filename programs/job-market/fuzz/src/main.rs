//! Fuzz test runner for the Job Market Protocol
//!
//! Run with: cargo run --release
//! Or: cargo test (for property-based tests)

use job_market::instructions::validation_helpers::select_weighted;
use job_market::state::ProtocolParams;
use job_market_fuzz::*;
use proptest::prelude::*;
use proptest::strategy::ValueTree;
use proptest::test_runner::TestRunner;
use std::collections::BTreeSet;
use std::time::Instant;

fn main() {
    println!("=== Job Market Protocol Fuzz Testing ===\n");

    let start = Instant::now();
    let mut total_tests = 0;
    let mut passed = 0;
    let mut failed = 0;

    println!("Running validator selection fuzz tests...");
    let (p, f) = run_selection_fuzz(500);
    passed += p;
    failed += f;
    total_tests += p + f;

    println!("Running validation round fuzz tests...");
    let (p, f) = run_validation_round_fuzz(100);
    passed += p;
    failed += f;
    total_tests += p + f;

    println!("Running dispute fuzz tests...");
    let (p, f) = run_dispute_fuzz(100);
    passed += p;
    failed += f;
    total_tests += p + f;

    println!("Running market sequence fuzz tests...");
    let (p, f) = run_market_sequence_fuzz(200);
    passed += p;
    failed += f;
    total_tests += p + f;

    println!("Running edge case tests...");
    let (p, f) = run_edge_case_tests();
    passed += p;
    failed += f;
    total_tests += p + f;

    let duration = start.elapsed();

    println!("\n=== Fuzz Testing Complete ===");
    println!("Total tests: {}", total_tests);
    println!("Passed: {}", passed);
    println!("Failed: {}", failed);
    println!("Duration: {:?}", duration);

    if failed > 0 {
        std::process::exit(1);
    }
}

fn run_selection_fuzz(iterations: usize) -> (usize, usize) {
    let mut passed = 0;
    let mut failed = 0;

    let mut runner = TestRunner::default();

    for i in 0..iterations {
        let input = any::<SelectionInput>()
            .new_tree(&mut runner)
            .expect("Failed to generate SelectionInput")
            .current();

        let first = select_weighted(&input.weights, input.count, &input.seed);
        let second = select_weighted(&input.weights, input.count, &input.seed);
        let ok = match (first, second) {
            (Ok(a), Ok(b)) => {
                let unique: BTreeSet<usize> = a.iter().copied().collect();
                a == b && unique.len() == a.len() && a.len() == input.count.min(input.weights.len())
            }
            _ => false,
        };

        if ok {
            passed += 1;
        } else {
            println!("  [FAIL] Iteration {}: {:?}", i, input);
            failed += 1;
        }
    }

    println!("  validator_selection: {} passed, {} failed", passed, failed);
    (passed, failed)
}

fn run_validation_round_fuzz(iterations: usize) -> (usize, usize) {
    let mut passed = 0;
    let mut failed = 0;

    let mut runner = TestRunner::default();

    for i in 0..iterations {
        let input = any::<ValidationRoundInput>()
            .new_tree(&mut runner)
            .expect("Failed to generate ValidationRoundInput")
            .current();

        match simulate_validation_round(&input) {
            Ok(()) => passed += 1,
            Err(violation) => {
                println!("  [FAIL] Iteration {}: {}", i, violation);
                failed += 1;
            }
        }
    }

    println!("  validation_round: {} passed, {} failed", passed, failed);
    (passed, failed)
}

fn simulate_validation_round(input: &ValidationRoundInput) -> Result<(), String> {
    let params = ProtocolParams {
        approval_threshold: input.threshold,
        validator_slash_pct: input.validator_slash_pct,
        slash_recipient_pct: input.slash_recipient_pct,
        max_validators: input.stakes.len() as u8,
        ..Default::default()
    };
    let mut market = market_with_validators(params, &input.stakes).map_err(|e| e.to_string())?;
    let job_id = submitted_job(&mut market, 1_000, 0).map_err(|e| e.to_string())?;
    let seated = market
        .select_validators(job_id, input.slot_hash)
        .map_err(|e| e.to_string())?;

    for (validator, ballot) in seated.iter().zip(&input.ballots) {
        if let Some((approve, _)) = ballot {
            market.vote(job_id, *validator, *approve).map_err(|e| e.to_string())?;
        }
    }
    market.advance(market.config.commit_window);
    for (validator, ballot) in seated.iter().zip(&input.ballots) {
        if let Some((_, true)) = ballot {
            market.reveal_ballot(job_id, *validator).map_err(|e| e.to_string())?;
        }
    }
    market.advance(market.config.reveal_window);
    let success = market.finalize_validation(job_id).map_err(|e| e.to_string())?;

    let round = market.current_round(job_id).map_err(|e| e.to_string())?;
    let result = check_weighted_outcome(round.approvals, round.rejections, input.threshold, success);
    if result != RoundInvariantResult::Valid {
        return Err(format!("{:?}", result));
    }
    market.check_invariants()
}

fn run_dispute_fuzz(iterations: usize) -> (usize, usize) {
    let mut passed = 0;
    let mut failed = 0;

    let mut runner = TestRunner::default();

    for i in 0..iterations {
        let input = any::<DisputeInput>()
            .new_tree(&mut runner)
            .expect("Failed to generate DisputeInput")
            .current();

        match simulate_dispute(&input) {
            Ok(()) => passed += 1,
            Err(violation) => {
                println!("  [FAIL] Iteration {}: {}", i, violation);
                failed += 1;
            }
        }
    }

    println!("  dispute_lifecycle: {} passed, {} failed", passed, failed);
    (passed, failed)
}

fn simulate_dispute(input: &DisputeInput) -> Result<(), String> {
    let n = input.juror_votes.len();
    let params = ProtocolParams {
        appeal_bond: input.appeal_bond,
        ..Default::default()
    };
    let mut market = market_with_validators(params, &vec![10; n]).map_err(|e| e.to_string())?;
    let job_id = submitted_job(&mut market, 100, 50).map_err(|e| e.to_string())?;
    market
        .select_validators(job_id, [4u8; 32])
        .map_err(|e| e.to_string())?;
    let votes: Vec<_> = (0..n).map(|i| (actor(10 + i as u8), !input.agent_appeals)).collect();
    run_round(&mut market, job_id, &votes).map_err(|e| e.to_string())?;

    let appellant = if input.agent_appeals { actor(2) } else { actor(1) };
    market.fund(appellant, input.appeal_bond);
    market.raise_dispute(job_id, appellant).map_err(|e| e.to_string())?;

    let jurors: Vec<_> = market.cases[&job_id].jurors.iter().map(|j| j.juror).collect();
    for (juror, vote) in jurors.iter().zip(&input.juror_votes) {
        if let Some(employer_wins) = vote {
            market
                .juror_vote(job_id, *juror, *employer_wins)
                .map_err(|e| e.to_string())?;
        }
    }
    market.advance(market.config.juror_commit_window);
    let (mut reveals, mut employer_votes) = (0u8, 0u8);
    for (juror, vote) in jurors.iter().zip(&input.juror_votes) {
        if let Some(employer_wins) = vote {
            market
                .reveal_juror_ballot(job_id, *juror)
                .map_err(|e| e.to_string())?;
            reveals += 1;
            employer_votes += *employer_wins as u8;
        }
    }

    let employer_wins = if reveals as usize == n {
        market.finalize_case(job_id)
    } else {
        market.advance(market.config.juror_reveal_window + market.config.case_expiry_grace);
        market.expire_case(job_id)
    }
    .map_err(|e| e.to_string())?;

    if reveals > 0 {
        let result = check_majority_verdict(employer_votes, reveals, employer_wins);
        if result != DisputeInvariantResult::Valid {
            return Err(format!("{:?}", result));
        }
    } else if employer_wins != input.agent_appeals {
        return Err("empty jury ruled for the appellant".to_string());
    }

    market.finalize_job(job_id).map_err(|e| e.to_string())?;
    market.check_invariants()
}

fn run_market_sequence_fuzz(iterations: usize) -> (usize, usize) {
    let mut passed = 0;
    let mut failed = 0;

    let mut runner = TestRunner::default();

    for i in 0..iterations {
        let ops = arb_market_ops(64)
            .new_tree(&mut runner)
            .expect("Failed to generate market operations")
            .current();

        let mut market = match market_with_validators(Default::default(), &[100, 80, 60, 40, 20, 10]) {
            Ok(market) => market,
            Err(e) => {
                println!("  [FAIL] Iteration {}: setup {}", i, e);
                failed += 1;
                continue;
            }
        };
        for n in (1u8..=4).chain(10u8..=15) {
            market.fund(actor(n), 10 * MAX_AMOUNT);
        }

        let violation = ops
            .iter()
            .map(|op| market.step(op))
            .find(|result| result.is_invariant_violation());

        match violation {
            Some(result) => {
                println!("  [FAIL] Iteration {}: {:?}", i, result);
                failed += 1;
            }
            None => passed += 1,
        }
    }

    println!("  market_sequence: {} passed, {} failed", passed, failed);
    (passed, failed)
}

fn run_edge_case_tests() -> (usize, usize) {
    let mut passed = 0;
    let mut failed = 0;

    // Largest stakes the generators produce
    {
        let stakes = [MAX_AMOUNT; 8];
        let input = ValidationRoundInput {
            stakes: stakes.to_vec(),
            ballots: vec![Some((true, true)); 16],
            threshold: 100,
            validator_slash_pct: 100,
            slash_recipient_pct: 100,
            slot_hash: [0xff; 32],
        };
        match simulate_validation_round(&input) {
            Ok(()) => passed += 1,
            Err(violation) => {
                println!("  [FAIL] max stakes: {}", violation);
                failed += 1;
            }
        }
    }

    // Nobody votes: the round fails and every seat is slashed in full
    {
        let input = ValidationRoundInput {
            stakes: vec![1, 1, 1],
            ballots: vec![None; 16],
            threshold: 1,
            validator_slash_pct: 100,
            slash_recipient_pct: 0,
            slot_hash: [0u8; 32],
        };
        match simulate_validation_round(&input) {
            Ok(()) => passed += 1,
            Err(violation) => {
                println!("  [FAIL] silent round: {}", violation);
                failed += 1;
            }
        }
    }

    // Nobody reveals on appeal
    {
        let input = DisputeInput {
            juror_votes: vec![None; 3],
            appeal_bond: 999,
            agent_appeals: true,
        };
        match simulate_dispute(&input) {
            Ok(()) => passed += 1,
            Err(violation) => {
                println!("  [FAIL] silent jury: {}", violation);
                failed += 1;
            }
        }
    }

    println!("  edge_cases: {} passed, {} failed", passed, failed);
    (passed, failed)
}
