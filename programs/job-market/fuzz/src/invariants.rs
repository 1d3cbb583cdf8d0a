//! Protocol invariant checking for fuzz testing
//!
//! Each check is an independent restatement of a rule the program must keep,
//! so a bug in the program's own arithmetic cannot hide itself.

use job_market::state::{DisputeCase, JobState, ValidationRound};

/// Stake ledger and token accounting invariant results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StakeInvariantResult {
    Valid,
    LockedExceedsStaked { staked: u64, locked: u64 },
    VaultMismatch { vault: u64, liabilities: u64 },
    SupplyChanged { minted: u64, supply: u64 },
}

/// Validation round invariant results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundInvariantResult {
    Valid,
    MultipleOpenRounds { job_id: u64, open: usize },
    OpenFlagMismatch { job_id: u64, open: usize, flag: bool },
    TallyMismatch { approvals: u64, rejections: u64, expected_approvals: u64, expected_rejections: u64 },
    OutcomeMismatch { approvals: u64, rejections: u64, threshold: u8, success: bool },
}

/// Arbitration case invariant results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisputeInvariantResult {
    Valid,
    FinalizedWithoutAllReveals { reveals: u8, jurors: usize },
    RevealCountMismatch { counted: u8, recorded: u8 },
    VerdictMismatch { employer_votes: u8, reveals: u8, employer_wins: bool },
}

/// Job state machine invariant results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobInvariantResult {
    Valid,
    InvalidStateTransition { from: JobState, to: JobState },
    TerminalStateModified { state: JobState },
}

// ============================================================================
// Stake ledger
// ============================================================================

/// `locked <= staked` for every ledger entry
pub fn check_stake_bounds(staked: u64, locked: u64) -> StakeInvariantResult {
    if locked > staked {
        StakeInvariantResult::LockedExceedsStaked { staked, locked }
    } else {
        StakeInvariantResult::Valid
    }
}

/// The vault holds exactly the stakes, escrowed rewards and open bonds
pub fn check_vault_solvency(vault: u64, liabilities: u64) -> StakeInvariantResult {
    if vault != liabilities {
        StakeInvariantResult::VaultMismatch { vault, liabilities }
    } else {
        StakeInvariantResult::Valid
    }
}

/// Tokens only move, they are never created or destroyed
pub fn check_token_conservation(minted: u64, supply: u64) -> StakeInvariantResult {
    if minted != supply {
        StakeInvariantResult::SupplyChanged { minted, supply }
    } else {
        StakeInvariantResult::Valid
    }
}

// ============================================================================
// Validation
// ============================================================================

/// At most one live round per job, and the job's flag agrees with it
pub fn check_single_open_round(job_id: u64, open: usize, round_open: bool) -> RoundInvariantResult {
    if open > 1 {
        return RoundInvariantResult::MultipleOpenRounds { job_id, open };
    }
    if (open == 1) != round_open {
        return RoundInvariantResult::OpenFlagMismatch {
            job_id,
            open,
            flag: round_open,
        };
    }
    RoundInvariantResult::Valid
}

/// Tallies equal the frozen stake of revealed seats on each side
pub fn check_tally_consistency(round: &ValidationRound) -> RoundInvariantResult {
    let (mut expected_approvals, mut expected_rejections) = (0u64, 0u64);
    for seat in round.seats.iter().filter(|s| s.revealed) {
        if seat.approve {
            expected_approvals += seat.stake;
        } else {
            expected_rejections += seat.stake;
        }
    }
    if round.approvals != expected_approvals || round.rejections != expected_rejections {
        return RoundInvariantResult::TallyMismatch {
            approvals: round.approvals,
            rejections: round.rejections,
            expected_approvals,
            expected_rejections,
        };
    }
    RoundInvariantResult::Valid
}

/// Success iff approving weight reaches `threshold` percent of the revealed
/// weight, computed in floating point as a cross-check of the integer rule.
pub fn check_weighted_outcome(
    approvals: u64,
    rejections: u64,
    threshold: u8,
    success: bool,
) -> RoundInvariantResult {
    let total = approvals as f64 + rejections as f64;
    let expected = total > 0.0 && approvals as f64 / total >= threshold as f64 / 100.0;
    // Exact ties are decided by the integer rule; floats may round either way
    let exact_tie = approvals as u128 * 100 == (approvals as u128 + rejections as u128) * threshold as u128;
    if expected != success && !exact_tie {
        return RoundInvariantResult::OutcomeMismatch {
            approvals,
            rejections,
            threshold,
            success,
        };
    }
    if exact_tie && total > 0.0 && !success {
        return RoundInvariantResult::OutcomeMismatch {
            approvals,
            rejections,
            threshold,
            success,
        };
    }
    RoundInvariantResult::Valid
}

// ============================================================================
// Disputes
// ============================================================================

/// A case decided through the reveal path had every juror reveal
pub fn check_unanimous_reveal(case: &DisputeCase) -> DisputeInvariantResult {
    if case.finalized && (case.reveals as usize) < case.jurors.len() {
        return DisputeInvariantResult::FinalizedWithoutAllReveals {
            reveals: case.reveals,
            jurors: case.jurors.len(),
        };
    }
    DisputeInvariantResult::Valid
}

/// Reveal counters match the juror seats
pub fn check_case_counters(case: &DisputeCase) -> DisputeInvariantResult {
    let counted = case.jurors.iter().filter(|j| j.revealed).count() as u8;
    if counted != case.reveals {
        return DisputeInvariantResult::RevealCountMismatch {
            counted,
            recorded: case.reveals,
        };
    }
    DisputeInvariantResult::Valid
}

/// Employer wins only with a strict majority of revealed votes
pub fn check_majority_verdict(employer_votes: u8, reveals: u8, employer_wins: bool) -> DisputeInvariantResult {
    let expected = reveals > 0 && employer_votes as u32 > (reveals as u32).saturating_sub(employer_votes as u32);
    if expected != employer_wins {
        return DisputeInvariantResult::VerdictMismatch {
            employer_votes,
            reveals,
            employer_wins,
        };
    }
    DisputeInvariantResult::Valid
}

// ============================================================================
// Jobs
// ============================================================================

/// Allowed lifecycle edges, restated independently of `JobState`
pub fn check_job_transition(from: JobState, to: JobState) -> JobInvariantResult {
    if matches!(from, JobState::Finalized | JobState::Cancelled) {
        return JobInvariantResult::TerminalStateModified { state: from };
    }
    let allowed = matches!(
        (from, to),
        (JobState::None, JobState::Created)
            | (JobState::Created, JobState::Applied)
            | (JobState::Created, JobState::Cancelled)
            | (JobState::Applied, JobState::Submitted)
            | (JobState::Applied, JobState::Cancelled)
            | (JobState::Submitted, JobState::Completed)
            | (JobState::Submitted, JobState::Cancelled)
            | (JobState::Completed, JobState::Disputed)
            | (JobState::Completed, JobState::Finalized)
            | (JobState::Disputed, JobState::Completed)
    );
    if allowed {
        JobInvariantResult::Valid
    } else {
        JobInvariantResult::InvalidStateTransition { from, to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stake_bounds() {
        assert_eq!(check_stake_bounds(10, 10), StakeInvariantResult::Valid);
        assert!(matches!(
            check_stake_bounds(10, 11),
            StakeInvariantResult::LockedExceedsStaked { .. }
        ));
    }

    #[test]
    fn test_weighted_outcome_cross_check() {
        assert_eq!(check_weighted_outcome(50, 10, 50, true), RoundInvariantResult::Valid);
        assert_eq!(check_weighted_outcome(50, 50, 50, true), RoundInvariantResult::Valid);
        assert!(matches!(
            check_weighted_outcome(50, 50, 50, false),
            RoundInvariantResult::OutcomeMismatch { .. }
        ));
        assert_eq!(check_weighted_outcome(0, 0, 50, false), RoundInvariantResult::Valid);
    }

    #[test]
    fn test_majority_verdict() {
        assert_eq!(check_majority_verdict(2, 3, true), DisputeInvariantResult::Valid);
        assert_eq!(check_majority_verdict(1, 2, false), DisputeInvariantResult::Valid);
        assert_eq!(check_majority_verdict(0, 0, false), DisputeInvariantResult::Valid);
    }

    #[test]
    fn test_terminal_states_are_final() {
        assert!(matches!(
            check_job_transition(JobState::Finalized, JobState::Completed),
            JobInvariantResult::TerminalStateModified { .. }
        ));
        assert_eq!(
            check_job_transition(JobState::Disputed, JobState::Completed),
            JobInvariantResult::Valid
        );
    }
}
