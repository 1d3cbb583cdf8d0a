//! Arbitrary input generators for fuzz testing
//!
//! Generates random but well-formed inputs for the market simulation and the
//! selection, tally and settlement helpers.

use crate::scenarios::MarketOp;
use proptest::prelude::*;

/// Upper bound for generated token amounts. Keeps sums of many balances far
/// from `u64::MAX` and float cross-checks exact.
pub const MAX_AMOUNT: u64 = 1_000_000_000_000;

/// Arbitrary 32-byte value (salts, slot hashes, seeds)
pub fn arb_hash() -> impl Strategy<Value = [u8; 32]> {
    prop::array::uniform32(any::<u8>())
}

/// Arbitrary token amount with edge cases
pub fn arb_amount() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(0u64),
        Just(1u64),
        Just(MAX_AMOUNT),
        1u64..1_000u64,
        1_000u64..1_000_000u64,
        1_000_000u64..MAX_AMOUNT,
    ]
}

/// Arbitrary positive validator stake
pub fn arb_stake() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(1u64),
        Just(MAX_AMOUNT),
        1u64..100u64,
        100u64..MAX_AMOUNT,
    ]
}

/// Arbitrary protocol fee in basis points within the allowed range
pub fn arb_fee_bps() -> impl Strategy<Value = u16> {
    prop_oneof![Just(0u16), Just(1000u16), 1u16..1000u16]
}

/// Arbitrary percentage (0-100)
pub fn arb_percent() -> impl Strategy<Value = u8> {
    prop_oneof![Just(0u8), Just(50u8), Just(100u8), 0u8..=100u8]
}

/// Arbitrary approval threshold (1-100)
pub fn arb_threshold() -> impl Strategy<Value = u8> {
    prop_oneof![Just(1u8), Just(50u8), Just(51u8), Just(100u8), 1u8..=100u8]
}

/// Input for weighted committee selection
#[derive(Debug, Clone)]
pub struct SelectionInput {
    pub weights: Vec<u64>,
    pub count: usize,
    pub seed: [u8; 32],
}

impl Arbitrary for SelectionInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (prop::collection::vec(arb_stake(), 1..=32), 1usize..=16, arb_hash())
            .prop_map(|(weights, count, seed)| SelectionInput {
                weights,
                count,
                seed,
            })
            .boxed()
    }
}

/// A ballot: `None` commits nothing, `Some((approve, reveal))` commits
/// `approve` and reveals only when `reveal` is set.
pub type Ballot = Option<(bool, bool)>;

/// Input for one validation round driven end to end
#[derive(Debug, Clone)]
pub struct ValidationRoundInput {
    pub stakes: Vec<u64>,
    pub ballots: Vec<Ballot>,
    pub threshold: u8,
    pub validator_slash_pct: u8,
    pub slash_recipient_pct: u8,
    pub slot_hash: [u8; 32],
}

impl Arbitrary for ValidationRoundInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            prop::collection::vec(arb_stake(), 3..=8),
            prop::collection::vec(proptest::option::of((any::<bool>(), any::<bool>())), 16),
            arb_threshold(),
            arb_percent(),
            arb_percent(),
            arb_hash(),
        )
            .prop_map(
                |(stakes, ballots, threshold, validator_slash_pct, slash_recipient_pct, slot_hash)| {
                    ValidationRoundInput {
                        stakes,
                        ballots,
                        threshold,
                        validator_slash_pct,
                        slash_recipient_pct,
                        slot_hash,
                    }
                },
            )
            .boxed()
    }
}

/// Input for a job lifecycle ending in settlement
#[derive(Debug, Clone)]
pub struct JobSettlementInput {
    pub reward: u64,
    pub stake: u64,
    pub fee_bps: u16,
    pub agent_slash_pct: u8,
    pub slash_recipient_pct: u8,
    pub success: bool,
}

impl Arbitrary for JobSettlementInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            arb_amount(),
            arb_amount(),
            arb_fee_bps(),
            arb_percent(),
            arb_percent(),
            any::<bool>(),
        )
            .prop_map(
                |(reward, stake, fee_bps, agent_slash_pct, slash_recipient_pct, success)| {
                    JobSettlementInput {
                        reward,
                        stake,
                        fee_bps,
                        agent_slash_pct,
                        slash_recipient_pct,
                        success,
                    }
                },
            )
            .boxed()
    }
}

/// Input for an arbitration case: one entry per juror, `None` never reveals
#[derive(Debug, Clone)]
pub struct DisputeInput {
    pub juror_votes: Vec<Option<bool>>,
    pub appeal_bond: u64,
    pub agent_appeals: bool,
}

impl Arbitrary for DisputeInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            prop::collection::vec(proptest::option::of(any::<bool>()), 3..=5),
            0u64..1_000u64,
            any::<bool>(),
        )
            .prop_map(|(juror_votes, appeal_bond, agent_appeals)| DisputeInput {
                juror_votes,
                appeal_bond,
                agent_appeals,
            })
            .boxed()
    }
}

/// Arbitrary market operation. Actors 1-4 act as employers and agents,
/// 10-15 as validators.
pub fn arb_market_op() -> impl Strategy<Value = MarketOp> {
    let job = 0u8..8;
    let seat = 0u8..16;
    prop_oneof![
        (prop_oneof![1u8..=4, 10u8..=15], any::<bool>(), arb_amount())
            .prop_map(|(actor, validator, amount)| MarketOp::Deposit { actor, validator, amount }),
        (prop_oneof![1u8..=4, 10u8..=15], any::<bool>(), arb_amount())
            .prop_map(|(actor, validator, amount)| MarketOp::Withdraw { actor, validator, amount }),
        (1u8..=4, arb_amount(), arb_amount())
            .prop_map(|(employer, reward, stake)| MarketOp::CreateJob { employer, reward, stake }),
        (job.clone(), 1u8..=4).prop_map(|(job, agent)| MarketOp::Apply { job, agent }),
        job.clone().prop_map(|job| MarketOp::Submit { job }),
        job.clone().prop_map(|job| MarketOp::Cancel { job }),
        (job.clone(), any::<u8>()).prop_map(|(job, entropy)| MarketOp::SelectValidators { job, entropy }),
        (job.clone(), seat.clone(), any::<bool>())
            .prop_map(|(job, seat, approve)| MarketOp::Vote { job, seat, approve }),
        (job.clone(), seat.clone()).prop_map(|(job, seat)| MarketOp::Reveal { job, seat }),
        job.clone().prop_map(|job| MarketOp::FinalizeValidation { job }),
        job.clone().prop_map(|job| MarketOp::ResetNonce { job }),
        (job.clone(), any::<bool>()).prop_map(|(job, by_agent)| MarketOp::RaiseDispute { job, by_agent }),
        (job.clone(), seat.clone(), any::<bool>())
            .prop_map(|(job, seat, employer_wins)| MarketOp::JurorVote { job, seat, employer_wins }),
        (job.clone(), seat).prop_map(|(job, seat)| MarketOp::JurorReveal { job, seat }),
        job.clone().prop_map(|job| MarketOp::FinalizeCase { job }),
        job.clone().prop_map(|job| MarketOp::ExpireCase { job }),
        job.prop_map(|job| MarketOp::FinalizeJob { job }),
        prop_oneof![Just(3_600i64), Just(86_400i64), Just(8 * 86_400i64), 0i64..200_000]
            .prop_map(|seconds| MarketOp::Advance { seconds }),
    ]
}

/// Arbitrary sequence of market operations
pub fn arb_market_ops(max_len: usize) -> impl Strategy<Value = Vec<MarketOp>> {
    prop::collection::vec(arb_market_op(), 1..=max_len)
}
