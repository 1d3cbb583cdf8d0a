//! Shared constants for instruction handlers

/// Divisor for basis points calculations (100% = 10000 bps)
pub const BASIS_POINTS_DIVISOR: u64 = 10000;

/// Maximum protocol fee in basis points (10% = 1000 bps)
pub const MAX_PROTOCOL_FEE_BPS: u16 = 1000;

/// Base for percentage calculations (100 = 100%)
pub const PERCENT_BASE: u64 = 100;

/// Maximum valid percentage value
pub const MAX_PERCENT: u8 = 100;

// ============================================================================
// Reputation System Constants
// ============================================================================

/// Reputation points awarded to an agent per successful job
pub const REPUTATION_PER_COMPLETION: u64 = 100;

/// Reputation points lost by an agent when a job fails
pub const REPUTATION_JOB_FAILURE_LOSS: u64 = 300;

/// Reputation points awarded to a validator voting with the outcome
pub const REPUTATION_PER_HONEST_VOTE: u64 = 10;

/// Reputation points lost by a validator voting against the outcome or not revealing
pub const REPUTATION_DISHONEST_VOTE_LOSS: u64 = 50;

/// Reputation points lost by a juror who never revealed
pub const REPUTATION_ABSENT_JUROR_LOSS: u64 = 50;
