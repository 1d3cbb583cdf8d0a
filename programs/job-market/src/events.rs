//! Events emitted by the job market protocol
//!
//! Every ledger and lifecycle change is emitted so indexers can rebuild
//! balances and job history without reading accounts.

use anchor_lang::prelude::*;

/// Action codes carried by `StakeChanged`
pub mod stake_action {
    pub const DEPOSIT: u8 = 0;
    pub const WITHDRAW: u8 = 1;
    pub const LOCK: u8 = 2;
    pub const UNLOCK: u8 = 3;
    pub const SLASH: u8 = 4;
    pub const RELEASE: u8 = 5;
}

/// Reason codes carried by `ReputationChanged`
pub mod reputation_reason {
    /// Agent finished a job successfully
    pub const JOB_COMPLETED: u8 = 0;
    /// Agent's job failed
    pub const JOB_FAILED: u8 = 1;
    /// Validator revealed with the outcome
    pub const HONEST_VOTE: u8 = 2;
    /// Validator revealed against the outcome or never revealed
    pub const DISHONEST_VOTE: u8 = 3;
    /// Juror never revealed before the case expired
    pub const ABSENT_JUROR: u8 = 4;
}

/// How a dispute case was decided
pub mod resolution_path {
    /// Every juror revealed
    pub const UNANIMOUS_REVEAL: u8 = 0;
    /// Forced after the expiry grace period
    pub const EXPIRED: u8 = 1;
}

#[event]
pub struct ProtocolInitialized {
    pub authority: Pubkey,
    pub treasury: Pubkey,
    pub fee_pool: Pubkey,
    pub stake_mint: Pubkey,
    pub approval_threshold: u8,
    pub protocol_fee_bps: u16,
    pub timestamp: i64,
}

#[event]
pub struct ProtocolConfigUpdated {
    pub protocol_fee_bps: u16,
    pub approval_threshold: u8,
    pub validator_slash_pct: u8,
    pub agent_slash_pct: u8,
    pub slash_recipient_pct: u8,
    pub min_validators: u8,
    pub max_validators: u8,
    pub appeal_bond: u64,
    pub timestamp: i64,
}

#[event]
pub struct ValidatorPoolUpdated {
    pub size: u8,
    pub timestamp: i64,
}

#[event]
pub struct ValidatorAllowlistUpdated {
    pub validator: Pubkey,
    pub allowed: bool,
    pub timestamp: i64,
}

#[event]
pub struct ValidatorIdentityVerified {
    pub validator: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct BlacklistUpdated {
    pub user: Pubkey,
    pub blacklisted: bool,
    pub timestamp: i64,
}

/// Emitted on every stake ledger mutation with before/after amounts
#[event]
pub struct StakeChanged {
    pub owner: Pubkey,
    pub role: u8,
    pub action: u8,
    pub amount: u64,
    pub staked_before: u64,
    pub staked_after: u64,
    pub locked_before: u64,
    pub locked_after: u64,
    pub timestamp: i64,
}

/// Emitted when slashed stake leaves the vault
#[event]
pub struct StakeSlashed {
    pub owner: Pubkey,
    pub role: u8,
    pub amount: u64,
    pub recipient: Pubkey,
    pub to_recipient: u64,
    pub to_treasury: u64,
    pub timestamp: i64,
}

#[event]
pub struct ReputationChanged {
    pub owner: Pubkey,
    pub old_score: u64,
    pub new_score: u64,
    pub reason: u8,
    pub timestamp: i64,
}

#[event]
pub struct JobCreated {
    pub job_id: u64,
    pub employer: Pubkey,
    pub reward: u64,
    pub stake: u64,
    pub fee_bps: u16,
    pub spec_hash: [u8; 32],
    pub timestamp: i64,
}

#[event]
pub struct JobApplied {
    pub job_id: u64,
    pub agent: Pubkey,
    pub stake_locked: u64,
    pub timestamp: i64,
}

#[event]
pub struct JobSubmitted {
    pub job_id: u64,
    pub agent: Pubkey,
    pub result_hash: [u8; 32],
    pub timestamp: i64,
}

#[event]
pub struct ValidatorsSelected {
    pub job_id: u64,
    pub nonce: u64,
    pub validators: Vec<Pubkey>,
    pub commit_deadline: i64,
    pub reveal_deadline: i64,
    pub timestamp: i64,
}

#[event]
pub struct ValidationCommitted {
    pub job_id: u64,
    pub nonce: u64,
    pub validator: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct ValidationRevealed {
    pub job_id: u64,
    pub nonce: u64,
    pub validator: Pubkey,
    pub approve: bool,
    pub weight: u64,
    pub timestamp: i64,
}

#[event]
pub struct ValidationFinalized {
    pub job_id: u64,
    pub nonce: u64,
    pub success: bool,
    pub approvals: u64,
    pub rejections: u64,
    pub slashed_total: u64,
    pub timestamp: i64,
}

#[event]
pub struct JobNonceReset {
    pub job_id: u64,
    pub old_nonce: u64,
    pub new_nonce: u64,
    pub timestamp: i64,
}

#[event]
pub struct DisputeRaised {
    pub job_id: u64,
    pub appellant: Pubkey,
    pub bond: u64,
    pub jurors: u8,
    pub commit_deadline: i64,
    pub reveal_deadline: i64,
    pub timestamp: i64,
}

#[event]
pub struct JurorVoteCommitted {
    pub job_id: u64,
    pub juror: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct JurorVoteRevealed {
    pub job_id: u64,
    pub juror: Pubkey,
    pub employer_wins: bool,
    pub timestamp: i64,
}

#[event]
pub struct DisputeResolved {
    pub job_id: u64,
    pub employer_wins: bool,
    pub path: u8,
    pub reveals: u8,
    pub employer_votes: u8,
    pub bond_recipient: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct JobFinalized {
    pub job_id: u64,
    pub success: bool,
    pub agent_payout: u64,
    pub fee: u64,
    pub employer_refund: u64,
    pub stake_released: u64,
    pub stake_slashed: u64,
    pub timestamp: i64,
}

#[event]
pub struct FeeDeposited {
    pub job_id: u64,
    pub amount: u64,
    pub timestamp: i64,
}

#[event]
pub struct CertificateMinted {
    pub job_id: u64,
    pub owner: Pubkey,
    pub token_id: u64,
    pub metadata_hash: [u8; 32],
    pub timestamp: i64,
}

#[event]
pub struct JobCancelled {
    pub job_id: u64,
    pub refund: u64,
    pub stake_unlocked: u64,
    pub timestamp: i64,
}
