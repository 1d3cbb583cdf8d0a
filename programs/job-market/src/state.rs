//! Account state structures for the job market protocol

use crate::errors::JobMarketError;
use crate::instructions::constants::{MAX_PERCENT, MAX_PROTOCOL_FEE_BPS};
use crate::instructions::dispute_helpers::{juror_commitment, majority_employer_wins};
use crate::instructions::validation_helpers::{validation_commitment, weighted_outcome};
use crate::utils::version::{version_status, VersionStatus};
use anchor_lang::prelude::*;

// ============================================================================
// Size Constants
// ============================================================================

/// Size of cryptographic hashes (keccak256, Merkle roots, commitments)
pub const HASH_SIZE: usize = 32;

/// Maximum number of validators seated in one round (and jurors in one case)
pub const MAX_COMMITTEE_SIZE: usize = 16;

/// Maximum number of validators in the static pool
pub const MAX_POOL_SIZE: usize = 32;

/// Current protocol version
pub const CURRENT_PROTOCOL_VERSION: u8 = 1;

/// Minimum protocol version this program can still operate on
pub const MIN_SUPPORTED_VERSION: u8 = 1;

// ============================================================================
// Enums
// ============================================================================

/// Role a stake ledger entry is held under.
/// Each `(owner, role)` pair has its own `StakeAccount`.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Debug, Default, InitSpace)]
#[repr(u8)]
pub enum StakeRole {
    #[default]
    Agent = 0,
    Validator = 1,
    Platform = 2,
}

impl StakeRole {
    pub fn as_seed(&self) -> [u8; 1] {
        [*self as u8]
    }
}

/// Job lifecycle state
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Debug, Default, InitSpace)]
#[repr(u8)]
pub enum JobState {
    #[default]
    None = 0,
    /// Reward escrowed, waiting for an agent
    Created = 1,
    /// Agent assigned and stake locked
    Applied = 2,
    /// Work submitted, validation in flight
    Submitted = 3,
    /// Outcome known, awaiting finalization or dispute
    Completed = 4,
    /// Outcome under arbitration
    Disputed = 5,
    /// Paid out or refunded
    Finalized = 6,
    /// Withdrawn by the employer before submission
    Cancelled = 7,
}

impl JobState {
    /// Strictly forward transitions, except `Disputed -> Completed` once a
    /// case resolves.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
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
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Finalized | JobState::Cancelled)
    }
}

// ============================================================================
// Protocol configuration
// ============================================================================

/// Tunable protocol parameters.
/// Passed to `initialize_protocol` and `update_protocol_config`.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProtocolParams {
    pub protocol_fee_bps: u16,
    pub approval_threshold: u8,
    pub validator_slash_pct: u8,
    pub agent_slash_pct: u8,
    pub slash_recipient_pct: u8,
    pub min_validators: u8,
    pub max_validators: u8,
    pub commit_window: i64,
    pub reveal_window: i64,
    pub juror_commit_window: i64,
    pub juror_reveal_window: i64,
    pub case_expiry_grace: i64,
    pub selection_timeout: i64,
    pub appeal_bond: u64,
    pub reputation_threshold: u64,
    pub reputation_decay_per_period: u64,
    pub reputation_decay_period: i64,
    pub agent_root: [u8; HASH_SIZE],
    pub validator_root: [u8; HASH_SIZE],
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            protocol_fee_bps: 0,
            approval_threshold: ProtocolConfig::DEFAULT_APPROVAL_THRESHOLD,
            validator_slash_pct: ProtocolConfig::DEFAULT_VALIDATOR_SLASH_PCT,
            agent_slash_pct: ProtocolConfig::DEFAULT_AGENT_SLASH_PCT,
            slash_recipient_pct: ProtocolConfig::DEFAULT_SLASH_RECIPIENT_PCT,
            min_validators: ProtocolConfig::DEFAULT_MIN_VALIDATORS,
            max_validators: ProtocolConfig::DEFAULT_MAX_VALIDATORS,
            commit_window: ProtocolConfig::DEFAULT_WINDOW,
            reveal_window: ProtocolConfig::DEFAULT_WINDOW,
            juror_commit_window: ProtocolConfig::DEFAULT_WINDOW,
            juror_reveal_window: ProtocolConfig::DEFAULT_WINDOW,
            case_expiry_grace: ProtocolConfig::DEFAULT_CASE_EXPIRY_GRACE,
            selection_timeout: ProtocolConfig::DEFAULT_SELECTION_TIMEOUT,
            appeal_bond: 0,
            reputation_threshold: 0,
            reputation_decay_per_period: 0,
            reputation_decay_period: 0,
            agent_root: [0u8; HASH_SIZE],
            validator_root: [0u8; HASH_SIZE],
        }
    }
}

impl ProtocolParams {
    /// Validate parameters before they are written to the config account
    pub fn validate(&self) -> Result<()> {
        require!(
            self.protocol_fee_bps <= MAX_PROTOCOL_FEE_BPS,
            JobMarketError::InvalidProtocolFee
        );
        require!(
            self.approval_threshold > 0 && self.approval_threshold <= MAX_PERCENT,
            JobMarketError::InvalidApprovalThreshold
        );
        require!(
            self.validator_slash_pct <= MAX_PERCENT
                && self.agent_slash_pct <= MAX_PERCENT
                && self.slash_recipient_pct <= MAX_PERCENT,
            JobMarketError::InvalidPercentage
        );
        require!(
            self.min_validators > 0
                && self.min_validators <= self.max_validators
                && (self.max_validators as usize) <= MAX_COMMITTEE_SIZE,
            JobMarketError::InvalidCommitteeSize
        );
        require!(
            self.commit_window > 0
                && self.reveal_window > 0
                && self.juror_commit_window > 0
                && self.juror_reveal_window > 0
                && self.selection_timeout > 0,
            JobMarketError::InvalidWindow
        );
        require!(
            self.case_expiry_grace >= 0 && self.reputation_decay_period >= 0,
            JobMarketError::InvalidWindow
        );
        Ok(())
    }
}

/// Protocol configuration account
/// PDA seeds: ["protocol"]
#[account]
#[derive(InitSpace)]
pub struct ProtocolConfig {
    /// Protocol authority (allow-lists, blacklist, nonce resets)
    pub authority: Pubkey,
    /// Token account receiving the treasury share of slashes
    pub treasury: Pubkey,
    /// Token account receiving protocol fees
    pub fee_pool: Pubkey,
    /// Mint of the staking and reward token
    pub stake_mint: Pubkey,
    /// Program vault token account, PDA seeds: ["vault"]
    pub vault: Pubkey,
    /// Protocol fee in basis points, frozen per job at creation
    pub protocol_fee_bps: u16,
    /// Weighted approval required for success (percentage, 1-100)
    pub approval_threshold: u8,
    /// Share of a selected validator's frozen stake at risk in a round
    pub validator_slash_pct: u8,
    /// Share of the job stake slashed from an agent on failure
    pub agent_slash_pct: u8,
    /// Share of every slash paid to the recipient (remainder to treasury)
    pub slash_recipient_pct: u8,
    /// Minimum eligible candidates required to open a round
    pub min_validators: u8,
    /// Maximum validators seated per round
    pub max_validators: u8,
    /// Validator commit window (seconds)
    pub commit_window: i64,
    /// Validator reveal window (seconds)
    pub reveal_window: i64,
    /// Juror commit window (seconds)
    pub juror_commit_window: i64,
    /// Juror reveal window (seconds)
    pub juror_reveal_window: i64,
    /// Time after the juror reveal deadline before a case may be expired
    pub case_expiry_grace: i64,
    /// Time a submitted job may wait for a committee before the employer
    /// can cancel it
    pub selection_timeout: i64,
    /// Bond posted by the appellant when raising a dispute
    pub appeal_bond: u64,
    /// Score below which a subtraction blacklists the address
    pub reputation_threshold: u64,
    /// Points removed per full decay period of inactivity
    pub reputation_decay_per_period: u64,
    /// Decay period in seconds (0 = decay disabled)
    pub reputation_decay_period: i64,
    /// Merkle root of authorized agent identities (zero = open)
    pub agent_root: [u8; HASH_SIZE],
    /// Merkle root of authorized validator identities (zero = open)
    pub validator_root: [u8; HASH_SIZE],
    /// Next job id to assign
    pub next_job_id: u64,
    /// Jobs finalized (success or failure)
    pub completed_jobs: u64,
    /// Total reward paid out to agents
    pub total_value_distributed: u64,
    /// Next certificate token id
    pub next_certificate_id: u64,
    /// Bump seed for PDA
    pub bump: u8,
    /// Bump seed for the vault PDA
    pub vault_bump: u8,
    /// Multisig threshold
    pub multisig_threshold: u8,
    /// Length of configured multisig owners
    pub multisig_owners_len: u8,
    /// Current protocol version
    pub protocol_version: u8,
    /// Minimum supported version
    pub min_supported_version: u8,
    /// Multisig owners. Only the first `multisig_owners_len` entries are valid.
    pub multisig_owners: [Pubkey; ProtocolConfig::MAX_MULTISIG_OWNERS],
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        let mut config = Self {
            authority: Pubkey::default(),
            treasury: Pubkey::default(),
            fee_pool: Pubkey::default(),
            stake_mint: Pubkey::default(),
            vault: Pubkey::default(),
            protocol_fee_bps: 0,
            approval_threshold: 0,
            validator_slash_pct: 0,
            agent_slash_pct: 0,
            slash_recipient_pct: 0,
            min_validators: 0,
            max_validators: 0,
            commit_window: 0,
            reveal_window: 0,
            juror_commit_window: 0,
            juror_reveal_window: 0,
            case_expiry_grace: 0,
            selection_timeout: 0,
            appeal_bond: 0,
            reputation_threshold: 0,
            reputation_decay_per_period: 0,
            reputation_decay_period: 0,
            agent_root: [0u8; HASH_SIZE],
            validator_root: [0u8; HASH_SIZE],
            next_job_id: 0,
            completed_jobs: 0,
            total_value_distributed: 0,
            next_certificate_id: 0,
            bump: 0,
            vault_bump: 0,
            multisig_threshold: 0,
            multisig_owners_len: 0,
            protocol_version: CURRENT_PROTOCOL_VERSION,
            min_supported_version: MIN_SUPPORTED_VERSION,
            multisig_owners: [Pubkey::default(); ProtocolConfig::MAX_MULTISIG_OWNERS],
        };
        config.apply_params(&ProtocolParams::default());
        config
    }
}

impl ProtocolConfig {
    pub const MAX_MULTISIG_OWNERS: usize = 5;
    pub const DEFAULT_APPROVAL_THRESHOLD: u8 = 50;
    pub const DEFAULT_VALIDATOR_SLASH_PCT: u8 = 25;
    pub const DEFAULT_AGENT_SLASH_PCT: u8 = 100;
    pub const DEFAULT_SLASH_RECIPIENT_PCT: u8 = 50;
    pub const DEFAULT_MIN_VALIDATORS: u8 = 3;
    pub const DEFAULT_MAX_VALIDATORS: u8 = 5;
    pub const DEFAULT_WINDOW: i64 = 24 * 60 * 60; // 1 day
    pub const DEFAULT_CASE_EXPIRY_GRACE: i64 = 7 * 24 * 60 * 60; // 7 days
    pub const DEFAULT_SELECTION_TIMEOUT: i64 = 3 * 24 * 60 * 60; // 3 days

    pub const SIZE: usize = 8 + // discriminator
        32 + // authority
        32 + // treasury
        32 + // fee_pool
        32 + // stake_mint
        32 + // vault
        2 +  // protocol_fee_bps
        1 +  // approval_threshold
        1 +  // validator_slash_pct
        1 +  // agent_slash_pct
        1 +  // slash_recipient_pct
        1 +  // min_validators
        1 +  // max_validators
        8 +  // commit_window
        8 +  // reveal_window
        8 +  // juror_commit_window
        8 +  // juror_reveal_window
        8 +  // case_expiry_grace
        8 +  // selection_timeout
        8 +  // appeal_bond
        8 +  // reputation_threshold
        8 +  // reputation_decay_per_period
        8 +  // reputation_decay_period
        HASH_SIZE + // agent_root
        HASH_SIZE + // validator_root
        8 +  // next_job_id
        8 +  // completed_jobs
        8 +  // total_value_distributed
        8 +  // next_certificate_id
        1 +  // bump
        1 +  // vault_bump
        1 +  // multisig_threshold
        1 +  // multisig_owners_len
        1 +  // protocol_version
        1 +  // min_supported_version
        (32 * Self::MAX_MULTISIG_OWNERS); // multisig owners

    pub fn apply_params(&mut self, params: &ProtocolParams) {
        self.protocol_fee_bps = params.protocol_fee_bps;
        self.approval_threshold = params.approval_threshold;
        self.validator_slash_pct = params.validator_slash_pct;
        self.agent_slash_pct = params.agent_slash_pct;
        self.slash_recipient_pct = params.slash_recipient_pct;
        self.min_validators = params.min_validators;
        self.max_validators = params.max_validators;
        self.commit_window = params.commit_window;
        self.reveal_window = params.reveal_window;
        self.juror_commit_window = params.juror_commit_window;
        self.juror_reveal_window = params.juror_reveal_window;
        self.case_expiry_grace = params.case_expiry_grace;
        self.selection_timeout = params.selection_timeout;
        self.appeal_bond = params.appeal_bond;
        self.reputation_threshold = params.reputation_threshold;
        self.reputation_decay_per_period = params.reputation_decay_per_period;
        self.reputation_decay_period = params.reputation_decay_period;
        self.agent_root = params.agent_root;
        self.validator_root = params.validator_root;
    }

    pub fn params(&self) -> ProtocolParams {
        ProtocolParams {
            protocol_fee_bps: self.protocol_fee_bps,
            approval_threshold: self.approval_threshold,
            validator_slash_pct: self.validator_slash_pct,
            agent_slash_pct: self.agent_slash_pct,
            slash_recipient_pct: self.slash_recipient_pct,
            min_validators: self.min_validators,
            max_validators: self.max_validators,
            commit_window: self.commit_window,
            reveal_window: self.reveal_window,
            juror_commit_window: self.juror_commit_window,
            juror_reveal_window: self.juror_reveal_window,
            case_expiry_grace: self.case_expiry_grace,
            selection_timeout: self.selection_timeout,
            appeal_bond: self.appeal_bond,
            reputation_threshold: self.reputation_threshold,
            reputation_decay_per_period: self.reputation_decay_per_period,
            reputation_decay_period: self.reputation_decay_period,
            agent_root: self.agent_root,
            validator_root: self.validator_root,
        }
    }

    pub fn reputation_policy(&self) -> ReputationPolicy {
        ReputationPolicy {
            threshold: self.reputation_threshold,
            decay_per_period: self.reputation_decay_per_period,
            decay_period: self.reputation_decay_period,
        }
    }

    /// Check if the protocol version is compatible
    pub fn is_version_compatible(&self) -> bool {
        version_status(self.protocol_version, self.min_supported_version) == VersionStatus::Compatible
    }
}

// ============================================================================
// Stake ledger
// ============================================================================

/// Before/after view of a ledger mutation, carried by `StakeChanged`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StakeDelta {
    pub staked_before: u64,
    pub staked_after: u64,
    pub locked_before: u64,
    pub locked_after: u64,
}

/// Stake ledger entry for one `(owner, role)` pair.
/// PDA seeds: ["stake", owner, role]
///
/// Tokens backing `staked` sit in the protocol vault. `locked` is the part
/// reserved for an open job or validation round and can only leave the
/// ledger through `unlock`, `slash` or `release`.
#[account]
#[derive(Default, InitSpace)]
pub struct StakeAccount {
    pub owner: Pubkey,
    pub role: StakeRole,
    /// Total staked amount
    pub staked: u64,
    /// Amount reserved, always `<= staked`
    pub locked: u64,
    pub bump: u8,
}

impl StakeAccount {
    pub const SIZE: usize = 8 + // discriminator
        32 + // owner
        1 +  // role
        8 +  // staked
        8 +  // locked
        1; // bump

    /// Stake that can be withdrawn or locked
    pub fn available(&self) -> u64 {
        self.staked.saturating_sub(self.locked)
    }

    fn delta(&self, staked_before: u64, locked_before: u64) -> StakeDelta {
        StakeDelta {
            staked_before,
            staked_after: self.staked,
            locked_before,
            locked_after: self.locked,
        }
    }

    pub fn deposit(&mut self, amount: u64) -> Result<StakeDelta> {
        require!(amount > 0, JobMarketError::InvalidStakeAmount);
        let (staked, locked) = (self.staked, self.locked);
        self.staked = self
            .staked
            .checked_add(amount)
            .ok_or(JobMarketError::ArithmeticOverflow)?;
        Ok(self.delta(staked, locked))
    }

    pub fn withdraw(&mut self, amount: u64) -> Result<StakeDelta> {
        require!(amount > 0, JobMarketError::InvalidStakeAmount);
        require!(self.available() >= amount, JobMarketError::InsufficientStake);
        let (staked, locked) = (self.staked, self.locked);
        self.staked = self
            .staked
            .checked_sub(amount)
            .ok_or(JobMarketError::ArithmeticOverflow)?;
        Ok(self.delta(staked, locked))
    }

    pub fn lock(&mut self, amount: u64) -> Result<StakeDelta> {
        require!(self.available() >= amount, JobMarketError::InsufficientStake);
        let (staked, locked) = (self.staked, self.locked);
        self.locked = self
            .locked
            .checked_add(amount)
            .ok_or(JobMarketError::ArithmeticOverflow)?;
        Ok(self.delta(staked, locked))
    }

    pub fn unlock(&mut self, amount: u64) -> Result<StakeDelta> {
        require!(self.locked >= amount, JobMarketError::InsufficientLockedStake);
        let (staked, locked) = (self.staked, self.locked);
        self.locked -= amount;
        Ok(self.delta(staked, locked))
    }

    /// Remove `amount` of locked stake from the ledger. The caller moves the
    /// matching tokens out of the vault to the slash recipients.
    pub fn slash(&mut self, amount: u64) -> Result<StakeDelta> {
        self.consume_locked(amount)
    }

    /// Remove `amount` of locked stake from the ledger. The caller pays the
    /// matching tokens back to the owner.
    pub fn release(&mut self, amount: u64) -> Result<StakeDelta> {
        self.consume_locked(amount)
    }

    fn consume_locked(&mut self, amount: u64) -> Result<StakeDelta> {
        require!(self.locked >= amount, JobMarketError::InsufficientLockedStake);
        let (staked, locked) = (self.staked, self.locked);
        self.locked -= amount;
        // locked <= staked, so this cannot underflow once the check above holds
        self.staked = self
            .staked
            .checked_sub(amount)
            .ok_or(JobMarketError::ArithmeticOverflow)?;
        Ok(self.delta(staked, locked))
    }
}

// ============================================================================
// Reputation
// ============================================================================

/// Threshold and decay settings applied on every reputation update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReputationPolicy {
    pub threshold: u64,
    pub decay_per_period: u64,
    pub decay_period: i64,
}

/// Per-address reputation record
/// PDA seeds: ["reputation", owner]
#[account]
#[derive(Default, InitSpace)]
pub struct ReputationRecord {
    pub owner: Pubkey,
    pub score: u64,
    /// Set automatically when a penalty drops `score` below the threshold,
    /// or by the protocol authority
    pub blacklisted: bool,
    /// Timestamp of the last score update (decay reference point)
    pub last_updated: i64,
    pub bump: u8,
}

impl ReputationRecord {
    pub const SIZE: usize = 8 + // discriminator
        32 + // owner
        8 +  // score
        1 +  // blacklisted
        8 +  // last_updated
        1; // bump

    /// Apply lazily accumulated decay: one `decay_per_period` per full period
    /// elapsed since `last_updated`. Partial periods carry over.
    pub fn apply_decay(&mut self, policy: &ReputationPolicy, now: i64) {
        if now <= self.last_updated {
            return;
        }
        if policy.decay_period > 0 && policy.decay_per_period > 0 {
            let periods = (now - self.last_updated) / policy.decay_period;
            let decay = policy.decay_per_period.saturating_mul(periods as u64);
            self.score = self.score.saturating_sub(decay);
            self.last_updated = self
                .last_updated
                .saturating_add(periods.saturating_mul(policy.decay_period));
        } else {
            self.last_updated = now;
        }
    }

    /// Returns `(old_score, new_score)`
    pub fn add(&mut self, amount: u64, policy: &ReputationPolicy, now: i64) -> (u64, u64) {
        let old = self.score;
        self.apply_decay(policy, now);
        self.score = self.score.saturating_add(amount);
        (old, self.score)
    }

    /// Returns `(old_score, new_score)`. Blacklists when the new score is
    /// below the configured threshold.
    pub fn subtract(&mut self, amount: u64, policy: &ReputationPolicy, now: i64) -> (u64, u64) {
        let old = self.score;
        self.apply_decay(policy, now);
        self.score = self.score.saturating_sub(amount);
        if self.score < policy.threshold {
            self.blacklisted = true;
        }
        (old, self.score)
    }
}

// ============================================================================
// Jobs
// ============================================================================

/// Job account
/// PDA seeds: ["job", job_id.to_le_bytes()]
#[account]
#[derive(Default, InitSpace)]
pub struct Job {
    /// Monotonically increasing id
    pub job_id: u64,
    pub employer: Pubkey,
    /// Assigned agent (default until `apply_for_job`)
    pub agent: Pubkey,
    /// Reward escrowed in the vault
    pub reward: u64,
    /// Agent stake locked on application
    pub stake: u64,
    /// Protocol fee frozen at creation
    pub fee_bps: u16,
    pub state: JobState,
    /// Outcome from validation or dispute resolution
    pub success: bool,
    /// Hash of the off-chain job description
    pub spec_hash: [u8; HASH_SIZE],
    /// Hash of the submitted result
    pub result_hash: [u8; HASH_SIZE],
    /// Current validation round nonce, part of every commitment
    pub validation_nonce: u64,
    /// A round for `validation_nonce` has been opened and not yet closed
    pub round_open: bool,
    /// Disputes are allowed once per job
    pub dispute_raised: bool,
    pub created_at: i64,
    pub updated_at: i64,
    /// Set while a payout or refund is being executed
    pub in_progress: bool,
    pub bump: u8,
}

impl Job {
    pub const SIZE: usize = 8 + // discriminator
        8 +  // job_id
        32 + // employer
        32 + // agent
        8 +  // reward
        8 +  // stake
        2 +  // fee_bps
        1 +  // state
        1 +  // success
        HASH_SIZE + // spec_hash
        HASH_SIZE + // result_hash
        8 +  // validation_nonce
        1 +  // round_open
        1 +  // dispute_raised
        8 +  // created_at
        8 +  // updated_at
        1 +  // in_progress
        1; // bump

    pub fn transition(&mut self, next: JobState, now: i64) -> Result<()> {
        require!(
            self.state.can_transition_to(next),
            JobMarketError::InvalidStateTransition
        );
        self.state = next;
        self.updated_at = now;
        Ok(())
    }

    /// Employer cancellation is open before submission, and for a submitted
    /// job once `selection_timeout` has passed without a committee seated.
    /// The timer restarts on submission and on every nonce reset.
    pub fn check_cancellable(&self, now: i64, selection_timeout: i64) -> Result<()> {
        match self.state {
            JobState::Created | JobState::Applied => Ok(()),
            JobState::Submitted if !self.round_open => {
                let deadline = self
                    .updated_at
                    .checked_add(selection_timeout)
                    .ok_or(JobMarketError::ArithmeticOverflow)?;
                require!(now >= deadline, JobMarketError::SelectionTimeoutNotElapsed);
                Ok(())
            }
            _ => err!(JobMarketError::InvalidJobState),
        }
    }

    /// Record the validation outcome: `Submitted -> Completed`
    pub fn finalize_after_validation(&mut self, success: bool, now: i64) -> Result<()> {
        require!(
            self.state == JobState::Submitted,
            JobMarketError::InvalidJobState
        );
        self.success = success;
        self.round_open = false;
        self.transition(JobState::Completed, now)
    }

    /// Apply an arbitration verdict: `Disputed -> Completed`
    pub fn resolve_dispute(&mut self, employer_wins: bool, now: i64) -> Result<()> {
        require!(
            self.state == JobState::Disputed,
            JobMarketError::InvalidJobState
        );
        self.success = !employer_wins;
        self.transition(JobState::Completed, now)
    }

    pub fn enter_critical(&mut self) -> Result<()> {
        require!(!self.in_progress, JobMarketError::ReentrantCall);
        self.in_progress = true;
        Ok(())
    }

    pub fn exit_critical(&mut self) {
        self.in_progress = false;
    }
}

/// Record minted for the agent of a successfully finalized job
/// PDA seeds: ["certificate", job]
#[account]
#[derive(Default, InitSpace)]
pub struct Certificate {
    pub job: Pubkey,
    pub job_id: u64,
    pub owner: Pubkey,
    /// Hash of the certified result
    pub metadata_hash: [u8; HASH_SIZE],
    pub token_id: u64,
    pub minted_at: i64,
    pub bump: u8,
}

impl Certificate {
    pub const SIZE: usize = 8 + // discriminator
        32 + // job
        8 +  // job_id
        32 + // owner
        HASH_SIZE + // metadata_hash
        8 +  // token_id
        8 +  // minted_at
        1; // bump
}

// ============================================================================
// Validation
// ============================================================================

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq, InitSpace)]
pub struct PoolEntry {
    pub validator: Pubkey,
    /// Explicit allow-list bypassing identity verification
    pub allowlisted: bool,
    /// Set by `verify_validator_identity` after a valid Merkle proof
    pub identity_verified: bool,
}

impl PoolEntry {
    pub const SIZE: usize = 32 + 1 + 1;
}

/// Static validator pool maintained by governance
/// PDA seeds: ["validator_pool"]
#[account]
#[derive(Default, InitSpace)]
pub struct ValidatorPool {
    #[max_len(32)]
    pub entries: Vec<PoolEntry>,
    pub bump: u8,
}

impl ValidatorPool {
    pub const SIZE: usize = 8 + // discriminator
        4 + (PoolEntry::SIZE * MAX_POOL_SIZE) + // entries
        1; // bump

    pub fn entry(&self, validator: &Pubkey) -> Option<&PoolEntry> {
        self.entries.iter().find(|e| e.validator == *validator)
    }

    pub fn entry_mut(&mut self, validator: &Pubkey) -> Option<&mut PoolEntry> {
        self.entries.iter_mut().find(|e| e.validator == *validator)
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq, InitSpace)]
pub struct ValidatorSeat {
    pub validator: Pubkey,
    /// Voting weight, frozen at selection
    pub stake: u64,
    /// Amount locked on the validator's stake for this round
    pub locked: u64,
    pub commitment: [u8; HASH_SIZE],
    pub committed: bool,
    pub revealed: bool,
    pub approve: bool,
}

impl ValidatorSeat {
    pub const SIZE: usize = 32 + 8 + 8 + HASH_SIZE + 1 + 1 + 1;
}

/// Commit-reveal validation round
/// PDA seeds: ["round", job, nonce.to_le_bytes()]
#[account]
#[derive(Default, InitSpace)]
pub struct ValidationRound {
    pub job: Pubkey,
    pub job_id: u64,
    pub nonce: u64,
    #[max_len(16)]
    pub seats: Vec<ValidatorSeat>,
    pub commit_deadline: i64,
    pub reveal_deadline: i64,
    /// Frozen stake of validators that revealed approve
    pub approvals: u64,
    /// Frozen stake of validators that revealed reject
    pub rejections: u64,
    pub tallied: bool,
    pub success: bool,
    /// Round invalidated by `reset_job_nonce`
    pub voided: bool,
    pub bump: u8,
}

impl ValidationRound {
    pub const SIZE: usize = 8 + // discriminator
        32 + // job
        8 +  // job_id
        8 +  // nonce
        4 + (ValidatorSeat::SIZE * MAX_COMMITTEE_SIZE) + // seats
        8 +  // commit_deadline
        8 +  // reveal_deadline
        8 +  // approvals
        8 +  // rejections
        1 +  // tallied
        1 +  // success
        1 +  // voided
        1; // bump

    pub fn seat_index(&self, validator: &Pubkey) -> Option<usize> {
        self.seats.iter().position(|s| s.validator == *validator)
    }

    fn require_active(&self) -> Result<()> {
        require!(!self.voided, JobMarketError::RoundVoided);
        require!(!self.tallied, JobMarketError::AlreadyTallied);
        Ok(())
    }

    pub fn commit(&mut self, validator: &Pubkey, commitment: [u8; HASH_SIZE], now: i64) -> Result<()> {
        self.require_active()?;
        require!(now < self.commit_deadline, JobMarketError::CommitWindowClosed);
        let index = self
            .seat_index(validator)
            .ok_or(JobMarketError::NotSelectedValidator)?;
        let seat = &mut self.seats[index];
        require!(!seat.committed, JobMarketError::AlreadyCommitted);
        seat.commitment = commitment;
        seat.committed = true;
        Ok(())
    }

    /// Returns the frozen weight added to the tally.
    pub fn reveal(
        &mut self,
        validator: &Pubkey,
        approve: bool,
        salt: &[u8; HASH_SIZE],
        now: i64,
    ) -> Result<u64> {
        self.require_active()?;
        require!(now >= self.commit_deadline, JobMarketError::RevealWindowNotOpen);
        require!(now < self.reveal_deadline, JobMarketError::RevealWindowClosed);
        let index = self
            .seat_index(validator)
            .ok_or(JobMarketError::NotSelectedValidator)?;
        let expected = validation_commitment(self.job_id, self.nonce, validator, approve, salt);

        let seat = &mut self.seats[index];
        require!(seat.committed, JobMarketError::NotCommitted);
        require!(!seat.revealed, JobMarketError::AlreadyRevealed);
        require!(expected == seat.commitment, JobMarketError::InvalidReveal);
        seat.revealed = true;
        seat.approve = approve;
        let weight = seat.stake;

        if approve {
            self.approvals = self
                .approvals
                .checked_add(weight)
                .ok_or(JobMarketError::ArithmeticOverflow)?;
        } else {
            self.rejections = self
                .rejections
                .checked_add(weight)
                .ok_or(JobMarketError::ArithmeticOverflow)?;
        }
        Ok(weight)
    }

    /// Close the round and compute the weighted outcome
    pub fn tally(&mut self, approval_threshold: u8, now: i64) -> Result<bool> {
        self.require_active()?;
        require!(now >= self.reveal_deadline, JobMarketError::RevealWindowStillOpen);
        let success = weighted_outcome(self.approvals, self.rejections, approval_threshold);
        self.tallied = true;
        self.success = success;
        Ok(success)
    }
}

// ============================================================================
// Disputes
// ============================================================================

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq, InitSpace)]
pub struct JurorSeat {
    pub juror: Pubkey,
    pub commitment: [u8; HASH_SIZE],
    pub committed: bool,
    pub revealed: bool,
    pub employer_wins: bool,
}

impl JurorSeat {
    pub const SIZE: usize = 32 + HASH_SIZE + 1 + 1 + 1;
}

/// Arbitration case for a disputed job
/// PDA seeds: ["case", job]
///
/// Jurors are the validators of the job's latest round. The account is
/// closed once the case is decided.
#[account]
#[derive(Default, InitSpace)]
pub struct DisputeCase {
    pub job: Pubkey,
    pub job_id: u64,
    pub appellant: Pubkey,
    pub appellant_is_agent: bool,
    pub evidence_hash: [u8; HASH_SIZE],
    /// Appeal bond held in the vault
    pub bond: u64,
    #[max_len(16)]
    pub jurors: Vec<JurorSeat>,
    pub commit_deadline: i64,
    pub reveal_deadline: i64,
    pub reveals: u8,
    pub employer_votes: u8,
    pub finalized: bool,
    pub opened_at: i64,
    pub bump: u8,
}

impl DisputeCase {
    pub const SIZE: usize = 8 + // discriminator
        32 + // job
        8 +  // job_id
        32 + // appellant
        1 +  // appellant_is_agent
        HASH_SIZE + // evidence_hash
        8 +  // bond
        4 + (JurorSeat::SIZE * MAX_COMMITTEE_SIZE) + // jurors
        8 +  // commit_deadline
        8 +  // reveal_deadline
        1 +  // reveals
        1 +  // employer_votes
        1 +  // finalized
        8 +  // opened_at
        1; // bump

    pub fn juror_index(&self, juror: &Pubkey) -> Option<usize> {
        self.jurors.iter().position(|j| j.juror == *juror)
    }

    pub fn all_revealed(&self) -> bool {
        self.reveals as usize == self.jurors.len()
    }

    pub fn commit(&mut self, juror: &Pubkey, commitment: [u8; HASH_SIZE], now: i64) -> Result<()> {
        require!(!self.finalized, JobMarketError::CaseAlreadyFinalized);
        require!(now < self.commit_deadline, JobMarketError::CommitWindowClosed);
        let index = self.juror_index(juror).ok_or(JobMarketError::NotJuror)?;
        let seat = &mut self.jurors[index];
        require!(!seat.committed, JobMarketError::AlreadyCommitted);
        seat.commitment = commitment;
        seat.committed = true;
        Ok(())
    }

    pub fn reveal(
        &mut self,
        juror: &Pubkey,
        employer_wins: bool,
        salt: &[u8; HASH_SIZE],
        now: i64,
    ) -> Result<()> {
        require!(!self.finalized, JobMarketError::CaseAlreadyFinalized);
        require!(now >= self.commit_deadline, JobMarketError::RevealWindowNotOpen);
        require!(now < self.reveal_deadline, JobMarketError::RevealWindowClosed);
        let index = self.juror_index(juror).ok_or(JobMarketError::NotJuror)?;
        let expected = juror_commitment(self.job_id, juror, employer_wins, salt);

        let seat = &mut self.jurors[index];
        require!(seat.committed, JobMarketError::NotCommitted);
        require!(!seat.revealed, JobMarketError::AlreadyRevealed);
        require!(expected == seat.commitment, JobMarketError::InvalidReveal);
        seat.revealed = true;
        seat.employer_wins = employer_wins;

        self.reveals = self
            .reveals
            .checked_add(1)
            .ok_or(JobMarketError::ArithmeticOverflow)?;
        if employer_wins {
            self.employer_votes = self
                .employer_votes
                .checked_add(1)
                .ok_or(JobMarketError::ArithmeticOverflow)?;
        }
        Ok(())
    }

    /// Verdict once every juror has revealed. Returns `employer_wins`.
    pub fn decide(&mut self) -> Result<bool> {
        require!(!self.finalized, JobMarketError::CaseAlreadyFinalized);
        require!(self.all_revealed(), JobMarketError::JurorsNotRevealed);
        self.finalized = true;
        Ok(majority_employer_wins(self.employer_votes, self.reveals))
    }

    /// Fallback verdict after `reveal_deadline + grace` when some juror never
    /// revealed. Majority of revealed votes decides; with no reveals the
    /// appellant loses. Returns `employer_wins`.
    pub fn decide_expired(&mut self, grace: i64, now: i64) -> Result<bool> {
        require!(!self.finalized, JobMarketError::CaseAlreadyFinalized);
        require!(!self.all_revealed(), JobMarketError::AllJurorsRevealed);
        let expires_at = self
            .reveal_deadline
            .checked_add(grace)
            .ok_or(JobMarketError::ArithmeticOverflow)?;
        require!(now >= expires_at, JobMarketError::CaseNotExpired);
        self.finalized = true;
        if self.reveals == 0 {
            return Ok(self.appellant_is_agent);
        }
        Ok(majority_employer_wins(self.employer_votes, self.reveals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_size_constant {
        ($struct:ty) => {
            assert_eq!(
                <$struct>::SIZE,
                <$struct as anchor_lang::Space>::INIT_SPACE + 8,
                concat!(stringify!($struct), "::SIZE mismatch with INIT_SPACE")
            );
        };
    }

    #[test]
    fn test_account_sizes() {
        test_size_constant!(ProtocolConfig);
        test_size_constant!(StakeAccount);
        test_size_constant!(ReputationRecord);
        test_size_constant!(Job);
        test_size_constant!(Certificate);
        test_size_constant!(ValidatorPool);
        test_size_constant!(ValidationRound);
        test_size_constant!(DisputeCase);
    }

    #[test]
    fn test_default_params_are_valid() {
        assert!(ProtocolParams::default().validate().is_ok());
        let config = ProtocolConfig::default();
        assert_eq!(config.approval_threshold, 50);
        assert_eq!(config.params(), ProtocolParams::default());
    }

    #[test]
    fn test_params_rejects_bad_committee_bounds() {
        let mut params = ProtocolParams::default();
        params.max_validators = 17;
        assert!(params.validate().is_err());
        params.max_validators = 2;
        params.min_validators = 3;
        assert!(params.validate().is_err());
        params.min_validators = 0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_params_rejects_bad_percentages() {
        let mut params = ProtocolParams::default();
        params.approval_threshold = 0;
        assert!(params.validate().is_err());
        params.approval_threshold = 101;
        assert!(params.validate().is_err());

        let mut params = ProtocolParams::default();
        params.slash_recipient_pct = 101;
        assert!(params.validate().is_err());

        let mut params = ProtocolParams::default();
        params.protocol_fee_bps = MAX_PROTOCOL_FEE_BPS + 1;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_job_state_transitions() {
        use JobState::*;
        assert!(None.can_transition_to(Created));
        assert!(Created.can_transition_to(Applied));
        assert!(Created.can_transition_to(Cancelled));
        assert!(Applied.can_transition_to(Cancelled));
        assert!(Applied.can_transition_to(Submitted));
        assert!(Submitted.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Disputed));
        assert!(Disputed.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Finalized));
        assert!(Submitted.can_transition_to(Cancelled));

        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Finalized.can_transition_to(Completed));
        assert!(!Cancelled.can_transition_to(Created));
        assert!(!Applied.can_transition_to(Completed));
        assert!(!Disputed.can_transition_to(Finalized));
        assert!(Finalized.is_terminal());
        assert!(Cancelled.is_terminal());
    }

    #[test]
    fn test_submitted_job_cancellable_after_selection_timeout() {
        let mut job = Job {
            state: JobState::Submitted,
            updated_at: 1_000,
            ..Default::default()
        };
        assert!(job.check_cancellable(1_099, 100).is_err());
        assert!(job.check_cancellable(1_100, 100).is_ok());

        // A seated committee keeps the job out of reach
        job.round_open = true;
        assert!(job.check_cancellable(i64::MAX, 100).is_err());

        job.round_open = false;
        job.state = JobState::Completed;
        assert!(job.check_cancellable(i64::MAX, 100).is_err());
        job.state = JobState::Applied;
        assert!(job.check_cancellable(0, 100).is_ok());
    }

    #[test]
    fn test_stake_lock_and_withdraw_respect_available() {
        let mut stake = StakeAccount::default();
        stake.deposit(100).unwrap();
        stake.lock(60).unwrap();
        assert_eq!(stake.available(), 40);
        assert!(stake.withdraw(41).is_err());
        assert!(stake.lock(41).is_err());

        let delta = stake.withdraw(40).unwrap();
        assert_eq!(delta.staked_before, 100);
        assert_eq!(delta.staked_after, 60);
        assert_eq!(delta.locked_after, 60);
        assert!(stake.locked <= stake.staked);
    }

    #[test]
    fn test_stake_slash_requires_locked() {
        let mut stake = StakeAccount::default();
        stake.deposit(50).unwrap();
        stake.lock(10).unwrap();
        assert!(stake.slash(11).is_err());

        let delta = stake.slash(10).unwrap();
        assert_eq!(delta.locked_before, 10);
        assert_eq!(delta.locked_after, 0);
        assert_eq!(stake.staked, 40);
    }

    #[test]
    fn test_stake_release_and_unlock() {
        let mut stake = StakeAccount::default();
        stake.deposit(80).unwrap();
        stake.lock(50).unwrap();
        stake.release(30).unwrap();
        assert_eq!((stake.staked, stake.locked), (50, 20));
        stake.unlock(20).unwrap();
        assert_eq!((stake.staked, stake.locked), (50, 0));
        assert!(stake.unlock(1).is_err());
    }

    #[test]
    fn test_zero_deposit_rejected() {
        let mut stake = StakeAccount::default();
        assert!(stake.deposit(0).is_err());
        assert!(stake.withdraw(0).is_err());
    }

    #[test]
    fn test_reputation_blacklists_below_threshold() {
        let policy = ReputationPolicy {
            threshold: 50,
            ..Default::default()
        };
        let mut rep = ReputationRecord::default();
        rep.add(100, &policy, 0);
        assert!(!rep.blacklisted);

        let (old, new) = rep.subtract(40, &policy, 0);
        assert_eq!((old, new), (100, 60));
        assert!(!rep.blacklisted);

        rep.subtract(20, &policy, 0);
        assert!(rep.blacklisted);

        // Only the authority clears the flag
        rep.add(1000, &policy, 0);
        assert!(rep.blacklisted);
    }

    #[test]
    fn test_reputation_saturates_at_zero() {
        let policy = ReputationPolicy::default();
        let mut rep = ReputationRecord::default();
        rep.add(5, &policy, 0);
        rep.subtract(50, &policy, 0);
        assert_eq!(rep.score, 0);
        assert!(!rep.blacklisted);
    }

    #[test]
    fn test_reputation_decay_is_lazy() {
        let policy = ReputationPolicy {
            threshold: 0,
            decay_per_period: 10,
            decay_period: 100,
        };
        let mut rep = ReputationRecord::default();
        rep.add(100, &policy, 1_000);
        assert_eq!(rep.score, 100);

        // 2.5 periods later: two full periods of decay before the update
        let (old, new) = rep.add(0, &policy, 1_250);
        assert_eq!(old, 100);
        assert_eq!(new, 80);
        assert_eq!(rep.last_updated, 1_200);

        // The leftover half period counts toward the next one
        let (_, new) = rep.add(0, &policy, 1_300);
        assert_eq!(new, 70);
    }

    fn open_round(stakes: &[u64]) -> ValidationRound {
        ValidationRound {
            job_id: 7,
            nonce: 0,
            seats: stakes
                .iter()
                .enumerate()
                .map(|(i, stake)| ValidatorSeat {
                    validator: Pubkey::new_from_array([i as u8 + 1; 32]),
                    stake: *stake,
                    ..Default::default()
                })
                .collect(),
            commit_deadline: 100,
            reveal_deadline: 200,
            ..Default::default()
        }
    }

    #[test]
    fn test_round_commit_reveal_tally() {
        let mut round = open_round(&[30, 20, 10]);
        let votes = [true, true, false];
        let salt = [9u8; 32];
        for (seat, vote) in round.seats.clone().iter().zip(votes) {
            let c = validation_commitment(7, 0, &seat.validator, vote, &salt);
            round.commit(&seat.validator, c, 50).unwrap();
        }
        for (seat, vote) in round.seats.clone().iter().zip(votes) {
            round.reveal(&seat.validator, vote, &salt, 150).unwrap();
        }
        assert_eq!((round.approvals, round.rejections), (50, 10));
        assert!(round.tally(50, 199).is_err());
        assert!(round.tally(50, 200).unwrap());
        assert!(round.tally(50, 201).is_err());
    }

    #[test]
    fn test_round_windows() {
        let mut round = open_round(&[10]);
        let v = round.seats[0].validator;
        let salt = [1u8; 32];
        let c = validation_commitment(7, 0, &v, true, &salt);
        assert!(round.commit(&v, c, 100).is_err());
        round.commit(&v, c, 99).unwrap();
        assert!(round.commit(&v, c, 99).is_err());
        assert!(round.reveal(&v, true, &salt, 99).is_err());
        assert!(round.reveal(&v, true, &salt, 200).is_err());
        assert!(round.reveal(&v, false, &salt, 150).is_err());
        round.reveal(&v, true, &salt, 150).unwrap();
        assert!(round.reveal(&v, true, &salt, 151).is_err());
    }

    #[test]
    fn test_round_rejects_outsider() {
        let mut round = open_round(&[10]);
        let outsider = Pubkey::new_from_array([200u8; 32]);
        assert!(round.commit(&outsider, [0u8; 32], 0).is_err());
    }

    #[test]
    fn test_zero_reveals_fail_the_job() {
        let mut round = open_round(&[10, 10, 10]);
        assert!(!round.tally(50, 300).unwrap());
    }

    fn open_case(jurors: u8) -> DisputeCase {
        DisputeCase {
            job_id: 3,
            appellant_is_agent: true,
            jurors: (0..jurors)
                .map(|i| JurorSeat {
                    juror: Pubkey::new_from_array([i + 1; 32]),
                    ..Default::default()
                })
                .collect(),
            commit_deadline: 100,
            reveal_deadline: 200,
            ..Default::default()
        }
    }

    #[test]
    fn test_case_requires_unanimous_reveal() {
        let mut case = open_case(3);
        let salt = [4u8; 32];
        let jurors: Vec<Pubkey> = case.jurors.iter().map(|j| j.juror).collect();
        for juror in &jurors {
            let c = juror_commitment(3, juror, false, &salt);
            case.commit(juror, c, 10).unwrap();
        }
        case.reveal(&jurors[0], false, &salt, 150).unwrap();
        case.reveal(&jurors[1], false, &salt, 150).unwrap();
        // Majority already reached but one juror outstanding
        assert!(case.decide().is_err());
        case.reveal(&jurors[2], false, &salt, 150).unwrap();
        assert!(!case.decide().unwrap());
        assert!(case.decide().is_err());
    }

    #[test]
    fn test_case_expiry_fallback() {
        let mut case = open_case(3);
        assert!(case.decide_expired(50, 249).is_err());
        // Nobody revealed: the appellant (agent) loses
        assert!(case.decide_expired(50, 250).unwrap());
    }
}
