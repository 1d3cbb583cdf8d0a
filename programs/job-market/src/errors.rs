//! Error codes for the job market protocol

use anchor_lang::prelude::*;

#[error_code]
pub enum JobMarketError {
    // Stake errors (6000-6099)
    #[msg("Available stake (staked minus locked) is insufficient")]
    InsufficientStake,

    #[msg("Locked stake is insufficient for this operation")]
    InsufficientLockedStake,

    #[msg("Stake amount must be greater than zero")]
    InvalidStakeAmount,

    #[msg("Stake account does not belong to the expected owner or role")]
    StakeAccountMismatch,

    #[msg("Invalid stake role")]
    InvalidRole,

    // Job errors (6100-6199)
    #[msg("Job is not in the required state for this operation")]
    InvalidJobState,

    #[msg("Invalid job state transition")]
    InvalidStateTransition,

    #[msg("Job reward must be greater than zero")]
    InvalidReward,

    #[msg("Only the job employer can perform this action")]
    NotEmployer,

    #[msg("Only the assigned agent can perform this action")]
    NotAssignedAgent,

    #[msg("Employer cannot apply for their own job")]
    EmployerCannotApply,

    #[msg("Job has already been finalized")]
    JobAlreadyFinalized,

    #[msg("Job operation already in progress")]
    ReentrantCall,

    #[msg("Certificate account is required for a successful job")]
    CertificateAccountMissing,

    #[msg("Certificate account must not be supplied for a failed job")]
    CertificateNotExpected,

    #[msg("Submitted job is still within its validator selection timeout")]
    SelectionTimeoutNotElapsed,

    // Validation errors (6200-6299)
    #[msg("Not enough eligible validators in the pool")]
    InsufficientValidators,

    #[msg("Total candidate stake weight is zero")]
    ZeroTotalWeight,

    #[msg("Validators have already been selected for this round")]
    ValidatorsAlreadySelected,

    #[msg("No validation round is open for this job")]
    RoundNotOpen,

    #[msg("Caller is not a selected validator for this round")]
    NotSelectedValidator,

    #[msg("Commit window has closed")]
    CommitWindowClosed,

    #[msg("Reveal window has not opened yet")]
    RevealWindowNotOpen,

    #[msg("Reveal window has closed")]
    RevealWindowClosed,

    #[msg("Reveal window has not closed yet")]
    RevealWindowStillOpen,

    #[msg("Commitment already submitted")]
    AlreadyCommitted,

    #[msg("No commitment on record")]
    NotCommitted,

    #[msg("Vote already revealed")]
    AlreadyRevealed,

    #[msg("Revealed vote does not match the stored commitment")]
    InvalidReveal,

    #[msg("Validation round has already been tallied")]
    AlreadyTallied,

    #[msg("Validation round was voided by a nonce reset")]
    RoundVoided,

    #[msg("Validator pool is full or contains duplicates")]
    InvalidValidatorPool,

    #[msg("Validator is not a member of the pool")]
    ValidatorNotInPool,

    #[msg("Invalid committee size bounds")]
    InvalidCommitteeSize,

    #[msg("Window duration must be positive")]
    InvalidWindow,

    // Dispute errors (6300-6399)
    #[msg("Job outcome cannot be disputed by this caller")]
    NotDisputable,

    #[msg("A dispute has already been raised for this job")]
    DisputeAlreadyRaised,

    #[msg("Caller is not a seated juror")]
    NotJuror,

    #[msg("Not all jurors have revealed")]
    JurorsNotRevealed,

    #[msg("Every juror has revealed; use case finalization instead")]
    AllJurorsRevealed,

    #[msg("Case has not expired yet")]
    CaseNotExpired,

    #[msg("Case has already been finalized")]
    CaseAlreadyFinalized,

    #[msg("Dispute case does not belong to this job")]
    CaseJobMismatch,

    // Reputation and identity errors (6400-6499)
    #[msg("Address is blacklisted")]
    Blacklisted,

    #[msg("Identity verification failed")]
    UnauthorizedIdentity,

    #[msg("Reputation record does not belong to the expected owner")]
    ReputationAccountMismatch,

    // Protocol errors (6500-6599)
    #[msg("Invalid protocol fee (must be <= 1000 bps)")]
    InvalidProtocolFee,

    #[msg("Invalid percentage (must be <= 100)")]
    InvalidPercentage,

    #[msg("Invalid approval threshold (must be 1-100)")]
    InvalidApprovalThreshold,

    #[msg("Unauthorized: signer is not the protocol authority")]
    UnauthorizedAuthority,

    #[msg("Token account does not match the configured account")]
    TokenAccountMismatch,

    #[msg("Token transfer failed")]
    TokenTransferFailed,

    #[msg("Multisig threshold must be non-zero and not exceed owners")]
    MultisigInvalidThreshold,

    #[msg("Multisig owners must be unique and non-empty")]
    MultisigInvalidSigners,

    #[msg("Not enough multisig signers")]
    MultisigNotEnoughSigners,

    #[msg("Multisig owners must be unique")]
    MultisigDuplicateSigner,

    #[msg("Multisig owner cannot be the default pubkey")]
    MultisigDefaultSigner,

    #[msg("Account version is too old, migration required")]
    AccountVersionTooOld,

    #[msg("Account version is too new, program upgrade required")]
    AccountVersionTooNew,

    #[msg("Protocol config version is inconsistent")]
    VersionMismatchProtocol,

    // General errors (6600-6699)
    #[msg("Invalid input parameter")]
    InvalidInput,

    #[msg("Arithmetic overflow")]
    ArithmeticOverflow,

    #[msg("Invalid account owner")]
    InvalidAccountOwner,

    #[msg("Remaining accounts do not match the expected layout")]
    InvalidRemainingAccounts,

    #[msg("Slot hashes sysvar is unavailable or malformed")]
    RandomnessUnavailable,
}
