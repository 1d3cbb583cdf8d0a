#![allow(unexpected_cfgs)]
//! Job Market Protocol
//!
//! An escrowed marketplace where employers post jobs, staked agents do the
//! work and a stake-weighted validator committee judges the result through
//! commit-reveal voting. Either party may appeal a verdict once; the same
//! committee then re-votes as jurors and their majority is final.

use anchor_lang::prelude::*;

declare_id!("FJvnx53kMUHrqY5VWnq3CxtjtDiTmm1UjtgDtvNj5BsX");

pub mod errors;
pub mod events;
pub mod instructions;
pub mod state;
pub mod utils;

use instructions::*;
use state::{ProtocolParams, StakeRole};

#[program]
pub mod job_market {
    use super::*;

    /// Initialize the protocol configuration, the token vault and the
    /// (empty) validator pool. Called once.
    ///
    /// # Arguments
    /// * `ctx` - Context with config, vault, pool and token accounts
    /// * `params` - Economic and timing parameters (see `ProtocolParams`)
    /// * `multisig_threshold` - Signatures required for governance updates
    /// * `multisig_owners` - Governance signers (at most 5)
    pub fn initialize_protocol(
        ctx: Context<InitializeProtocol>,
        params: ProtocolParams,
        multisig_threshold: u8,
        multisig_owners: Vec<Pubkey>,
    ) -> Result<()> {
        instructions::initialize_protocol::handler(ctx, params, multisig_threshold, multisig_owners)
    }

    /// Replace the protocol parameters. Requires multisig approval.
    pub fn update_protocol_config(
        ctx: Context<UpdateProtocolConfig>,
        params: ProtocolParams,
    ) -> Result<()> {
        instructions::update_protocol_config::handler(ctx, params)
    }

    /// Replace the validator pool. Existing members keep their allowlist and
    /// identity marks. Requires multisig approval.
    pub fn set_validator_pool(ctx: Context<SetValidatorPool>, validators: Vec<Pubkey>) -> Result<()> {
        instructions::set_validator_pool::handler(ctx, validators)
    }

    /// Allowlist or de-list a pool member for identity-gated selection.
    pub fn set_validator_allowlist(
        ctx: Context<SetValidatorAllowlist>,
        validator: Pubkey,
        allowed: bool,
    ) -> Result<()> {
        instructions::set_validator_allowlist::handler(ctx, validator, allowed)
    }

    /// Prove membership in the validator identity tree and mark the caller's
    /// pool entry as verified.
    pub fn verify_validator_identity(
        ctx: Context<VerifyValidatorIdentity>,
        label: [u8; 32],
        proof: Vec<[u8; 32]>,
    ) -> Result<()> {
        instructions::verify_validator_identity::handler(ctx, label, proof)
    }

    /// Set or clear a user's blacklist flag.
    pub fn set_blacklist(ctx: Context<SetBlacklist>, user: Pubkey, blacklisted: bool) -> Result<()> {
        instructions::set_blacklist::handler(ctx, user, blacklisted)
    }

    /// Deposit tokens as stake for the given role.
    pub fn deposit_stake(ctx: Context<DepositStake>, role: StakeRole, amount: u64) -> Result<()> {
        instructions::deposit_stake::handler(ctx, role, amount)
    }

    /// Withdraw unlocked stake for the given role.
    pub fn withdraw_stake(ctx: Context<WithdrawStake>, role: StakeRole, amount: u64) -> Result<()> {
        instructions::withdraw_stake::handler(ctx, role, amount)
    }

    /// Post a job and escrow its reward.
    ///
    /// # Arguments
    /// * `reward` - Tokens paid to the agent on success
    /// * `stake` - Agent stake locked on application
    /// * `spec_hash` - Hash of the off-chain job description
    pub fn create_job(
        ctx: Context<CreateJob>,
        reward: u64,
        stake: u64,
        spec_hash: [u8; 32],
    ) -> Result<()> {
        instructions::create_job::handler(ctx, reward, stake, spec_hash)
    }

    /// Take an open job. Locks the job stake on the agent's stake account.
    /// `label` and `proof` authenticate the agent when an agent identity
    /// root is configured.
    pub fn apply_for_job(
        ctx: Context<ApplyForJob>,
        label: [u8; 32],
        proof: Vec<[u8; 32]>,
    ) -> Result<()> {
        instructions::apply_for_job::handler(ctx, label, proof)
    }

    /// Submit the result of an applied job.
    pub fn submit_job(ctx: Context<SubmitJob>, result_hash: [u8; 32]) -> Result<()> {
        instructions::submit_job::handler(ctx, result_hash)
    }

    /// Cancel a job and refund the employer. A submitted job qualifies only
    /// after `selection_timeout` passes with no committee seated.
    pub fn cancel_job(ctx: Context<CancelJob>) -> Result<()> {
        instructions::cancel_job::handler(ctx)
    }

    /// Draw the validator committee for a submitted job.
    /// Remaining accounts: `(stake, reputation)` per pool member.
    pub fn select_validators<'info>(
        ctx: Context<'_, '_, 'info, 'info, SelectValidators<'info>>,
    ) -> Result<()> {
        instructions::select_validators::handler(ctx)
    }

    /// Commit `keccak("validation", job_id, nonce, validator, approve, salt)`.
    pub fn commit_validation(ctx: Context<CommitValidation>, commitment: [u8; 32]) -> Result<()> {
        instructions::commit_validation::handler(ctx, commitment)
    }

    /// Reveal a committed validation vote.
    pub fn reveal_validation(
        ctx: Context<RevealValidation>,
        approve: bool,
        salt: [u8; 32],
    ) -> Result<()> {
        instructions::reveal_validation::handler(ctx, approve, salt)
    }

    /// Tally the round after the reveal window, slashing and penalizing
    /// validators that did not vote with the outcome.
    /// Remaining accounts: `(stake, reputation)` per seat.
    pub fn finalize_validation<'info>(
        ctx: Context<'_, '_, 'info, 'info, FinalizeValidation<'info>>,
    ) -> Result<()> {
        instructions::finalize_validation::handler(ctx)
    }

    /// Void the open round and advance the job's nonce.
    /// Remaining accounts: stake account per seat.
    pub fn reset_job_nonce<'info>(
        ctx: Context<'_, '_, 'info, 'info, ResetJobNonce<'info>>,
    ) -> Result<()> {
        instructions::reset_job_nonce::handler(ctx)
    }

    /// Appeal the validation outcome, escrowing the appeal bond.
    pub fn raise_dispute(ctx: Context<RaiseDispute>, evidence_hash: [u8; 32]) -> Result<()> {
        instructions::raise_dispute::handler(ctx, evidence_hash)
    }

    /// Commit `keccak("dispute", job_id, juror, employer_wins, salt)`.
    pub fn commit_juror_vote(ctx: Context<CommitJurorVote>, commitment: [u8; 32]) -> Result<()> {
        instructions::commit_juror_vote::handler(ctx, commitment)
    }

    /// Reveal a committed juror vote.
    pub fn reveal_juror_vote(
        ctx: Context<RevealJurorVote>,
        employer_wins: bool,
        salt: [u8; 32],
    ) -> Result<()> {
        instructions::reveal_juror_vote::handler(ctx, employer_wins, salt)
    }

    /// Decide a case once every juror has revealed.
    pub fn finalize_case(ctx: Context<FinalizeCase>) -> Result<()> {
        instructions::finalize_case::handler(ctx)
    }

    /// Decide a case whose jurors missed the reveal window plus grace.
    /// Remaining accounts: reputation record per juror.
    pub fn expire_case<'info>(ctx: Context<'_, '_, 'info, 'info, ExpireCase<'info>>) -> Result<()> {
        instructions::expire_case::handler(ctx)
    }

    /// Pay out or refund a completed job.
    pub fn finalize_job(ctx: Context<FinalizeJob>) -> Result<()> {
        instructions::finalize_job::handler(ctx)
    }
}
