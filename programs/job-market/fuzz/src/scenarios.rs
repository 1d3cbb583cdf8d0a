//! In-memory market that replays instruction logic on the program's own state
//! types, enabling fast property-based testing without the Solana runtime.
//!
//! Each operation runs atomically: a failed operation leaves the market
//! exactly as it was, the way a failed transaction does on chain. Token
//! movements are tracked as plain balances (wallets, vault, treasury and fee
//! pool) so conservation can be checked after every step.

use crate::invariants::*;
use anchor_lang::prelude::*;
use job_market::errors::JobMarketError;
use job_market::instructions::dispute_helpers::juror_commitment;
use job_market::instructions::ledger_helpers::{settle_agent_stake, settle_validator_seat};
use job_market::instructions::set_validator_pool::rebuild_pool;
use job_market::instructions::settlement_helpers::{
    check_certificate_slot, plan_job_settlement, split_slash, JobSettlement,
};
use job_market::instructions::validation_helpers::{
    draw_committee, eligible_candidates, validation_commitment, Candidate,
};
use job_market::state::{
    Certificate, DisputeCase, Job, JobState, JurorSeat, PoolEntry, ProtocolConfig,
    ProtocolParams, ReputationRecord, StakeAccount, StakeRole, ValidationRound,
    HASH_SIZE,
};
use job_market::utils::randomness::selection_seed;
use std::collections::BTreeMap;

/// Clock value every simulated market starts at
pub const START_TIME: i64 = 1_700_000_000;

/// Result of a simulated instruction execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationResult {
    Success,
    Error(String),
    InvariantViolation(String),
}

impl SimulationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SimulationResult::Success)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SimulationResult::Error(_))
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, SimulationResult::InvariantViolation(_))
    }

    pub fn is_error_code(&self, code: JobMarketError) -> bool {
        matches!(self, SimulationResult::Error(name) if *name == code.name())
    }
}

/// Map an instruction result to a `SimulationResult`, keeping the error name.
pub fn outcome<T>(result: Result<T>) -> SimulationResult {
    match result {
        Ok(_) => SimulationResult::Success,
        Err(anchor_lang::error::Error::AnchorError(e)) => SimulationResult::Error(e.error_name.clone()),
        Err(e) => SimulationResult::Error(e.to_string()),
    }
}

/// Deterministic test identity
pub fn actor(n: u8) -> Pubkey {
    Pubkey::new_from_array([n; 32])
}

/// Deterministic vote salt for a voter in a given round
pub fn salt_for(voter: &Pubkey, nonce: u64) -> [u8; HASH_SIZE] {
    let mut salt = voter.to_bytes();
    for (byte, n) in salt.iter_mut().zip(nonce.to_le_bytes()) {
        *byte ^= n ^ 0x5a;
    }
    salt
}

#[derive(Clone)]
pub struct SimulatedMarket {
    pub config: ProtocolConfig,
    pub pool: Vec<PoolEntry>,
    pub stakes: BTreeMap<(Pubkey, u8), StakeAccount>,
    pub reputations: BTreeMap<Pubkey, ReputationRecord>,
    pub wallets: BTreeMap<Pubkey, u64>,
    pub vault: u64,
    pub treasury: u64,
    pub fee_pool: u64,
    pub jobs: BTreeMap<u64, Job>,
    pub rounds: BTreeMap<(u64, u64), ValidationRound>,
    pub cases: BTreeMap<u64, DisputeCase>,
    pub certificates: BTreeMap<u64, Certificate>,
    /// Cleartext ballots kept off-chain by voters, keyed by (job, nonce, voter)
    pub ballots: BTreeMap<(u64, u64, Pubkey), bool>,
    /// Cleartext juror ballots, keyed by (job, juror)
    pub juror_ballots: BTreeMap<(u64, Pubkey), bool>,
    /// Tokens created through `fund`
    pub minted: u64,
    pub now: i64,
}

impl SimulatedMarket {
    pub fn new(params: ProtocolParams) -> Result<Self> {
        params.validate()?;
        let mut config = ProtocolConfig::default();
        config.apply_params(&params);
        Ok(Self {
            config,
            pool: Vec::new(),
            stakes: BTreeMap::new(),
            reputations: BTreeMap::new(),
            wallets: BTreeMap::new(),
            vault: 0,
            treasury: 0,
            fee_pool: 0,
            jobs: BTreeMap::new(),
            rounds: BTreeMap::new(),
            cases: BTreeMap::new(),
            certificates: BTreeMap::new(),
            ballots: BTreeMap::new(),
            juror_ballots: BTreeMap::new(),
            minted: 0,
            now: START_TIME,
        })
    }

    /// Run `f` as one transaction: on error every change is rolled back.
    pub fn atomically<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let snapshot = self.clone();
        let result = f(self);
        if result.is_err() {
            *self = snapshot;
        }
        result
    }

    pub fn advance(&mut self, seconds: i64) {
        self.now = self.now.saturating_add(seconds.max(0));
    }

    pub fn fund(&mut self, owner: Pubkey, amount: u64) {
        *self.wallets.entry(owner).or_default() += amount;
        self.minted += amount;
    }

    pub fn balance(&self, owner: &Pubkey) -> u64 {
        self.wallets.get(owner).copied().unwrap_or_default()
    }

    pub fn set_pool(&mut self, validators: &[Pubkey]) -> Result<()> {
        self.pool = rebuild_pool(&self.pool, validators)?;
        Ok(())
    }

    pub fn set_blacklist(&mut self, user: Pubkey, blacklisted: bool) {
        let now = self.now;
        self.reputation_mut(user, now).blacklisted = blacklisted;
    }

    pub fn job(&self, job_id: u64) -> Result<&Job> {
        self.jobs.get(&job_id).ok_or_else(|| JobMarketError::InvalidJobState.into())
    }

    pub fn current_round(&self, job_id: u64) -> Result<&ValidationRound> {
        let nonce = self.job(job_id)?.validation_nonce;
        self.rounds
            .get(&(job_id, nonce))
            .ok_or_else(|| JobMarketError::RoundNotOpen.into())
    }

    pub fn stake(&self, owner: &Pubkey, role: StakeRole) -> Option<&StakeAccount> {
        self.stakes.get(&(*owner, role as u8))
    }

    fn reputation_mut(&mut self, owner: Pubkey, now: i64) -> &mut ReputationRecord {
        self.reputations.entry(owner).or_insert_with(|| ReputationRecord {
            owner,
            last_updated: now,
            ..Default::default()
        })
    }

    fn take(&mut self, owner: &Pubkey, amount: u64) -> Result<()> {
        let balance = self.wallets.entry(*owner).or_default();
        require!(*balance >= amount, JobMarketError::TokenTransferFailed);
        *balance -= amount;
        self.vault += amount;
        Ok(())
    }

    fn pay(&mut self, to: &Pubkey, amount: u64) -> Result<()> {
        require!(self.vault >= amount, JobMarketError::TokenTransferFailed);
        self.vault -= amount;
        *self.wallets.entry(*to).or_default() += amount;
        Ok(())
    }

    fn pay_treasury(&mut self, amount: u64) -> Result<()> {
        require!(self.vault >= amount, JobMarketError::TokenTransferFailed);
        self.vault -= amount;
        self.treasury += amount;
        Ok(())
    }

    fn pay_fee_pool(&mut self, amount: u64) -> Result<()> {
        require!(self.vault >= amount, JobMarketError::TokenTransferFailed);
        self.vault -= amount;
        self.fee_pool += amount;
        Ok(())
    }

    fn job_mut(&mut self, job_id: u64) -> Result<&mut Job> {
        self.jobs
            .get_mut(&job_id)
            .ok_or_else(|| JobMarketError::InvalidJobState.into())
    }

    // ------------------------------------------------------------------
    // Stake manager
    // ------------------------------------------------------------------

    pub fn deposit_stake(&mut self, owner: Pubkey, role: StakeRole, amount: u64) -> Result<()> {
        self.atomically(|m| {
            let now = m.now;
            m.reputation_mut(owner, now);
            let stake = m.stakes.entry((owner, role as u8)).or_insert_with(|| StakeAccount {
                owner,
                role,
                ..Default::default()
            });
            stake.deposit(amount)?;
            m.take(&owner, amount)
        })
    }

    pub fn withdraw_stake(&mut self, owner: Pubkey, role: StakeRole, amount: u64) -> Result<()> {
        self.atomically(|m| {
            m.stakes
                .get_mut(&(owner, role as u8))
                .ok_or(JobMarketError::StakeAccountMismatch)?
                .withdraw(amount)?;
            m.pay(&owner, amount)
        })
    }

    // ------------------------------------------------------------------
    // Job registry
    // ------------------------------------------------------------------

    pub fn create_job(&mut self, employer: Pubkey, reward: u64, stake: u64) -> Result<u64> {
        self.atomically(|m| {
            require!(reward > 0, JobMarketError::InvalidReward);
            let job_id = m.config.next_job_id;
            m.config.next_job_id += 1;
            let mut job = Job {
                job_id,
                employer,
                reward,
                stake,
                fee_bps: m.config.protocol_fee_bps,
                created_at: m.now,
                ..Default::default()
            };
            job.transition(JobState::Created, m.now)?;
            m.take(&employer, reward)?;
            m.jobs.insert(job_id, job);
            Ok(job_id)
        })
    }

    pub fn apply_for_job(&mut self, job_id: u64, agent: Pubkey) -> Result<()> {
        self.atomically(|m| {
            let now = m.now;
            let (employer, state, stake) = {
                let job = m.job(job_id)?;
                (job.employer, job.state, job.stake)
            };
            require!(state == JobState::Created, JobMarketError::InvalidJobState);
            require!(agent != employer, JobMarketError::EmployerCannotApply);
            require!(
                !m.reputation_mut(agent, now).blacklisted,
                JobMarketError::Blacklisted
            );
            if stake > 0 {
                m.stakes
                    .get_mut(&(agent, StakeRole::Agent as u8))
                    .ok_or(JobMarketError::InsufficientStake)?
                    .lock(stake)?;
            }
            let job = m.job_mut(job_id)?;
            job.agent = agent;
            job.transition(JobState::Applied, now)
        })
    }

    pub fn submit_job(&mut self, job_id: u64, agent: Pubkey, result_hash: [u8; HASH_SIZE]) -> Result<()> {
        self.atomically(|m| {
            let now = m.now;
            let job = m.job_mut(job_id)?;
            require!(job.agent == agent, JobMarketError::NotAssignedAgent);
            require!(job.state == JobState::Applied, JobMarketError::InvalidJobState);
            job.result_hash = result_hash;
            job.transition(JobState::Submitted, now)
        })
    }

    pub fn cancel_job(&mut self, job_id: u64, employer: Pubkey) -> Result<()> {
        self.atomically(|m| {
            let now = m.now;
            let selection_timeout = m.config.selection_timeout;
            let job = m.job_mut(job_id)?;
            require!(job.employer == employer, JobMarketError::NotEmployer);
            job.check_cancellable(now, selection_timeout)?;
            let assigned = job.state != JobState::Created;
            let (agent, stake, reward) = (job.agent, job.stake, job.reward);
            job.transition(JobState::Cancelled, now)?;
            if assigned && stake > 0 {
                m.stakes
                    .get_mut(&(agent, StakeRole::Agent as u8))
                    .ok_or(JobMarketError::StakeAccountMismatch)?
                    .unlock(stake)?;
            }
            m.pay(&employer, reward)
        })
    }

    pub fn finalize_job(&mut self, job_id: u64) -> Result<JobSettlement> {
        self.atomically(|m| {
            let now = m.now;
            let job = m.job(job_id)?.clone();
            require!(job.state != JobState::Finalized, JobMarketError::JobAlreadyFinalized);
            require!(job.state == JobState::Completed, JobMarketError::InvalidJobState);
            // The simulated caller always supplies the certificate on success
            check_certificate_slot(job.success, job.success)?;

            let plan = plan_job_settlement(
                job.reward,
                job.stake,
                job.fee_bps,
                job.success,
                m.config.agent_slash_pct,
            )?;
            m.job_mut(job_id)?.transition(JobState::Finalized, now)?;

            settle_agent_stake(
                m.stakes.get_mut(&(job.agent, StakeRole::Agent as u8)),
                job.stake,
                job.success,
                &plan,
                now,
            )?;

            let policy = m.config.reputation_policy();
            if job.success {
                m.reputation_mut(job.agent, now).add(
                    job_market::instructions::constants::REPUTATION_PER_COMPLETION,
                    &policy,
                    now,
                );
                let token_id = m.config.next_certificate_id;
                m.config.next_certificate_id += 1;
                m.certificates.insert(
                    job_id,
                    Certificate {
                        job_id,
                        owner: job.agent,
                        metadata_hash: job.result_hash,
                        token_id,
                        minted_at: now,
                        ..Default::default()
                    },
                );
                m.config.completed_jobs += 1;
                m.config.total_value_distributed += plan.agent_payout;
                m.pay(&job.agent, plan.agent_payout + plan.stake_released)?;
                m.pay_fee_pool(plan.fee)?;
            } else {
                m.reputation_mut(job.agent, now).subtract(
                    job_market::instructions::constants::REPUTATION_JOB_FAILURE_LOSS,
                    &policy,
                    now,
                );
                m.pay(&job.employer, plan.employer_refund)?;
                let split = split_slash(plan.stake_slashed, m.config.slash_recipient_pct)?;
                m.pay(&job.employer, split.to_recipient)?;
                m.pay_treasury(split.to_treasury)?;
            }
            Ok(plan)
        })
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    pub fn select_validators(&mut self, job_id: u64, slot_hash: [u8; HASH_SIZE]) -> Result<Vec<Pubkey>> {
        self.atomically(|m| {
            let now = m.now;
            let job = m.job(job_id)?.clone();
            require!(job.state == JobState::Submitted, JobMarketError::InvalidJobState);
            require!(!job.round_open, JobMarketError::ValidatorsAlreadySelected);

            let identity_required = m.config.validator_root != [0u8; HASH_SIZE];
            let candidates = eligible_candidates(
                &m.pool,
                identity_required,
                &[job.employer, job.agent],
                |_, entry| {
                    Ok(Candidate {
                        available: m
                            .stake(&entry.validator, StakeRole::Validator)
                            .map(|s| s.available())
                            .unwrap_or_default(),
                        blacklisted: m
                            .reputations
                            .get(&entry.validator)
                            .map(|r| r.blacklisted)
                            .unwrap_or_default(),
                    })
                },
            )?;

            let seed = selection_seed(&slot_hash, job_id, job.validation_nonce);
            let committee = draw_committee(
                &m.pool,
                &candidates,
                m.config.min_validators,
                m.config.max_validators,
                m.config.validator_slash_pct,
                &seed,
            )?;

            let mut seats = Vec::with_capacity(committee.len());
            for (_, seat) in committee {
                m.stakes
                    .get_mut(&(seat.validator, StakeRole::Validator as u8))
                    .ok_or(JobMarketError::StakeAccountMismatch)?
                    .lock(seat.locked)?;
                seats.push(seat);
            }

            let commit_deadline = now + m.config.commit_window;
            let round = ValidationRound {
                job_id,
                nonce: job.validation_nonce,
                seats,
                commit_deadline,
                reveal_deadline: commit_deadline + m.config.reveal_window,
                ..Default::default()
            };
            let validators = round.seats.iter().map(|s| s.validator).collect();
            m.rounds.insert((job_id, job.validation_nonce), round);
            let job = m.job_mut(job_id)?;
            job.round_open = true;
            job.updated_at = now;
            Ok(validators)
        })
    }

    fn require_round_open(&self, job_id: u64) -> Result<u64> {
        let job = self.job(job_id)?;
        require!(
            job.state == JobState::Submitted && job.round_open,
            JobMarketError::RoundNotOpen
        );
        Ok(job.validation_nonce)
    }

    pub fn commit_validation(&mut self, job_id: u64, validator: Pubkey, commitment: [u8; HASH_SIZE]) -> Result<()> {
        self.atomically(|m| {
            let nonce = m.require_round_open(job_id)?;
            let now = m.now;
            m.rounds
                .get_mut(&(job_id, nonce))
                .ok_or(JobMarketError::RoundNotOpen)?
                .commit(&validator, commitment, now)
        })
    }

    /// Commit a vote with the voter's deterministic salt and remember the
    /// ballot for `reveal_ballot`.
    pub fn vote(&mut self, job_id: u64, validator: Pubkey, approve: bool) -> Result<()> {
        let nonce = self.job(job_id)?.validation_nonce;
        let commitment =
            validation_commitment(job_id, nonce, &validator, approve, &salt_for(&validator, nonce));
        self.commit_validation(job_id, validator, commitment)?;
        self.ballots.insert((job_id, nonce, validator), approve);
        Ok(())
    }

    pub fn reveal_validation(
        &mut self,
        job_id: u64,
        validator: Pubkey,
        approve: bool,
        salt: [u8; HASH_SIZE],
    ) -> Result<u64> {
        self.atomically(|m| {
            let nonce = m.require_round_open(job_id)?;
            let now = m.now;
            m.rounds
                .get_mut(&(job_id, nonce))
                .ok_or(JobMarketError::RoundNotOpen)?
                .reveal(&validator, approve, &salt, now)
        })
    }

    /// Reveal the ballot remembered by `vote`.
    pub fn reveal_ballot(&mut self, job_id: u64, validator: Pubkey) -> Result<u64> {
        let nonce = self.job(job_id)?.validation_nonce;
        let approve = *self
            .ballots
            .get(&(job_id, nonce, validator))
            .ok_or(JobMarketError::NotCommitted)?;
        self.reveal_validation(job_id, validator, approve, salt_for(&validator, nonce))
    }

    pub fn finalize_validation(&mut self, job_id: u64) -> Result<bool> {
        self.atomically(|m| {
            if let Ok(round) = m.current_round(job_id) {
                require!(!round.tallied, JobMarketError::AlreadyTallied);
            }
            let nonce = m.require_round_open(job_id)?;
            let now = m.now;
            let threshold = m.config.approval_threshold;
            let round = m
                .rounds
                .get_mut(&(job_id, nonce))
                .ok_or(JobMarketError::RoundNotOpen)?;
            let success = round.tally(threshold, now)?;
            let seats = round.seats.clone();

            let employer = m.job(job_id)?.employer;
            for seat in &seats {
                let stake = m
                    .stakes
                    .get_mut(&(seat.validator, StakeRole::Validator as u8))
                    .ok_or(JobMarketError::StakeAccountMismatch)?;
                let reputation = m.reputations.entry(seat.validator).or_insert_with(|| {
                    ReputationRecord {
                        owner: seat.validator,
                        last_updated: now,
                        ..Default::default()
                    }
                });
                let slash = settle_validator_seat(seat, success, stake, reputation, &m.config, now)?;
                if let Some(split) = slash {
                    m.pay(&employer, split.to_recipient)?;
                    m.pay_treasury(split.to_treasury)?;
                }
            }

            m.job_mut(job_id)?.finalize_after_validation(success, now)?;
            Ok(success)
        })
    }

    pub fn reset_job_nonce(&mut self, job_id: u64) -> Result<u64> {
        self.atomically(|m| {
            let nonce = m.require_round_open(job_id)?;
            let now = m.now;
            let round = m
                .rounds
                .get_mut(&(job_id, nonce))
                .ok_or(JobMarketError::RoundNotOpen)?;
            require!(!round.tallied, JobMarketError::AlreadyTallied);
            require!(!round.voided, JobMarketError::RoundVoided);
            round.voided = true;
            let seats = round.seats.clone();
            for seat in &seats {
                m.stakes
                    .get_mut(&(seat.validator, StakeRole::Validator as u8))
                    .ok_or(JobMarketError::StakeAccountMismatch)?
                    .unlock(seat.locked)?;
            }
            let job = m.job_mut(job_id)?;
            job.validation_nonce += 1;
            job.round_open = false;
            job.updated_at = now;
            Ok(job.validation_nonce)
        })
    }

    // ------------------------------------------------------------------
    // Disputes
    // ------------------------------------------------------------------

    pub fn raise_dispute(&mut self, job_id: u64, appellant: Pubkey) -> Result<()> {
        self.atomically(|m| {
            let now = m.now;
            let job = m.job(job_id)?.clone();
            require!(job.state == JobState::Completed, JobMarketError::NotDisputable);
            require!(!job.dispute_raised, JobMarketError::DisputeAlreadyRaised);
            let appellant_is_agent = appellant == job.agent;
            let may_appeal = if appellant_is_agent {
                !job.success
            } else {
                appellant == job.employer && job.success
            };
            require!(may_appeal, JobMarketError::NotDisputable);

            let round = m
                .rounds
                .get(&(job_id, job.validation_nonce))
                .ok_or(JobMarketError::NotDisputable)?;
            require!(round.tallied, JobMarketError::NotDisputable);
            require!(!round.seats.is_empty(), JobMarketError::InsufficientValidators);

            let commit_deadline = now + m.config.juror_commit_window;
            let case = DisputeCase {
                job_id,
                appellant,
                appellant_is_agent,
                bond: m.config.appeal_bond,
                jurors: round
                    .seats
                    .iter()
                    .map(|seat| JurorSeat {
                        juror: seat.validator,
                        ..Default::default()
                    })
                    .collect(),
                commit_deadline,
                reveal_deadline: commit_deadline + m.config.juror_reveal_window,
                opened_at: now,
                ..Default::default()
            };
            m.cases.insert(job_id, case);

            let bond = m.config.appeal_bond;
            let job = m.job_mut(job_id)?;
            job.dispute_raised = true;
            job.transition(JobState::Disputed, now)?;
            m.take(&appellant, bond)
        })
    }

    fn require_disputed(&self, job_id: u64) -> Result<()> {
        require!(
            self.job(job_id)?.state == JobState::Disputed,
            JobMarketError::InvalidJobState
        );
        Ok(())
    }

    pub fn commit_juror_vote(&mut self, job_id: u64, juror: Pubkey, commitment: [u8; HASH_SIZE]) -> Result<()> {
        self.atomically(|m| {
            m.require_disputed(job_id)?;
            let now = m.now;
            m.cases
                .get_mut(&job_id)
                .ok_or(JobMarketError::CaseJobMismatch)?
                .commit(&juror, commitment, now)
        })
    }

    /// Commit a juror vote with a deterministic salt and remember it.
    pub fn juror_vote(&mut self, job_id: u64, juror: Pubkey, employer_wins: bool) -> Result<()> {
        let commitment = juror_commitment(job_id, &juror, employer_wins, &salt_for(&juror, u64::MAX));
        self.commit_juror_vote(job_id, juror, commitment)?;
        self.juror_ballots.insert((job_id, juror), employer_wins);
        Ok(())
    }

    pub fn reveal_juror_vote(
        &mut self,
        job_id: u64,
        juror: Pubkey,
        employer_wins: bool,
        salt: [u8; HASH_SIZE],
    ) -> Result<()> {
        self.atomically(|m| {
            m.require_disputed(job_id)?;
            let now = m.now;
            m.cases
                .get_mut(&job_id)
                .ok_or(JobMarketError::CaseJobMismatch)?
                .reveal(&juror, employer_wins, &salt, now)
        })
    }

    pub fn reveal_juror_ballot(&mut self, job_id: u64, juror: Pubkey) -> Result<()> {
        let employer_wins = *self
            .juror_ballots
            .get(&(job_id, juror))
            .ok_or(JobMarketError::NotCommitted)?;
        self.reveal_juror_vote(job_id, juror, employer_wins, salt_for(&juror, u64::MAX))
    }

    fn settle_case(&mut self, job_id: u64, employer_wins: bool) -> Result<()> {
        let now = self.now;
        let case = self.cases.remove(&job_id).ok_or(JobMarketError::CaseJobMismatch)?;
        let job = self.job_mut(job_id)?;
        job.enter_critical()?;
        job.resolve_dispute(employer_wins, now)?;
        job.exit_critical();
        let winner = if employer_wins { job.employer } else { job.agent };
        self.pay(&winner, case.bond)
    }

    pub fn finalize_case(&mut self, job_id: u64) -> Result<bool> {
        self.atomically(|m| {
            m.require_disputed(job_id)?;
            let employer_wins = m
                .cases
                .get_mut(&job_id)
                .ok_or(JobMarketError::CaseJobMismatch)?
                .decide()?;
            m.settle_case(job_id, employer_wins)?;
            Ok(employer_wins)
        })
    }

    pub fn expire_case(&mut self, job_id: u64) -> Result<bool> {
        self.atomically(|m| {
            m.require_disputed(job_id)?;
            let now = m.now;
            let grace = m.config.case_expiry_grace;
            let case = m.cases.get_mut(&job_id).ok_or(JobMarketError::CaseJobMismatch)?;
            let employer_wins = case.decide_expired(grace, now)?;
            let absent: Vec<Pubkey> = case
                .jurors
                .iter()
                .filter(|j| !j.revealed)
                .map(|j| j.juror)
                .collect();

            let policy = m.config.reputation_policy();
            for juror in absent {
                m.reputation_mut(juror, now).subtract(
                    job_market::instructions::constants::REPUTATION_ABSENT_JUROR_LOSS,
                    &policy,
                    now,
                );
            }
            m.settle_case(job_id, employer_wins)?;
            Ok(employer_wins)
        })
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Tokens held anywhere in the simulation
    pub fn total_supply(&self) -> u64 {
        self.wallets.values().sum::<u64>() + self.vault + self.treasury + self.fee_pool
    }

    /// What the vault owes: every ledger stake, every escrowed reward and
    /// every open appeal bond.
    pub fn vault_liabilities(&self) -> u64 {
        let staked: u64 = self.stakes.values().map(|s| s.staked).sum();
        let escrowed: u64 = self
            .jobs
            .values()
            .filter(|j| !matches!(j.state, JobState::Finalized | JobState::Cancelled))
            .map(|j| j.reward)
            .sum();
        let bonds: u64 = self.cases.values().map(|c| c.bond).sum();
        staked + escrowed + bonds
    }

    /// Check every market-wide invariant.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        for stake in self.stakes.values() {
            let result = check_stake_bounds(stake.staked, stake.locked);
            if result != StakeInvariantResult::Valid {
                return Err(format!("{:?}", result));
            }
        }

        let result = check_vault_solvency(self.vault, self.vault_liabilities());
        if result != StakeInvariantResult::Valid {
            return Err(format!("{:?}", result));
        }

        let result = check_token_conservation(self.minted, self.total_supply());
        if result != StakeInvariantResult::Valid {
            return Err(format!("{:?}", result));
        }

        for job in self.jobs.values() {
            let open = self
                .rounds
                .iter()
                .filter(|((id, _), r)| *id == job.job_id && !r.tallied && !r.voided)
                .count();
            let result = check_single_open_round(job.job_id, open, job.round_open);
            if result != RoundInvariantResult::Valid {
                return Err(format!("{:?}", result));
            }
        }

        for round in self.rounds.values() {
            let result = check_tally_consistency(round);
            if result != RoundInvariantResult::Valid {
                return Err(format!("{:?}", result));
            }
        }

        for case in self.cases.values() {
            let result = check_case_counters(case);
            if result != DisputeInvariantResult::Valid {
                return Err(format!("{:?}", result));
            }
        }

        Ok(())
    }

    /// Apply one operation and report errors or invariant violations.
    pub fn step(&mut self, op: &MarketOp) -> SimulationResult {
        let result = self.apply(op);
        if let Err(violation) = self.check_invariants() {
            return SimulationResult::InvariantViolation(format!("after {:?}: {}", op, violation));
        }
        outcome(result)
    }

    fn job_at(&self, index: u8) -> Result<u64> {
        require!(!self.jobs.is_empty(), JobMarketError::InvalidJobState);
        let ids: Vec<u64> = self.jobs.keys().copied().collect();
        Ok(ids[index as usize % ids.len()])
    }

    fn seat_at(&self, job_id: u64, index: u8) -> Result<Pubkey> {
        let round = self.current_round(job_id)?;
        require!(!round.seats.is_empty(), JobMarketError::NotSelectedValidator);
        Ok(round.seats[index as usize % round.seats.len()].validator)
    }

    fn juror_at(&self, job_id: u64, index: u8) -> Result<Pubkey> {
        let case = self.cases.get(&job_id).ok_or(JobMarketError::CaseJobMismatch)?;
        require!(!case.jurors.is_empty(), JobMarketError::NotJuror);
        Ok(case.jurors[index as usize % case.jurors.len()].juror)
    }

    pub fn apply(&mut self, op: &MarketOp) -> Result<()> {
        match *op {
            MarketOp::Deposit { actor: a, validator, amount } => {
                let role = if validator { StakeRole::Validator } else { StakeRole::Agent };
                self.deposit_stake(actor(a), role, amount)
            }
            MarketOp::Withdraw { actor: a, validator, amount } => {
                let role = if validator { StakeRole::Validator } else { StakeRole::Agent };
                self.withdraw_stake(actor(a), role, amount)
            }
            MarketOp::CreateJob { employer, reward, stake } => {
                self.create_job(actor(employer), reward, stake).map(|_| ())
            }
            MarketOp::Apply { job, agent } => {
                let job_id = self.job_at(job)?;
                self.apply_for_job(job_id, actor(agent))
            }
            MarketOp::Submit { job } => {
                let job_id = self.job_at(job)?;
                let agent = self.job(job_id)?.agent;
                self.submit_job(job_id, agent, [job; HASH_SIZE])
            }
            MarketOp::Cancel { job } => {
                let job_id = self.job_at(job)?;
                let employer = self.job(job_id)?.employer;
                self.cancel_job(job_id, employer)
            }
            MarketOp::SelectValidators { job, entropy } => {
                let job_id = self.job_at(job)?;
                self.select_validators(job_id, [entropy; HASH_SIZE]).map(|_| ())
            }
            MarketOp::Vote { job, seat, approve } => {
                let job_id = self.job_at(job)?;
                let validator = self.seat_at(job_id, seat)?;
                self.vote(job_id, validator, approve)
            }
            MarketOp::Reveal { job, seat } => {
                let job_id = self.job_at(job)?;
                let validator = self.seat_at(job_id, seat)?;
                self.reveal_ballot(job_id, validator).map(|_| ())
            }
            MarketOp::FinalizeValidation { job } => {
                let job_id = self.job_at(job)?;
                self.finalize_validation(job_id).map(|_| ())
            }
            MarketOp::ResetNonce { job } => {
                let job_id = self.job_at(job)?;
                self.reset_job_nonce(job_id).map(|_| ())
            }
            MarketOp::RaiseDispute { job, by_agent } => {
                let job_id = self.job_at(job)?;
                let job = self.job(job_id)?;
                let appellant = if by_agent { job.agent } else { job.employer };
                self.raise_dispute(job_id, appellant)
            }
            MarketOp::JurorVote { job, seat, employer_wins } => {
                let job_id = self.job_at(job)?;
                let juror = self.juror_at(job_id, seat)?;
                self.juror_vote(job_id, juror, employer_wins)
            }
            MarketOp::JurorReveal { job, seat } => {
                let job_id = self.job_at(job)?;
                let juror = self.juror_at(job_id, seat)?;
                self.reveal_juror_ballot(job_id, juror)
            }
            MarketOp::FinalizeCase { job } => {
                let job_id = self.job_at(job)?;
                self.finalize_case(job_id).map(|_| ())
            }
            MarketOp::ExpireCase { job } => {
                let job_id = self.job_at(job)?;
                self.expire_case(job_id).map(|_| ())
            }
            MarketOp::FinalizeJob { job } => {
                let job_id = self.job_at(job)?;
                self.finalize_job(job_id).map(|_| ())
            }
            MarketOp::Advance { seconds } => {
                self.advance(seconds);
                Ok(())
            }
        }
    }
}

/// One instruction-level action on a `SimulatedMarket`. Jobs, seats and
/// jurors are addressed by index modulo what currently exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketOp {
    Deposit { actor: u8, validator: bool, amount: u64 },
    Withdraw { actor: u8, validator: bool, amount: u64 },
    CreateJob { employer: u8, reward: u64, stake: u64 },
    Apply { job: u8, agent: u8 },
    Submit { job: u8 },
    Cancel { job: u8 },
    SelectValidators { job: u8, entropy: u8 },
    Vote { job: u8, seat: u8, approve: bool },
    Reveal { job: u8, seat: u8 },
    FinalizeValidation { job: u8 },
    ResetNonce { job: u8 },
    RaiseDispute { job: u8, by_agent: bool },
    JurorVote { job: u8, seat: u8, employer_wins: bool },
    JurorReveal { job: u8, seat: u8 },
    FinalizeCase { job: u8 },
    ExpireCase { job: u8 },
    FinalizeJob { job: u8 },
    Advance { seconds: i64 },
}

/// Validators `actor(10)..` with the given stakes, pooled and funded.
pub fn market_with_validators(params: ProtocolParams, stakes: &[u64]) -> Result<SimulatedMarket> {
    let mut market = SimulatedMarket::new(params)?;
    let validators: Vec<Pubkey> = (0..stakes.len()).map(|i| actor(10 + i as u8)).collect();
    for (validator, stake) in validators.iter().zip(stakes) {
        market.fund(*validator, *stake);
        market.deposit_stake(*validator, StakeRole::Validator, *stake)?;
    }
    market.set_pool(&validators)?;
    Ok(market)
}

/// Employer `actor(1)` posts a job that agent `actor(2)` takes and submits.
/// Both are funded with exactly what the job needs.
pub fn submitted_job(market: &mut SimulatedMarket, reward: u64, stake: u64) -> Result<u64> {
    let (employer, agent) = (actor(1), actor(2));
    market.fund(employer, reward);
    if stake > 0 {
        market.fund(agent, stake);
        market.deposit_stake(agent, StakeRole::Agent, stake)?;
    }
    let job_id = market.create_job(employer, reward, stake)?;
    market.apply_for_job(job_id, agent)?;
    market.submit_job(job_id, agent, [7u8; HASH_SIZE])?;
    Ok(job_id)
}

/// Commit every vote, reveal them all once the commit window closes and tally
/// after the reveal window.
pub fn run_round(market: &mut SimulatedMarket, job_id: u64, votes: &[(Pubkey, bool)]) -> Result<bool> {
    for (validator, approve) in votes {
        market.vote(job_id, *validator, *approve)?;
    }
    market.advance(market.config.commit_window);
    for (validator, _) in votes {
        market.reveal_ballot(job_id, *validator)?;
    }
    market.advance(market.config.reveal_window);
    market.finalize_validation(job_id)
}
