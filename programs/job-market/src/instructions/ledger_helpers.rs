//! Stake and reputation bookkeeping shared by handlers.
//!
//! Handlers that touch a variable number of ledger entries (validators of a
//! round, jurors of a case) receive them through `remaining_accounts` and go
//! through `load_program_account` / `store_program_account`.

use crate::errors::JobMarketError;
use crate::events::{
    reputation_reason, stake_action, BlacklistUpdated, ReputationChanged, StakeChanged,
};
use crate::instructions::constants::{REPUTATION_DISHONEST_VOTE_LOSS, REPUTATION_PER_HONEST_VOTE};
use crate::instructions::settlement_helpers::{split_slash, JobSettlement, SlashSplit};
use crate::instructions::validation_helpers::{seat_is_honest, Candidate};
use crate::state::{
    ProtocolConfig, ReputationPolicy, ReputationRecord, StakeAccount, StakeDelta, StakeRole,
    ValidatorSeat,
};
use anchor_lang::prelude::*;

/// Deserialize an account owned by this program.
pub fn read_program_account<T: AccountDeserialize>(info: &AccountInfo) -> Result<T> {
    require!(
        info.owner == &crate::ID,
        JobMarketError::InvalidAccountOwner
    );
    let data = info.try_borrow_data()?;
    T::try_deserialize(&mut &**data)
}

/// Deserialize a writable account owned by this program.
pub fn load_program_account<T: AccountDeserialize>(info: &AccountInfo) -> Result<T> {
    require!(info.is_writable, JobMarketError::InvalidRemainingAccounts);
    read_program_account(info)
}

/// Write an account previously loaded with `load_program_account`.
pub fn store_program_account<T: AccountSerialize>(info: &AccountInfo, value: &T) -> Result<()> {
    let mut data = info.try_borrow_mut_data()?;
    value.try_serialize(&mut &mut data[..])
}

pub fn load_stake_account(info: &AccountInfo, owner: &Pubkey, role: StakeRole) -> Result<StakeAccount> {
    let stake: StakeAccount = load_program_account(info)?;
    require!(
        stake.owner == *owner && stake.role == role,
        JobMarketError::StakeAccountMismatch
    );
    Ok(stake)
}

pub fn load_reputation(info: &AccountInfo, owner: &Pubkey) -> Result<ReputationRecord> {
    let record: ReputationRecord = load_program_account(info)?;
    require!(
        record.owner == *owner,
        JobMarketError::ReputationAccountMismatch
    );
    Ok(record)
}

/// Read a pool member's stake and reputation. Accounts that were never
/// created must still be the member's PDAs and count as zero stake.
pub fn load_candidate(
    stake_info: &AccountInfo,
    reputation_info: &AccountInfo,
    validator: &Pubkey,
) -> Result<Candidate> {
    let available = if stake_info.owner == &crate::ID {
        let stake: StakeAccount = read_program_account(stake_info)?;
        require!(
            stake.owner == *validator && stake.role == StakeRole::Validator,
            JobMarketError::StakeAccountMismatch
        );
        stake.available()
    } else {
        let (expected, _) = Pubkey::find_program_address(
            &[b"stake", validator.as_ref(), &StakeRole::Validator.as_seed()],
            &crate::ID,
        );
        require_keys_eq!(
            stake_info.key(),
            expected,
            JobMarketError::StakeAccountMismatch
        );
        0
    };

    let blacklisted = if reputation_info.owner == &crate::ID {
        let record: ReputationRecord = read_program_account(reputation_info)?;
        require!(
            record.owner == *validator,
            JobMarketError::ReputationAccountMismatch
        );
        record.blacklisted
    } else {
        let (expected, _) =
            Pubkey::find_program_address(&[b"reputation", validator.as_ref()], &crate::ID);
        require_keys_eq!(
            reputation_info.key(),
            expected,
            JobMarketError::ReputationAccountMismatch
        );
        false
    };

    Ok(Candidate {
        available,
        blacklisted,
    })
}

pub fn emit_stake_changed(
    stake: &StakeAccount,
    action: u8,
    amount: u64,
    delta: StakeDelta,
    timestamp: i64,
) {
    emit!(StakeChanged {
        owner: stake.owner,
        role: stake.role as u8,
        action,
        amount,
        staked_before: delta.staked_before,
        staked_after: delta.staked_after,
        locked_before: delta.locked_before,
        locked_after: delta.locked_after,
        timestamp,
    });
}

pub fn reward_reputation(
    record: &mut ReputationRecord,
    amount: u64,
    policy: &ReputationPolicy,
    reason: u8,
    timestamp: i64,
) {
    let (old_score, new_score) = record.add(amount, policy, timestamp);
    if old_score != new_score {
        emit!(ReputationChanged {
            owner: record.owner,
            old_score,
            new_score,
            reason,
            timestamp,
        });
    }
}

pub fn penalize_reputation(
    record: &mut ReputationRecord,
    amount: u64,
    policy: &ReputationPolicy,
    reason: u8,
    timestamp: i64,
) {
    let was_blacklisted = record.blacklisted;
    let (old_score, new_score) = record.subtract(amount, policy, timestamp);
    if old_score != new_score {
        emit!(ReputationChanged {
            owner: record.owner,
            old_score,
            new_score,
            reason,
            timestamp,
        });
    }
    if record.blacklisted && !was_blacklisted {
        msg!("Reputation of {} fell below threshold", record.owner);
        emit!(BlacklistUpdated {
            user: record.owner,
            blacklisted: true,
            timestamp,
        });
    }
}

/// Reputation reason for a validator given its verdict
pub fn vote_reason(honest: bool) -> u8 {
    if honest {
        reputation_reason::HONEST_VOTE
    } else {
        reputation_reason::DISHONEST_VOTE
    }
}

/// Apply a tallied round to one seat's ledgers. Honest seats get their round
/// lock back and a reputation reward. Every other seat loses the lock and
/// reputation; the returned split says where the slashed tokens go.
pub fn settle_validator_seat(
    seat: &ValidatorSeat,
    success: bool,
    stake: &mut StakeAccount,
    reputation: &mut ReputationRecord,
    config: &ProtocolConfig,
    now: i64,
) -> Result<Option<SlashSplit>> {
    let policy = config.reputation_policy();
    if seat_is_honest(seat, success) {
        if seat.locked > 0 {
            let delta = stake.unlock(seat.locked)?;
            emit_stake_changed(stake, stake_action::UNLOCK, seat.locked, delta, now);
        }
        reward_reputation(reputation, REPUTATION_PER_HONEST_VOTE, &policy, vote_reason(true), now);
        return Ok(None);
    }

    penalize_reputation(reputation, REPUTATION_DISHONEST_VOTE_LOSS, &policy, vote_reason(false), now);
    if seat.locked == 0 {
        return Ok(None);
    }
    let delta = stake.slash(seat.locked)?;
    emit_stake_changed(stake, stake_action::SLASH, seat.locked, delta, now);
    split_slash(seat.locked, config.slash_recipient_pct).map(Some)
}

/// Apply a job settlement to the agent's stake ledger. Jobs without a stake
/// ignore `stake`; staked jobs require it.
pub fn settle_agent_stake(
    stake: Option<&mut StakeAccount>,
    job_stake: u64,
    success: bool,
    plan: &JobSettlement,
    now: i64,
) -> Result<()> {
    if job_stake == 0 {
        return Ok(());
    }
    let stake = stake.ok_or(JobMarketError::StakeAccountMismatch)?;
    if success {
        let delta = stake.release(plan.stake_released)?;
        emit_stake_changed(stake, stake_action::RELEASE, plan.stake_released, delta, now);
        return Ok(());
    }
    if plan.stake_slashed > 0 {
        let delta = stake.slash(plan.stake_slashed)?;
        emit_stake_changed(stake, stake_action::SLASH, plan.stake_slashed, delta, now);
    }
    if plan.stake_unlocked > 0 {
        let delta = stake.unlock(plan.stake_unlocked)?;
        emit_stake_changed(stake, stake_action::UNLOCK, plan.stake_unlocked, delta, now);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::settlement_helpers::plan_job_settlement;

    struct TestAccount {
        key: Pubkey,
        owner: Pubkey,
        lamports: u64,
        data: Vec<u8>,
    }

    impl TestAccount {
        fn uninitialized(key: Pubkey) -> Self {
            Self {
                key,
                owner: Pubkey::default(),
                lamports: 0,
                data: Vec::new(),
            }
        }

        fn program_owned<T: AccountSerialize>(key: Pubkey, value: &T, size: usize) -> Self {
            let mut data = vec![0u8; size];
            value.try_serialize(&mut &mut data[..]).unwrap();
            Self {
                key,
                owner: crate::ID,
                lamports: 1,
                data,
            }
        }

        fn info(&mut self) -> AccountInfo<'_> {
            AccountInfo::new(
                &self.key,
                false,
                true,
                &mut self.lamports,
                &mut self.data,
                &self.owner,
                false,
                0,
            )
        }
    }

    fn stake_pda(validator: &Pubkey) -> Pubkey {
        Pubkey::find_program_address(
            &[b"stake", validator.as_ref(), &StakeRole::Validator.as_seed()],
            &crate::ID,
        )
        .0
    }

    fn reputation_pda(validator: &Pubkey) -> Pubkey {
        Pubkey::find_program_address(&[b"reputation", validator.as_ref()], &crate::ID).0
    }

    #[test]
    fn test_missing_ledgers_count_as_zero_stake() {
        let validator = Pubkey::new_unique();
        let mut stake = TestAccount::uninitialized(stake_pda(&validator));
        let mut reputation = TestAccount::uninitialized(reputation_pda(&validator));
        let candidate = load_candidate(&stake.info(), &reputation.info(), &validator).unwrap();
        assert_eq!(candidate, Candidate::default());

        // An unrelated empty account cannot stand in for the PDA
        let mut stranger = TestAccount::uninitialized(Pubkey::new_unique());
        let result = load_candidate(&stranger.info(), &reputation.info(), &validator);
        assert_eq!(
            result.unwrap_err(),
            JobMarketError::StakeAccountMismatch.into()
        );
    }

    #[test]
    fn test_candidate_read_from_initialized_ledgers() {
        let validator = Pubkey::new_unique();
        let ledger = StakeAccount {
            owner: validator,
            role: StakeRole::Validator,
            staked: 40,
            locked: 10,
            ..Default::default()
        };
        let record = ReputationRecord {
            owner: validator,
            blacklisted: true,
            ..Default::default()
        };
        let mut stake = TestAccount::program_owned(stake_pda(&validator), &ledger, StakeAccount::SIZE);
        let mut reputation =
            TestAccount::program_owned(reputation_pda(&validator), &record, ReputationRecord::SIZE);

        let candidate = load_candidate(&stake.info(), &reputation.info(), &validator).unwrap();
        assert_eq!(candidate.available, 30);
        assert!(candidate.blacklisted);

        let result = load_candidate(&stake.info(), &reputation.info(), &Pubkey::new_unique());
        assert_eq!(
            result.unwrap_err(),
            JobMarketError::StakeAccountMismatch.into()
        );
    }

    #[test]
    fn test_stored_ledger_round_trips_through_account_data() {
        let validator = Pubkey::new_unique();
        let mut ledger = StakeAccount {
            owner: validator,
            role: StakeRole::Validator,
            staked: 40,
            ..Default::default()
        };
        let mut account = TestAccount::program_owned(stake_pda(&validator), &ledger, StakeAccount::SIZE);
        ledger.lock(15).unwrap();
        store_program_account(&account.info(), &ledger).unwrap();

        let loaded = load_stake_account(&account.info(), &validator, StakeRole::Validator).unwrap();
        assert_eq!((loaded.staked, loaded.locked), (40, 15));
        let result = load_stake_account(&account.info(), &validator, StakeRole::Agent);
        assert!(result.is_err());
    }

    fn seated(validator: Pubkey, approve: bool, revealed: bool) -> (ValidatorSeat, StakeAccount) {
        let mut stake = StakeAccount {
            owner: validator,
            role: StakeRole::Validator,
            ..Default::default()
        };
        stake.deposit(40).unwrap();
        stake.lock(10).unwrap();
        let seat = ValidatorSeat {
            validator,
            stake: 40,
            locked: 10,
            committed: true,
            revealed,
            approve,
            ..Default::default()
        };
        (seat, stake)
    }

    #[test]
    fn test_honest_seat_unlocked_and_rewarded() {
        let config = ProtocolConfig::default();
        let validator = Pubkey::new_unique();
        let (seat, mut stake) = seated(validator, true, true);
        let mut reputation = ReputationRecord {
            owner: validator,
            ..Default::default()
        };

        let slash = settle_validator_seat(&seat, true, &mut stake, &mut reputation, &config, 0).unwrap();
        assert!(slash.is_none());
        assert_eq!((stake.staked, stake.locked), (40, 0));
        assert_eq!(reputation.score, REPUTATION_PER_HONEST_VOTE);
    }

    #[test]
    fn test_dissenting_and_silent_seats_slashed() {
        let config = ProtocolConfig::default();
        for (approve, revealed) in [(false, true), (true, false)] {
            let validator = Pubkey::new_unique();
            let (seat, mut stake) = seated(validator, approve, revealed);
            let mut reputation = ReputationRecord {
                owner: validator,
                score: 60,
                ..Default::default()
            };

            let split = settle_validator_seat(&seat, true, &mut stake, &mut reputation, &config, 0)
                .unwrap()
                .unwrap();
            assert_eq!((split.to_recipient, split.to_treasury), (5, 5));
            assert_eq!((stake.staked, stake.locked), (30, 0));
            assert_eq!(reputation.score, 60 - REPUTATION_DISHONEST_VOTE_LOSS);
        }
    }

    #[test]
    fn test_agent_stake_required_only_for_staked_jobs() {
        let plan = plan_job_settlement(100, 0, 0, true, 100).unwrap();
        assert!(settle_agent_stake(None, 0, true, &plan, 0).is_ok());

        let plan = plan_job_settlement(100, 50, 0, false, 40).unwrap();
        assert_eq!(
            settle_agent_stake(None, 50, false, &plan, 0).unwrap_err(),
            JobMarketError::StakeAccountMismatch.into()
        );

        let mut stake = StakeAccount::default();
        stake.deposit(80).unwrap();
        stake.lock(50).unwrap();
        settle_agent_stake(Some(&mut stake), 50, false, &plan, 0).unwrap();
        assert_eq!((stake.staked, stake.locked), (60, 0));
    }
}
