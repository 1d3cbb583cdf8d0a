//! Shared helpers for validator selection, commitments and tallying.
//!
//! Kept free of account plumbing so the same code paths run inside the
//! instruction handlers and in host-side simulations.

use crate::errors::JobMarketError;
use crate::instructions::constants::PERCENT_BASE;
use crate::state::{PoolEntry, ValidatorSeat, HASH_SIZE};
use crate::utils::randomness::draw_value;
use anchor_lang::prelude::*;
use solana_keccak_hasher as keccak;

/// Domain tag mixed into every validation commitment
pub const VALIDATION_DOMAIN: &[u8] = b"validation";

/// Commitment for a validator vote:
/// `keccak(domain, job_id, nonce, validator, approve, salt)`.
///
/// The nonce invalidates commitments from a reset round and the validator key
/// stops one seat from replaying another seat's commitment.
pub fn validation_commitment(
    job_id: u64,
    nonce: u64,
    validator: &Pubkey,
    approve: bool,
    salt: &[u8; HASH_SIZE],
) -> [u8; HASH_SIZE] {
    keccak::hashv(&[
        VALIDATION_DOMAIN,
        job_id.to_le_bytes().as_ref(),
        nonce.to_le_bytes().as_ref(),
        validator.as_ref(),
        &[approve as u8],
        salt.as_ref(),
    ])
    .to_bytes()
}

/// `approvals * 100 >= (approvals + rejections) * threshold`, with an empty
/// tally counting as failure.
pub fn weighted_outcome(approvals: u64, rejections: u64, approval_threshold: u8) -> bool {
    let total = approvals as u128 + rejections as u128;
    if total == 0 {
        return false;
    }
    approvals as u128 * PERCENT_BASE as u128 >= total * approval_threshold as u128
}

/// A seat keeps its stake only if it revealed and agreed with the outcome.
/// Not revealing is punished exactly like voting with the minority.
pub fn seat_is_honest(seat: &ValidatorSeat, success: bool) -> bool {
    seat.revealed && seat.approve == success
}

/// `stake * pct / 100`
pub fn percentage_of(amount: u64, pct: u8) -> Result<u64> {
    require!(pct as u64 <= PERCENT_BASE, JobMarketError::InvalidPercentage);
    let scaled = (amount as u128)
        .checked_mul(pct as u128)
        .ok_or(JobMarketError::ArithmeticOverflow)?
        / PERCENT_BASE as u128;
    u64::try_from(scaled).map_err(|_| JobMarketError::ArithmeticOverflow.into())
}

/// Stake-weighted sampling without replacement.
///
/// For each of `min(count, weights.len())` draws, a value in
/// `[0, remaining_weight)` is derived from `seed` and the draw index, the
/// cumulative weights are walked until the running sum exceeds it, and the
/// chosen entry is swapped to the end and removed. Returns indices into
/// `weights` in selection order. Deterministic for a fixed seed.
pub fn select_weighted(weights: &[u64], count: usize, seed: &[u8; HASH_SIZE]) -> Result<Vec<usize>> {
    let mut remaining: u128 = weights.iter().map(|w| *w as u128).sum();
    require!(remaining > 0, JobMarketError::ZeroTotalWeight);

    let mut pool: Vec<u64> = weights.to_vec();
    let mut ids: Vec<usize> = (0..weights.len()).collect();
    let count = count.min(pool.len());
    let mut selected = Vec::with_capacity(count);

    for draw in 0..count {
        if remaining == 0 {
            break;
        }
        let target = draw_value(seed, draw as u64) % remaining;

        let mut cumulative: u128 = 0;
        let mut pick = pool.len() - 1;
        for (index, weight) in pool.iter().enumerate() {
            cumulative += *weight as u128;
            if cumulative > target {
                pick = index;
                break;
            }
        }

        selected.push(ids[pick]);
        remaining -= pool[pick] as u128;
        pool.swap_remove(pick);
        ids.swap_remove(pick);
    }

    Ok(selected)
}

/// Selection inputs for one pool member
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Candidate {
    pub available: u64,
    pub blacklisted: bool,
}

/// Pool members that may sit on a job's committee, as
/// `(pool index, available stake)` in pool order.
///
/// `load` supplies each member's stake and blacklist flag and is only called
/// for members that pass the identity gate. Keys in `excluded` (the job's
/// employer and agent) are never seated on their own job.
pub fn eligible_candidates<F>(
    entries: &[PoolEntry],
    identity_required: bool,
    excluded: &[Pubkey],
    mut load: F,
) -> Result<Vec<(usize, u64)>>
where
    F: FnMut(usize, &PoolEntry) -> Result<Candidate>,
{
    let mut candidates = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        if identity_required && !entry.allowlisted && !entry.identity_verified {
            continue;
        }
        if excluded.contains(&entry.validator) {
            continue;
        }
        let candidate = load(index, entry)?;
        if candidate.blacklisted || candidate.available == 0 {
            continue;
        }
        candidates.push((index, candidate.available));
    }
    Ok(candidates)
}

/// Draw the committee from `candidates` and size each seat's round lock.
/// Returns `(pool index, seat)` in draw order.
pub fn draw_committee(
    entries: &[PoolEntry],
    candidates: &[(usize, u64)],
    min_validators: u8,
    max_validators: u8,
    validator_slash_pct: u8,
    seed: &[u8; HASH_SIZE],
) -> Result<Vec<(usize, ValidatorSeat)>> {
    require!(
        candidates.len() >= min_validators as usize,
        JobMarketError::InsufficientValidators
    );
    let weights: Vec<u64> = candidates.iter().map(|(_, weight)| *weight).collect();
    let count = candidates.len().min(max_validators as usize);

    select_weighted(&weights, count, seed)?
        .into_iter()
        .map(|pick| {
            let (pool_index, weight) = candidates[pick];
            let seat = ValidatorSeat {
                validator: entries[pool_index].validator,
                stake: weight,
                locked: percentage_of(weight, validator_slash_pct)?,
                ..Default::default()
            };
            Ok((pool_index, seat))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_matches_threshold_formula() {
        // 50 of 60 approve: 83% >= 50%
        assert!(weighted_outcome(50, 10, 50));
        // Exactly at threshold passes
        assert!(weighted_outcome(50, 50, 50));
        assert!(!weighted_outcome(49, 51, 50));
        assert!(weighted_outcome(2, 1, 66));
        assert!(!weighted_outcome(2, 1, 67));
        assert!(!weighted_outcome(0, 0, 1));
    }

    #[test]
    fn test_outcome_no_overflow_at_extremes() {
        assert!(weighted_outcome(u64::MAX, u64::MAX, 50));
        assert!(!weighted_outcome(u64::MAX - 1, u64::MAX, 50));
    }

    #[test]
    fn test_commitment_binds_every_field() {
        let v = Pubkey::new_from_array([1u8; 32]);
        let other = Pubkey::new_from_array([2u8; 32]);
        let salt = [3u8; 32];
        let base = validation_commitment(1, 0, &v, true, &salt);
        assert_eq!(base, validation_commitment(1, 0, &v, true, &salt));
        assert_ne!(base, validation_commitment(2, 0, &v, true, &salt));
        assert_ne!(base, validation_commitment(1, 1, &v, true, &salt));
        assert_ne!(base, validation_commitment(1, 0, &other, true, &salt));
        assert_ne!(base, validation_commitment(1, 0, &v, false, &salt));
        assert_ne!(base, validation_commitment(1, 0, &v, true, &[4u8; 32]));
    }

    #[test]
    fn test_commitment_is_keccak_of_packed_preimage() {
        // keccak256 of the empty string, distinct from SHA3-256
        let empty = keccak::hashv(&[]).to_bytes();
        assert_eq!(empty[..4], [0xc5, 0xd2, 0x46, 0x01]);
        assert_eq!(empty[28..], [0x5d, 0x85, 0xa4, 0x70]);

        // Clients commit off-chain by hashing the packed fields in order
        let v = Pubkey::new_from_array([9u8; 32]);
        let salt = [7u8; 32];
        let mut preimage = VALIDATION_DOMAIN.to_vec();
        preimage.extend_from_slice(&3u64.to_le_bytes());
        preimage.extend_from_slice(&1u64.to_le_bytes());
        preimage.extend_from_slice(v.as_ref());
        preimage.push(1);
        preimage.extend_from_slice(&salt);
        assert_eq!(
            validation_commitment(3, 1, &v, true, &salt),
            keccak::hashv(&[&preimage]).to_bytes()
        );
    }

    #[test]
    fn test_seat_honesty() {
        let mut seat = ValidatorSeat::default();
        assert!(!seat_is_honest(&seat, true));
        assert!(!seat_is_honest(&seat, false));
        seat.revealed = true;
        seat.approve = true;
        assert!(seat_is_honest(&seat, true));
        assert!(!seat_is_honest(&seat, false));
    }

    #[test]
    fn test_percentage_of() {
        assert_eq!(percentage_of(10, 25).unwrap(), 2);
        assert_eq!(percentage_of(100, 100).unwrap(), 100);
        assert_eq!(percentage_of(u64::MAX, 100).unwrap(), u64::MAX);
        assert!(percentage_of(1, 101).is_err());
    }

    #[test]
    fn test_selection_is_deterministic_and_unique() {
        let weights = [30u64, 20, 10, 5, 1];
        let seed = [7u8; 32];
        let a = select_weighted(&weights, 3, &seed).unwrap();
        let b = select_weighted(&weights, 3, &seed).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        let mut sorted = a.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 3);
    }

    #[test]
    fn test_selection_takes_everyone_when_count_exceeds_pool() {
        let weights = [1u64, 2, 3];
        let mut picked = select_weighted(&weights, 10, &[0u8; 32]).unwrap();
        picked.sort_unstable();
        assert_eq!(picked, vec![0, 1, 2]);
    }

    #[test]
    fn test_selection_never_picks_zero_weight_while_others_remain() {
        let weights = [0u64, 5, 0, 7];
        for byte in 0..32u8 {
            let picked = select_weighted(&weights, 2, &[byte; 32]).unwrap();
            let mut sorted = picked.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, vec![1, 3]);
        }
    }

    #[test]
    fn test_selection_zero_total_weight_fails() {
        assert!(select_weighted(&[0, 0, 0], 2, &[1u8; 32]).is_err());
        assert!(select_weighted(&[], 2, &[1u8; 32]).is_err());
    }

    fn entry(n: u8, allowlisted: bool) -> PoolEntry {
        PoolEntry {
            validator: Pubkey::new_from_array([n; 32]),
            allowlisted,
            identity_verified: false,
        }
    }

    #[test]
    fn test_eligible_candidates_filters_pool() {
        let entries = [entry(1, true), entry(2, false), entry(3, true), entry(4, true), entry(5, true)];
        let excluded = [entries[3].validator];
        let mut loaded = Vec::new();
        let candidates = eligible_candidates(&entries, true, &excluded, |index, _| {
            loaded.push(index);
            Ok(match index {
                0 => Candidate { available: 10, blacklisted: false },
                2 => Candidate { available: 10, blacklisted: true },
                _ => Candidate::default(),
            })
        })
        .unwrap();

        // Unverified and excluded members are never loaded
        assert_eq!(loaded, vec![0, 2, 4]);
        assert_eq!(candidates, vec![(0, 10)]);

        let open = eligible_candidates(&entries, false, &[], |_, _| {
            Ok(Candidate { available: 5, blacklisted: false })
        })
        .unwrap();
        assert_eq!(open.len(), entries.len());
    }

    #[test]
    fn test_draw_committee_sizes_seats_and_locks() {
        let entries = [entry(1, false), entry(2, false), entry(3, false), entry(4, false)];
        let candidates = [(0, 40), (2, 20), (3, 8)];
        let seed = [6u8; 32];

        let committee = draw_committee(&entries, &candidates, 2, 2, 25, &seed).unwrap();
        assert_eq!(committee.len(), 2);
        for (pool_index, seat) in &committee {
            assert_eq!(seat.validator, entries[*pool_index].validator);
            let weight = candidates.iter().find(|(i, _)| i == pool_index).unwrap().1;
            assert_eq!(seat.stake, weight);
            assert_eq!(seat.locked, weight / 4);
            assert!(!seat.committed);
        }

        let result = draw_committee(&entries, &candidates, 4, 5, 25, &seed);
        assert_eq!(
            result.unwrap_err(),
            JobMarketError::InsufficientValidators.into()
        );
    }
}

