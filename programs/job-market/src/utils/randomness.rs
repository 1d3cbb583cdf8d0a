//! Selection randomness derived from the SlotHashes sysvar

use crate::errors::JobMarketError;
use crate::state::HASH_SIZE;
use anchor_lang::prelude::*;
use solana_keccak_hasher as keccak;

/// SlotHashes layout: u64 entry count, then `(slot: u64, hash: [u8; 32])`
/// entries with the most recent slot first.
const ENTRY_COUNT_LEN: usize = 8;
const SLOT_LEN: usize = 8;

/// Hash of the most recent slot recorded in the SlotHashes sysvar.
pub fn latest_slot_hash(slot_hashes: &AccountInfo) -> Result<[u8; HASH_SIZE]> {
    let data = slot_hashes.try_borrow_data()?;
    parse_latest_slot_hash(&data)
}

fn parse_latest_slot_hash(data: &[u8]) -> Result<[u8; HASH_SIZE]> {
    let start = ENTRY_COUNT_LEN + SLOT_LEN;
    require!(
        data.len() >= start + HASH_SIZE,
        JobMarketError::RandomnessUnavailable
    );

    let mut count = [0u8; ENTRY_COUNT_LEN];
    count.copy_from_slice(&data[..ENTRY_COUNT_LEN]);
    require!(
        u64::from_le_bytes(count) > 0,
        JobMarketError::RandomnessUnavailable
    );

    let mut hash = [0u8; HASH_SIZE];
    hash.copy_from_slice(&data[start..start + HASH_SIZE]);
    Ok(hash)
}

/// `keccak(slot_hash, job_id, nonce)`
pub fn selection_seed(slot_hash: &[u8; HASH_SIZE], job_id: u64, nonce: u64) -> [u8; HASH_SIZE] {
    keccak::hashv(&[
        slot_hash.as_ref(),
        job_id.to_le_bytes().as_ref(),
        nonce.to_le_bytes().as_ref(),
    ])
    .to_bytes()
}

/// Uniform-ish 128-bit value for draw `index` of a selection
pub fn draw_value(seed: &[u8; HASH_SIZE], index: u64) -> u128 {
    let digest = keccak::hashv(&[seed.as_ref(), index.to_le_bytes().as_ref()]).to_bytes();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    u128::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_depends_on_nonce() {
        let slot = [5u8; HASH_SIZE];
        assert_ne!(selection_seed(&slot, 1, 0), selection_seed(&slot, 1, 1));
        assert_ne!(selection_seed(&slot, 1, 0), selection_seed(&slot, 2, 0));
        assert_eq!(selection_seed(&slot, 1, 0), selection_seed(&slot, 1, 0));
    }

    #[test]
    fn test_draws_differ_per_index() {
        let seed = [1u8; HASH_SIZE];
        assert_ne!(draw_value(&seed, 0), draw_value(&seed, 1));
    }

    #[test]
    fn test_latest_slot_hash_reads_first_entry() {
        let mut data = vec![0u8; 8 + 2 * 40];
        data[..8].copy_from_slice(&2u64.to_le_bytes());
        data[8..16].copy_from_slice(&99u64.to_le_bytes());
        data[16..48].copy_from_slice(&[7u8; 32]);
        data[56..88].copy_from_slice(&[8u8; 32]);
        assert_eq!(parse_latest_slot_hash(&data).unwrap(), [7u8; 32]);
    }

    #[test]
    fn test_latest_slot_hash_rejects_empty() {
        assert!(parse_latest_slot_hash(&[0u8; 48]).is_err());
        assert!(parse_latest_slot_hash(&[1u8; 20]).is_err());
    }
}
