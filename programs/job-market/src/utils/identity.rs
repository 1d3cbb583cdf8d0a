//! Identity checks for agents and validators
//!
//! Authorized identities are committed to a Merkle root of
//! `keccak(address, label)` leaves. Pairs are hashed in sorted order so
//! proofs carry no direction bits.

use crate::state::HASH_SIZE;
use anchor_lang::prelude::*;
use solana_keccak_hasher as keccak;

/// Upper bound on proof length (trees of up to 2^32 identities)
pub const MAX_PROOF_LEN: usize = 32;

pub fn identity_leaf(address: &Pubkey, label: &[u8; HASH_SIZE]) -> [u8; HASH_SIZE] {
    keccak::hashv(&[address.as_ref(), label.as_ref()]).to_bytes()
}

fn hash_pair(a: &[u8; HASH_SIZE], b: &[u8; HASH_SIZE]) -> [u8; HASH_SIZE] {
    if a <= b {
        keccak::hashv(&[a.as_ref(), b.as_ref()]).to_bytes()
    } else {
        keccak::hashv(&[b.as_ref(), a.as_ref()]).to_bytes()
    }
}

pub fn verify_merkle_proof(
    proof: &[[u8; HASH_SIZE]],
    root: &[u8; HASH_SIZE],
    leaf: [u8; HASH_SIZE],
) -> bool {
    if proof.len() > MAX_PROOF_LEN {
        return false;
    }
    let computed = proof.iter().fold(leaf, |node, sibling| hash_pair(&node, sibling));
    computed == *root
}

/// Resolution order: checks disabled (zero root), explicit allow-list, then
/// Merkle proof. Any failure falls through to the next method and the result
/// is `false` only when all of them fail.
pub fn is_authorized(
    root: &[u8; HASH_SIZE],
    allowlisted: bool,
    address: &Pubkey,
    label: &[u8; HASH_SIZE],
    proof: &[[u8; HASH_SIZE]],
) -> bool {
    if *root == [0u8; HASH_SIZE] || allowlisted {
        return true;
    }
    verify_merkle_proof(proof, root, identity_leaf(address, label))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_of_four(leaves: &[[u8; 32]; 4]) -> ([u8; 32], [u8; 32], [u8; 32]) {
        let left = hash_pair(&leaves[0], &leaves[1]);
        let right = hash_pair(&leaves[2], &leaves[3]);
        (hash_pair(&left, &right), left, right)
    }

    #[test]
    fn test_valid_proof_accepted() {
        let label = [1u8; 32];
        let members: Vec<Pubkey> = (0..4u8).map(|i| Pubkey::new_from_array([i; 32])).collect();
        let leaves = [
            identity_leaf(&members[0], &label),
            identity_leaf(&members[1], &label),
            identity_leaf(&members[2], &label),
            identity_leaf(&members[3], &label),
        ];
        let (root, _left, right) = tree_of_four(&leaves);

        let proof = [leaves[1], right];
        assert!(is_authorized(&root, false, &members[0], &label, &proof));
        // Wrong label or wrong address fails
        assert!(!is_authorized(&root, false, &members[0], &[2u8; 32], &proof));
        assert!(!is_authorized(&root, false, &members[1], &label, &proof));
    }

    #[test]
    fn test_allowlist_and_open_root_bypass_proof() {
        let addr = Pubkey::new_unique();
        let label = [0u8; 32];
        assert!(is_authorized(&[0u8; 32], false, &addr, &label, &[]));
        assert!(is_authorized(&[9u8; 32], true, &addr, &label, &[]));
        assert!(!is_authorized(&[9u8; 32], false, &addr, &label, &[]));
    }

    #[test]
    fn test_oversized_proof_rejected() {
        let proof = vec![[0u8; 32]; MAX_PROOF_LEN + 1];
        assert!(!verify_merkle_proof(&proof, &[0u8; 32], [0u8; 32]));
    }
}
