//! Shared helper functions for arbitration cases.

use crate::state::HASH_SIZE;
use anchor_lang::prelude::*;
use solana_keccak_hasher as keccak;

/// Domain tag mixed into every juror commitment
pub const DISPUTE_DOMAIN: &[u8] = b"dispute";

/// Commitment for a juror vote:
/// `keccak(domain, job_id, juror, employer_wins, salt)`.
pub fn juror_commitment(
    job_id: u64,
    juror: &Pubkey,
    employer_wins: bool,
    salt: &[u8; HASH_SIZE],
) -> [u8; HASH_SIZE] {
    keccak::hashv(&[
        DISPUTE_DOMAIN,
        job_id.to_le_bytes().as_ref(),
        juror.as_ref(),
        &[employer_wins as u8],
        salt.as_ref(),
    ])
    .to_bytes()
}

/// Simple majority by juror count. A tie does not hand the win to the
/// employer.
pub fn majority_employer_wins(employer_votes: u8, reveals: u8) -> bool {
    (employer_votes as u16) * 2 > reveals as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_majority() {
        assert!(majority_employer_wins(2, 3));
        assert!(!majority_employer_wins(1, 3));
        assert!(!majority_employer_wins(1, 2));
        assert!(majority_employer_wins(3, 3));
        assert!(!majority_employer_wins(0, 0));
        assert!(majority_employer_wins(200, 255));
    }

    #[test]
    fn test_juror_commitment_separated_from_validation() {
        use crate::instructions::validation_helpers::validation_commitment;
        let juror = Pubkey::new_from_array([1u8; 32]);
        let salt = [2u8; 32];
        assert_ne!(
            juror_commitment(5, &juror, true, &salt),
            validation_commitment(5, 0, &juror, true, &salt)
        );
        assert_ne!(
            juror_commitment(5, &juror, true, &salt),
            juror_commitment(5, &juror, false, &salt)
        );
    }
}
