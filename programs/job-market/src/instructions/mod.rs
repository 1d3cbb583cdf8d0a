//! Instruction handlers for the job market program

pub mod constants;
pub mod dispute_helpers;
pub mod ledger_helpers;
pub mod settlement_helpers;
pub mod token_helpers;
pub mod validation_helpers;

pub mod apply_for_job;
pub mod cancel_job;
pub mod commit_juror_vote;
pub mod commit_validation;
pub mod create_job;
pub mod deposit_stake;
pub mod expire_case;
pub mod finalize_case;
pub mod finalize_job;
pub mod finalize_validation;
pub mod initialize_protocol;
pub mod raise_dispute;
pub mod reset_job_nonce;
pub mod reveal_juror_vote;
pub mod reveal_validation;
pub mod select_validators;
pub mod set_blacklist;
pub mod set_validator_allowlist;
pub mod set_validator_pool;
pub mod submit_job;
pub mod update_protocol_config;
pub mod verify_validator_identity;
pub mod withdraw_stake;

#[allow(ambiguous_glob_reexports)]
pub use apply_for_job::*;
#[allow(ambiguous_glob_reexports)]
pub use cancel_job::*;
#[allow(ambiguous_glob_reexports)]
pub use commit_juror_vote::*;
#[allow(ambiguous_glob_reexports)]
pub use commit_validation::*;
#[allow(ambiguous_glob_reexports)]
pub use create_job::*;
#[allow(ambiguous_glob_reexports)]
pub use deposit_stake::*;
#[allow(ambiguous_glob_reexports)]
pub use expire_case::*;
#[allow(ambiguous_glob_reexports)]
pub use finalize_case::*;
#[allow(ambiguous_glob_reexports)]
pub use finalize_job::*;
#[allow(ambiguous_glob_reexports)]
pub use finalize_validation::*;
#[allow(ambiguous_glob_reexports)]
pub use initialize_protocol::*;
#[allow(ambiguous_glob_reexports)]
pub use raise_dispute::*;
#[allow(ambiguous_glob_reexports)]
pub use reset_job_nonce::*;
#[allow(ambiguous_glob_reexports)]
pub use reveal_juror_vote::*;
#[allow(ambiguous_glob_reexports)]
pub use reveal_validation::*;
#[allow(ambiguous_glob_reexports)]
pub use select_validators::*;
#[allow(ambiguous_glob_reexports)]
pub use set_blacklist::*;
#[allow(ambiguous_glob_reexports)]
pub use set_validator_allowlist::*;
#[allow(ambiguous_glob_reexports)]
pub use set_validator_pool::*;
#[allow(ambiguous_glob_reexports)]
pub use submit_job::*;
#[allow(ambiguous_glob_reexports)]
pub use update_protocol_config::*;
#[allow(ambiguous_glob_reexports)]
pub use verify_validator_identity::*;
#[allow(ambiguous_glob_reexports)]
pub use withdraw_stake::*;
