//! Property-based fuzz testing library for the Job Market Protocol
//!
//! Replays instruction logic against the program's own state types in an
//! in-memory market and checks protocol invariants after every step.
//!
//! # Usage
//!
//! ```bash
//! # Run all property-based tests
//! cargo test --release
//!
//! # Run the fuzz test runner
//! cargo run --release
//!
//! # Run with more iterations
//! PROPTEST_CASES=10000 cargo test --release
//! ```

pub mod arbitrary;
pub mod invariants;
pub mod scenarios;

pub use arbitrary::*;
pub use invariants::*;
pub use scenarios::*;

// Include fuzz targets as test modules
#[cfg(test)]
#[path = "../fuzz_targets/stake_ledger.rs"]
mod stake_ledger_tests;

#[cfg(test)]
#[path = "../fuzz_targets/validator_selection.rs"]
mod validator_selection_tests;

#[cfg(test)]
#[path = "../fuzz_targets/validation_round.rs"]
mod validation_round_tests;

#[cfg(test)]
#[path = "../fuzz_targets/job_lifecycle.rs"]
mod job_lifecycle_tests;

#[cfg(test)]
#[path = "../fuzz_targets/dispute_lifecycle.rs"]
mod dispute_lifecycle_tests;
