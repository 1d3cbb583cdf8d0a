//! Fuzz target modules
//!
//! Each module contains property-based tests for one part of the protocol.
//! Run all tests with: cargo test --release -p job-market-fuzz

pub mod dispute_lifecycle;
pub mod job_lifecycle;
pub mod stake_ledger;
pub mod validation_round;
pub mod validator_selection;
