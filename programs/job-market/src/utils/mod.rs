//! Utility modules shared by instruction handlers

pub mod identity;
pub mod multisig;
pub mod randomness;
pub mod version;
