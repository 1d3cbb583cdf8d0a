//! Protocol config version gate, checked at the top of every instruction

use crate::errors::JobMarketError;
use crate::state::{ProtocolConfig, CURRENT_PROTOCOL_VERSION, MIN_SUPPORTED_VERSION};
use anchor_lang::prelude::*;

/// How a config's recorded versions compare with this program build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionStatus {
    Compatible,
    /// Config predates its own minimum and must be migrated
    TooOld,
    /// Config was written by a newer program
    TooNew,
    /// `min_supported_version` lies outside what this build understands
    BadMinimum,
}

pub fn version_status(version: u8, min_supported: u8) -> VersionStatus {
    if version < min_supported {
        VersionStatus::TooOld
    } else if version > CURRENT_PROTOCOL_VERSION {
        VersionStatus::TooNew
    } else if !(MIN_SUPPORTED_VERSION..=CURRENT_PROTOCOL_VERSION).contains(&min_supported) {
        VersionStatus::BadMinimum
    } else {
        VersionStatus::Compatible
    }
}

/// Reject instructions against a config this build cannot interpret.
pub fn check_version_compatible(config: &ProtocolConfig) -> Result<()> {
    let status = version_status(config.protocol_version, config.min_supported_version);
    let error = match status {
        VersionStatus::Compatible => return Ok(()),
        VersionStatus::TooOld => JobMarketError::AccountVersionTooOld,
        VersionStatus::TooNew => JobMarketError::AccountVersionTooNew,
        VersionStatus::BadMinimum => JobMarketError::VersionMismatchProtocol,
    };
    msg!(
        "Protocol config v{} (min {}) rejected by program v{}: {:?}",
        config.protocol_version,
        config.min_supported_version,
        CURRENT_PROTOCOL_VERSION,
        status
    );
    Err(error.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_version_accepted() {
        let config = ProtocolConfig::default();
        assert!(check_version_compatible(&config).is_ok());
        assert!(config.is_version_compatible());
    }

    #[test]
    fn test_status_classification() {
        let current = CURRENT_PROTOCOL_VERSION;
        assert_eq!(version_status(current, current), VersionStatus::Compatible);
        assert_eq!(version_status(current + 1, current), VersionStatus::TooNew);
        assert_eq!(version_status(current, current + 1), VersionStatus::TooOld);
        assert_eq!(version_status(current, 0), VersionStatus::BadMinimum);
    }

    #[test]
    fn test_future_version_rejected() {
        let config = ProtocolConfig {
            protocol_version: CURRENT_PROTOCOL_VERSION + 1,
            ..Default::default()
        };
        assert!(check_version_compatible(&config).is_err());
        assert!(!config.is_version_compatible());
    }
}
