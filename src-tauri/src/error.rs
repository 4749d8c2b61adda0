use thiserror::Error;

use crate::adapter::AdapterState;
use crate::notice::Notice;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BleError {
    #[error("Bluetooth authorization denied")]
    Unauthorized,

    #[error("location services are disabled")]
    LocationServicesDisabled,

    #[error("no Bluetooth adapter found")]
    NoAdapter,

    #[error("Bluetooth adapter already released")]
    Released,

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Bluetooth permissions were not granted")]
    PermissionDenied,

    #[error("Bluetooth adapter is not usable: {0}")]
    AdapterUnusable(AdapterState),

    #[error("discovery failed: {0}")]
    Discovery(#[from] BleError),
}

impl ScanError {
    /// The blocking notice for this error, if its class has one.
    ///
    /// Unclassified discovery errors are log-only.
    pub fn notice(&self) -> Option<Notice> {
        match self {
            ScanError::PermissionDenied => Some(Notice::new(
                "Permission required",
                "Bluetooth permissions are required to scan for devices.",
            )),
            ScanError::AdapterUnusable(state) => Some(Notice::new(
                "Bluetooth unavailable",
                format!("Bluetooth is not ready (state: {state}). Turn it on and try again."),
            )),
            ScanError::Discovery(BleError::Unauthorized) => Some(Notice::new(
                "Bluetooth unauthorized",
                "This app is not authorized to use Bluetooth. Check the app permissions.",
            )),
            ScanError::Discovery(BleError::LocationServicesDisabled) => Some(Notice::new(
                "Location services disabled",
                "Location services must be enabled to scan for Bluetooth devices.",
            )),
            ScanError::Discovery(_) => None,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("scanner is not running")]
pub struct ScannerClosed;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine the configuration directory")]
    NoConfigDir,

    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_error_display() {
        assert_eq!(
            ScanError::PermissionDenied.to_string(),
            "Bluetooth permissions were not granted"
        );
        assert_eq!(
            ScanError::AdapterUnusable(AdapterState::PoweredOff).to_string(),
            "Bluetooth adapter is not usable: PoweredOff"
        );
        assert_eq!(
            ScanError::Discovery(BleError::Other("boom".to_string())).to_string(),
            "discovery failed: boom"
        );
    }

    #[test]
    fn test_notice_classification() {
        assert!(ScanError::PermissionDenied.notice().is_some());
        assert!(ScanError::Discovery(BleError::Unauthorized).notice().is_some());
        assert!(ScanError::Discovery(BleError::LocationServicesDisabled)
            .notice()
            .is_some());
        assert!(ScanError::Discovery(BleError::Other("x".into())).notice().is_none());
        assert!(ScanError::Discovery(BleError::NoAdapter).notice().is_none());
    }

    #[test]
    fn test_adapter_notice_names_state() {
        let notice = ScanError::AdapterUnusable(AdapterState::Unauthorized)
            .notice()
            .unwrap();
        assert!(notice.message.contains("Unauthorized"));
    }
}
