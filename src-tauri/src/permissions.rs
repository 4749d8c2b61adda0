//! Runtime permissions needed before a scan.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// First Android API level with dedicated Bluetooth scan/connect permissions (Android 12).
pub const BLUETOOTH_PERMISSIONS_API_LEVEL: u32 = 31;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    Android { api_level: u32 },
    Ios,
    Desktop,
}

impl Platform {
    /// Host platform for builds without a runtime permission bridge.
    pub fn current() -> Self {
        if cfg!(target_os = "ios") {
            Platform::Ios
        } else {
            Platform::Desktop
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Permission {
    BluetoothScan,
    BluetoothConnect,
    AccessFineLocation,
}

impl Permission {
    pub fn android_name(self) -> &'static str {
        match self {
            Permission::BluetoothScan => "android.permission.BLUETOOTH_SCAN",
            Permission::BluetoothConnect => "android.permission.BLUETOOTH_CONNECT",
            Permission::AccessFineLocation => "android.permission.ACCESS_FINE_LOCATION",
        }
    }

    pub fn rationale(self) -> Rationale {
        let (title, message) = match self {
            Permission::BluetoothScan => (
                "Bluetooth Scan Permission",
                "This app needs access to scan for Bluetooth devices.",
            ),
            Permission::BluetoothConnect => (
                "Bluetooth Connect Permission",
                "This app needs access to connect to Bluetooth devices.",
            ),
            Permission::AccessFineLocation => (
                "Location Permission",
                "This app needs access to your location to scan for Bluetooth devices.",
            ),
        };
        Rationale {
            title,
            message,
            button_neutral: "Ask Me Later",
            button_negative: "Cancel",
            button_positive: "OK",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rationale {
    pub title: &'static str,
    pub message: &'static str,
    pub button_neutral: &'static str,
    pub button_negative: &'static str,
    pub button_positive: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionOutcome {
    Granted,
    Denied,
    NeverAskAgain,
}

#[async_trait]
pub trait PermissionRequester: Send + Sync {
    async fn request(&self, permission: Permission, rationale: Rationale) -> PermissionOutcome;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StaticManifest;

#[async_trait]
impl PermissionRequester for StaticManifest {
    async fn request(&self, _permission: Permission, _rationale: Rationale) -> PermissionOutcome {
        PermissionOutcome::Granted
    }
}

pub struct PermissionGate {
    platform: Platform,
    requester: Box<dyn PermissionRequester>,
}

impl PermissionGate {
    pub fn new(platform: Platform, requester: impl PermissionRequester + 'static) -> Self {
        Self {
            platform,
            requester: Box::new(requester),
        }
    }

    /// Runtime permissions this platform must grant before scanning.
    pub fn required(&self) -> Vec<Permission> {
        match self.platform {
            Platform::Android { api_level } if api_level >= BLUETOOTH_PERMISSIONS_API_LEVEL => {
                vec![Permission::BluetoothScan, Permission::BluetoothConnect]
            }
            Platform::Android { .. } => vec![Permission::AccessFineLocation],
            Platform::Ios | Platform::Desktop => Vec::new(),
        }
    }

    /// Requests every required permission once. True only if all are granted.
    pub async fn request_permissions(&self) -> bool {
        let mut granted = true;
        for permission in self.required() {
            let outcome = self.requester.request(permission, permission.rationale()).await;
            log::debug!("{} -> {:?}", permission.android_name(), outcome);
            granted &= outcome == PermissionOutcome::Granted;
        }
        granted
    }
}
