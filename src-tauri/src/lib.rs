pub mod adapter;
pub mod ble_mock;
#[cfg(feature = "ble-central")]
pub mod central;
pub mod config;
pub mod debug_log;
pub mod error;
pub mod model;
pub mod notice;
pub mod permissions;
pub mod scanner;

pub use adapter::{AdapterState, BleBackend, DeviceEvent, ScanOptions, Subscription, UnsupportedBackend};
#[cfg(feature = "ble-central")]
pub use central::BtleplugBackend;
pub use config::AppConfig;
pub use debug_log::{LogEntry, LogSink};
pub use error::{BleError, ConfigError, ScanError, ScannerClosed};
pub use model::{DeviceList, DeviceSummary};
pub use notice::{Notice, NullPresenter, Presenter, UiEvent};
pub use permissions::{PermissionGate, Platform};
pub use scanner::{ScanController, ScannerHandle, Snapshot, StartOutcome};
