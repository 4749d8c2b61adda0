//! BLE backend abstraction.
//!
//! The scanner talks to the host Bluetooth stack only through [`BleBackend`].
//! Streams returned by the backend are forwarded into the dispatcher through
//! [`Subscription`]s, which are cancelled when a scan stops.

use std::fmt;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::BleError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdapterState {
    Unknown,
    Resetting,
    Unsupported,
    Unauthorized,
    PoweredOff,
    PoweredOn,
}

impl AdapterState {
    pub fn is_usable(self) -> bool {
        self == AdapterState::PoweredOn
    }
}

impl fmt::Display for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdapterState::Unknown => "Unknown",
            AdapterState::Resetting => "Resetting",
            AdapterState::Unsupported => "Unsupported",
            AdapterState::Unauthorized => "Unauthorized",
            AdapterState::PoweredOff => "PoweredOff",
            AdapterState::PoweredOn => "PoweredOn",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceEvent {
    pub id: String,
    pub name: Option<String>,
    pub rssi: Option<i16>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Report every advertisement instead of once per device.
    pub allow_duplicates: bool,
}

pub type StateStream = BoxStream<'static, AdapterState>;
pub type DiscoveryStream = BoxStream<'static, Result<DeviceEvent, BleError>>;

#[async_trait]
pub trait BleBackend: Send + Sync {
    /// Adapter state changes. With `emit_current`, the first item is the
    /// state at the time of the call.
    async fn adapter_states(&self, emit_current: bool) -> Result<StateStream, BleError>;

    /// Starts continuous discovery. An empty `services` list means no filter.
    async fn start_discovery(
        &self,
        services: &[Uuid],
        options: ScanOptions,
    ) -> Result<DiscoveryStream, BleError>;

    async fn stop_discovery(&self) -> Result<(), BleError>;

    /// Releases the adapter. Called at most once by the scanner.
    async fn destroy(&self) -> Result<(), BleError>;
}

/// Backend for hosts without a Bluetooth adapter: reports `Unsupported`
/// and refuses to scan.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnsupportedBackend;

#[async_trait]
impl BleBackend for UnsupportedBackend {
    async fn adapter_states(&self, emit_current: bool) -> Result<StateStream, BleError> {
        if emit_current {
            Ok(stream::once(async { AdapterState::Unsupported }).boxed())
        } else {
            Ok(stream::empty().boxed())
        }
    }

    async fn start_discovery(
        &self,
        _services: &[Uuid],
        _options: ScanOptions,
    ) -> Result<DiscoveryStream, BleError> {
        Err(BleError::NoAdapter)
    }

    async fn stop_discovery(&self) -> Result<(), BleError> {
        Ok(())
    }

    async fn destroy(&self) -> Result<(), BleError> {
        Ok(())
    }
}

/// A running forwarder from a backend stream into the dispatcher inbox.
///
/// Cancelling (or dropping) the subscription aborts the forwarder, so
/// nothing it has not yet delivered reaches the inbox afterwards.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn forward<T, M, F>(
        mut stream: BoxStream<'static, T>,
        inbox: mpsc::UnboundedSender<M>,
        wrap: F,
    ) -> Self
    where
        T: Send + 'static,
        M: Send + 'static,
        F: Fn(T) -> M + Send + 'static,
    {
        let task = tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                if inbox.send(wrap(item)).is_err() {
                    break;
                }
            }
        });
        Self { task }
    }

    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display_matches_variant() {
        assert_eq!(AdapterState::PoweredOn.to_string(), "PoweredOn");
        assert_eq!(AdapterState::PoweredOff.to_string(), "PoweredOff");
        assert_eq!(AdapterState::Resetting.to_string(), "Resetting");
    }

    #[test]
    fn test_only_powered_on_is_usable() {
        assert!(AdapterState::PoweredOn.is_usable());
        for state in [
            AdapterState::Unknown,
            AdapterState::Resetting,
            AdapterState::Unsupported,
            AdapterState::Unauthorized,
            AdapterState::PoweredOff,
        ] {
            assert!(!state.is_usable(), "{state} should not be usable");
        }
    }

    #[tokio::test]
    async fn test_unsupported_backend() {
        let backend = UnsupportedBackend;
        let states: Vec<_> = backend.adapter_states(true).await.unwrap().collect().await;
        assert_eq!(states, vec![AdapterState::Unsupported]);
        assert!(matches!(
            backend.start_discovery(&[], ScanOptions::default()).await,
            Err(BleError::NoAdapter)
        ));
    }

    #[tokio::test]
    async fn test_forward_wraps_items() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let source = stream::iter(vec![1u8, 2, 3]).boxed();
        let _sub = Subscription::forward(source, tx, |n| n * 10);

        assert_eq!(rx.recv().await, Some(10));
        assert_eq!(rx.recv().await, Some(20));
        assert_eq!(rx.recv().await, Some(30));
        // Stream exhausted, forwarder dropped its sender.
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_cancel_stops_delivery() {
        let (tx, mut rx) = mpsc::unbounded_channel::<u8>();
        let source = stream::pending::<u8>().boxed();
        let sub = Subscription::forward(source, tx, |n| n);
        sub.cancel();
        // The aborted forwarder drops its sender, closing the channel.
        assert_eq!(rx.recv().await, None);
    }
}
