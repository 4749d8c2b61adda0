//! In-process stand-ins for the BLE stack, the permission dialog and the
//! screen. Used by the test suites and for running the scanner headless.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::stream::StreamExt;
use uuid::Uuid;

use crate::adapter::{
    AdapterState, BleBackend, DeviceEvent, DiscoveryStream, ScanOptions, StateStream,
};
use crate::error::BleError;
use crate::notice::{Notice, Presenter, UiEvent};
use crate::permissions::{Permission, PermissionOutcome, PermissionRequester, Rationale};

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn mock_device(id: &str, name: Option<&str>, rssi: i16) -> DeviceEvent {
    DeviceEvent {
        id: id.to_string(),
        name: name.map(str::to_string),
        rssi: Some(rssi),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MockCalls {
    pub start_discovery: usize,
    pub stop_discovery: usize,
    pub destroy: usize,
    pub last_services: Vec<Uuid>,
    pub last_options: Option<ScanOptions>,
}

#[derive(Debug)]
struct MockInner {
    state: AdapterState,
    state_subscribers: Vec<mpsc::UnboundedSender<AdapterState>>,
    // Kept after stop_discovery so tests can push late deliveries.
    discovery: Option<mpsc::UnboundedSender<Result<DeviceEvent, BleError>>>,
    discovering: bool,
    destroyed: bool,
    start_failure: Option<BleError>,
    calls: MockCalls,
}

#[derive(Clone, Debug)]
pub struct MockBleBackend {
    inner: Arc<Mutex<MockInner>>,
}

impl MockBleBackend {
    pub fn new(state: AdapterState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockInner {
                state,
                state_subscribers: Vec::new(),
                discovery: None,
                discovering: false,
                destroyed: false,
                start_failure: None,
                calls: MockCalls::default(),
            })),
        }
    }

    pub fn powered_on() -> Self {
        Self::new(AdapterState::PoweredOn)
    }

    pub fn set_state(&self, state: AdapterState) {
        let mut inner = locked(&self.inner);
        inner.state = state;
        inner
            .state_subscribers
            .retain(|tx| tx.unbounded_send(state).is_ok());
    }

    /// Delivers a sighting on the most recent discovery stream. Returns false
    /// if no stream was ever opened or the receiver is gone.
    pub fn discover(&self, device: DeviceEvent) -> bool {
        self.deliver(Ok(device))
    }

    pub fn fail_discovery(&self, error: BleError) -> bool {
        self.deliver(Err(error))
    }

    pub fn fail_next_start(&self, error: BleError) {
        locked(&self.inner).start_failure = Some(error);
    }

    pub fn calls(&self) -> MockCalls {
        locked(&self.inner).calls.clone()
    }

    pub fn is_discovering(&self) -> bool {
        locked(&self.inner).discovering
    }

    pub fn is_destroyed(&self) -> bool {
        locked(&self.inner).destroyed
    }

    fn deliver(&self, item: Result<DeviceEvent, BleError>) -> bool {
        match &locked(&self.inner).discovery {
            Some(tx) => tx.unbounded_send(item).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl BleBackend for MockBleBackend {
    async fn adapter_states(&self, emit_current: bool) -> Result<StateStream, BleError> {
        let mut inner = locked(&self.inner);
        if inner.destroyed {
            return Err(BleError::Released);
        }
        let (tx, rx) = mpsc::unbounded();
        if emit_current {
            let _ = tx.unbounded_send(inner.state);
        }
        inner.state_subscribers.push(tx);
        Ok(rx.boxed())
    }

    async fn start_discovery(
        &self,
        services: &[Uuid],
        options: ScanOptions,
    ) -> Result<DiscoveryStream, BleError> {
        let mut inner = locked(&self.inner);
        inner.calls.start_discovery += 1;
        inner.calls.last_services = services.to_vec();
        inner.calls.last_options = Some(options);
        if inner.destroyed {
            return Err(BleError::Released);
        }
        if let Some(error) = inner.start_failure.take() {
            return Err(error);
        }
        let (tx, rx) = mpsc::unbounded();
        inner.discovery = Some(tx);
        inner.discovering = true;
        Ok(rx.boxed())
    }

    async fn stop_discovery(&self) -> Result<(), BleError> {
        let mut inner = locked(&self.inner);
        inner.calls.stop_discovery += 1;
        inner.discovering = false;
        Ok(())
    }

    async fn destroy(&self) -> Result<(), BleError> {
        let mut inner = locked(&self.inner);
        inner.calls.destroy += 1;
        if inner.destroyed {
            return Err(BleError::Released);
        }
        inner.destroyed = true;
        inner.discovering = false;
        inner.state_subscribers.clear();
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct MockPermissions {
    outcome: PermissionOutcome,
    asked: Arc<Mutex<Vec<Permission>>>,
}

impl MockPermissions {
    pub fn new(outcome: PermissionOutcome) -> Self {
        Self {
            outcome,
            asked: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn granting() -> Self {
        Self::new(PermissionOutcome::Granted)
    }

    pub fn denying() -> Self {
        Self::new(PermissionOutcome::Denied)
    }

    pub fn asked(&self) -> Vec<Permission> {
        locked(&self.asked).clone()
    }
}

#[async_trait]
impl PermissionRequester for MockPermissions {
    async fn request(&self, permission: Permission, _rationale: Rationale) -> PermissionOutcome {
        locked(&self.asked).push(permission);
        self.outcome
    }
}

#[derive(Clone, Debug, Default)]
pub struct RecordingPresenter {
    events: Arc<Mutex<Vec<UiEvent>>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<UiEvent> {
        locked(&self.events).clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        locked(&self.events)
            .iter()
            .filter_map(|event| match event {
                UiEvent::Notice(notice) => Some(notice.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Presenter for RecordingPresenter {
    fn present(&self, event: UiEvent) {
        locked(&self.events).push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_current_comes_first() {
        let backend = MockBleBackend::powered_on();
        let mut states = backend.adapter_states(true).await.unwrap();
        backend.set_state(AdapterState::PoweredOff);

        assert_eq!(states.next().await, Some(AdapterState::PoweredOn));
        assert_eq!(states.next().await, Some(AdapterState::PoweredOff));
    }

    #[tokio::test]
    async fn test_start_failure_is_one_shot() {
        let backend = MockBleBackend::powered_on();
        backend.fail_next_start(BleError::Unauthorized);

        assert!(backend
            .start_discovery(&[], ScanOptions::default())
            .await
            .is_err());
        assert!(backend
            .start_discovery(&[], ScanOptions::default())
            .await
            .is_ok());
        assert_eq!(backend.calls().start_discovery, 2);
    }

    #[tokio::test]
    async fn test_destroy_twice_reports_released() {
        let backend = MockBleBackend::powered_on();
        assert!(backend.destroy().await.is_ok());
        assert_eq!(backend.destroy().await, Err(BleError::Released));
    }
}
