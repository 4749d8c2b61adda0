//! Scan lifecycle: permissions, adapter state, timed discovery.
//!
//! [`ScanController`] is owned by a single dispatcher task (see
//! [`handle`]) and is the only writer of the device list and the log.
//! Backend streams reach it as [`Input`]s tagged with the session they
//! belong to; anything tagged with a stale session is dropped.

pub mod handle;

use std::sync::Arc;

use chrono::{DateTime, Local};
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::adapter::{AdapterState, BleBackend, DeviceEvent, ScanOptions, Subscription};
use crate::config::AppConfig;
use crate::debug_log::{LogEntry, LogSink};
use crate::error::{BleError, ScanError};
use crate::model::{DeviceList, DeviceSummary};
use crate::notice::{Presenter, UiEvent};
use crate::permissions::PermissionGate;

pub use handle::ScannerHandle;

#[derive(Debug)]
pub(crate) enum Input {
    AdapterState(AdapterState),
    Discovery {
        session: u64,
        result: Result<DeviceEvent, BleError>,
    },
    AutoStop {
        session: u64,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyScanning,
    Rejected(ScanError),
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub adapter_state: AdapterState,
    pub scanning: bool,
    pub devices: Vec<DeviceSummary>,
    pub log: Vec<LogEntry>,
}

struct ScanSession {
    id: u64,
    started_at: DateTime<Local>,
    discovery: Option<Subscription>,
    timer: Option<JoinHandle<()>>,
}

impl ScanSession {
    fn cancel(self) {
        if let Some(discovery) = &self.discovery {
            discovery.cancel();
        }
        if let Some(timer) = &self.timer {
            timer.abort();
        }
    }
}

pub struct ScanController<B: BleBackend> {
    backend: Option<Arc<B>>,
    gate: PermissionGate,
    presenter: Box<dyn Presenter>,
    config: AppConfig,
    adapter_state: AdapterState,
    devices: DeviceList,
    log: LogSink,
    session: Option<ScanSession>,
    next_session: u64,
    monitor: Option<Subscription>,
    inbox: mpsc::UnboundedSender<Input>,
}

impl<B: BleBackend + 'static> ScanController<B> {
    pub(crate) fn new(
        backend: B,
        gate: PermissionGate,
        presenter: impl Presenter + 'static,
        config: &AppConfig,
        inbox: mpsc::UnboundedSender<Input>,
    ) -> Self {
        Self {
            backend: Some(Arc::new(backend)),
            gate,
            presenter: Box::new(presenter),
            config: config.clone(),
            adapter_state: AdapterState::Unknown,
            devices: DeviceList::new(),
            log: LogSink::new(),
            session: None,
            next_session: 1,
            monitor: None,
            inbox,
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.session.is_some()
    }

    pub fn adapter_state(&self) -> AdapterState {
        self.adapter_state
    }

    pub fn devices(&self) -> &DeviceList {
        &self.devices
    }

    pub fn log(&self) -> &LogSink {
        &self.log
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            adapter_state: self.adapter_state,
            scanning: self.is_scanning(),
            devices: self.devices.to_vec(),
            log: self.log.entries().to_vec(),
        }
    }

    /// Subscribes to adapter state with emit-current semantics.
    ///
    /// The current state is applied before returning, so it is always the
    /// first state the controller sees and precedes any queued command.
    pub(crate) async fn monitor_adapter(&mut self) {
        if self.monitor.is_some() {
            return;
        }
        let Some(backend) = self.backend.clone() else {
            log::warn!("adapter state requested after release");
            return;
        };
        match backend.adapter_states(true).await {
            Ok(mut states) => {
                if let Some(current) = states.next().await {
                    self.on_adapter_state(current).await;
                }
                self.monitor = Some(Subscription::forward(
                    states,
                    self.inbox.clone(),
                    Input::AdapterState,
                ));
            }
            Err(e) => self.append_log(format!("Failed to monitor adapter state: {e}")),
        }
    }

    pub(crate) async fn handle(&mut self, input: Input) {
        match input {
            Input::AdapterState(state) => self.on_adapter_state(state).await,
            Input::Discovery { session, result } => self.on_discovery(session, result).await,
            Input::AutoStop { session } => self.on_auto_stop(session).await,
        }
    }

    pub async fn start(&mut self) -> StartOutcome {
        if self.is_scanning() {
            self.append_log("Scan already in progress");
            return StartOutcome::AlreadyScanning;
        }

        if !self.gate.request_permissions().await {
            self.append_log("Bluetooth permissions not granted");
            return self.reject(ScanError::PermissionDenied);
        }

        if !self.adapter_state.is_usable() {
            self.append_log(format!("Cannot scan, adapter is {}", self.adapter_state));
            return self.reject(ScanError::AdapterUnusable(self.adapter_state));
        }

        let Some(backend) = self.backend.clone() else {
            self.append_log("Cannot scan, adapter released");
            return self.reject(ScanError::Discovery(BleError::Released));
        };

        self.devices.clear();
        self.presenter.present(UiEvent::Devices(Vec::new()));

        let id = self.next_session;
        self.next_session += 1;
        self.session = Some(ScanSession {
            id,
            started_at: Local::now(),
            discovery: None,
            timer: None,
        });
        self.presenter.present(UiEvent::Scanning(true));
        self.append_log("Scan started");

        let stream = match backend
            .start_discovery(&self.config.service_uuids, ScanOptions::default())
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                self.fail_session(e.clone()).await;
                return StartOutcome::Rejected(ScanError::Discovery(e));
            }
        };

        let discovery = Subscription::forward(stream, self.inbox.clone(), move |result| {
            Input::Discovery { session: id, result }
        });
        let timer = self.arm_timer(id);
        if let Some(session) = self.session.as_mut() {
            session.discovery = Some(discovery);
            session.timer = Some(timer);
        }
        StartOutcome::Started
    }

    /// Ends the current scan. Returns false if there was none.
    pub async fn stop(&mut self) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        let elapsed = Local::now() - session.started_at;
        session.cancel();
        self.stop_backend_discovery().await;
        self.presenter.present(UiEvent::Scanning(false));
        self.append_log("Scan stopped");
        log::debug!(
            "scan ran {}ms, {} devices",
            elapsed.num_milliseconds(),
            self.devices.len()
        );
        true
    }

    pub async fn shutdown(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.cancel();
        }
        self.stop().await;
        if let Some(backend) = self.backend.take() {
            match backend.destroy().await {
                Ok(()) => log::info!("Bluetooth adapter released"),
                Err(e) => log::warn!("failed to release Bluetooth adapter: {e}"),
            }
        }
    }

    async fn on_adapter_state(&mut self, state: AdapterState) {
        self.adapter_state = state;
        self.presenter.present(UiEvent::AdapterState(state));
        self.append_log(format!("BLE State changed: {state}"));

        if !state.is_usable() {
            self.stop().await;
            self.raise(&ScanError::AdapterUnusable(state));
        }
    }

    async fn on_discovery(&mut self, session: u64, result: Result<DeviceEvent, BleError>) {
        if !self.is_current(session) {
            log::debug!("dropping discovery result from stale session {session}");
            return;
        }
        match result {
            Err(e) => self.fail_session(e).await,
            Ok(event) => {
                if self.devices.contains(&event.id) {
                    return;
                }
                let device = DeviceSummary::from(event);
                let target = self
                    .config
                    .is_target(device.name.as_deref())
                    .then(|| device.label().to_string());
                self.append_log(format!("Found device: {} ({})", device.label(), device.id));
                self.devices.insert(device);
                self.presenter.present(UiEvent::Devices(self.devices.to_vec()));
                if let Some(label) = target {
                    self.append_log(format!("Target device found: {label}"));
                    self.stop().await;
                }
            }
        }
    }

    async fn on_auto_stop(&mut self, session: u64) {
        if self.is_current(session) {
            log::debug!("scan {session} reached its timeout");
            self.stop().await;
        }
    }

    /// Discovery failed: end the session without a restart.
    async fn fail_session(&mut self, error: BleError) {
        self.append_log(format!("Scan error: {error}"));
        if let Some(session) = self.session.take() {
            session.cancel();
            self.stop_backend_discovery().await;
            self.presenter.present(UiEvent::Scanning(false));
        }
        self.raise(&ScanError::Discovery(error));
    }

    async fn stop_backend_discovery(&self) {
        if let Some(backend) = &self.backend {
            if let Err(e) = backend.stop_discovery().await {
                log::warn!("stop_discovery failed: {e}");
            }
        }
    }

    fn arm_timer(&self, session: u64) -> JoinHandle<()> {
        let inbox = self.inbox.clone();
        let timeout = self.config.scan_timeout();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = inbox.send(Input::AutoStop { session });
        })
    }

    fn is_current(&self, session: u64) -> bool {
        self.session.as_ref().is_some_and(|s| s.id == session)
    }

    fn reject(&mut self, error: ScanError) -> StartOutcome {
        self.raise(&error);
        StartOutcome::Rejected(error)
    }

    fn raise(&self, error: &ScanError) {
        if let Some(notice) = error.notice() {
            log::warn!("{}: {}", notice.title, notice.message);
            self.presenter.present(UiEvent::Notice(notice));
        }
    }

    fn append_log(&mut self, message: impl Into<String>) {
        let entry = self.log.append(message).clone();
        self.presenter.present(UiEvent::Log(entry));
    }
}
