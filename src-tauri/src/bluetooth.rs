use ble_scanner::{Presenter, Snapshot, StartOutcome, UiEvent};
use tauri::{AppHandle, Emitter, State};

use crate::state::ScannerState;

/// Forwards scanner updates to the webview as Tauri events.
pub struct WindowPresenter {
    app: AppHandle,
}

impl WindowPresenter {
    pub fn new(app: AppHandle) -> Self {
        WindowPresenter { app }
    }
}

impl Presenter for WindowPresenter {
    fn present(&self, event: UiEvent) {
        let name = event.name();
        let result = match event {
            UiEvent::AdapterState(state) => self.app.emit(name, state),
            UiEvent::Scanning(scanning) => self.app.emit(name, scanning),
            UiEvent::Devices(devices) => self.app.emit(name, devices),
            UiEvent::Log(entry) => self.app.emit(name, entry),
            UiEvent::Notice(notice) => self.app.emit(name, notice),
        };
        if let Err(e) = result {
            log::warn!("failed to emit {name}: {e}");
        }
    }
}

/// Returns true if a new scan started. Rejections are reported as notices.
#[tauri::command]
pub async fn start_scan(state: State<'_, ScannerState>) -> Result<bool, String> {
    let outcome = state.handle.start_scan().await.map_err(|e| e.to_string())?;
    Ok(outcome == StartOutcome::Started)
}

#[tauri::command]
pub async fn stop_scan(state: State<'_, ScannerState>) -> Result<bool, String> {
    state.handle.stop_scan().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn scanner_snapshot(state: State<'_, ScannerState>) -> Result<Snapshot, String> {
    state.handle.snapshot().await.map_err(|e| e.to_string())
}
