#![cfg_attr(target_os = "windows", windows_subsystem = "windows")]
mod bluetooth;
mod state;

use ble_scanner::config::{config_path, load_or_init, save_to};
use ble_scanner::permissions::StaticManifest;
use ble_scanner::{
    AppConfig, BtleplugBackend, PermissionGate, Platform, ScannerHandle, UnsupportedBackend,
};
use bluetooth::WindowPresenter;
use state::ScannerState;
use tauri::{Manager, RunEvent};

/// Takes effect on the next launch.
#[tauri::command]
async fn save_config(config: AppConfig) -> Result<(), String> {
    let path = config_path().map_err(|e| e.to_string())?;
    save_to(&path, &config).map_err(|e| e.to_string())
}

#[tauri::command]
async fn load_config() -> Result<AppConfig, String> {
    let path = config_path().map_err(|e| e.to_string())?;
    load_or_init(&path).map_err(|e| e.to_string())
}

fn startup_config() -> AppConfig {
    match config_path().and_then(|path| load_or_init(&path)) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("using default config: {e}");
            AppConfig::default()
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = tauri::Builder::default()
        .setup(|app| {
            let config = startup_config();
            let presenter = WindowPresenter::new(app.handle().clone());
            let gate = PermissionGate::new(Platform::current(), StaticManifest);

            let handle = tauri::async_runtime::block_on(async move {
                match BtleplugBackend::acquire().await {
                    Ok(backend) => ScannerHandle::spawn(backend, gate, presenter, &config).0,
                    Err(e) => {
                        log::error!("Bluetooth unavailable: {e}");
                        ScannerHandle::spawn(UnsupportedBackend, gate, presenter, &config).0
                    }
                }
            });
            app.manage(ScannerState::new(handle));
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            bluetooth::start_scan,
            bluetooth::stop_scan,
            bluetooth::scanner_snapshot,
            save_config,
            load_config
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(|app_handle, event| {
        if let RunEvent::Exit = event {
            let state = app_handle.state::<ScannerState>();
            tauri::async_runtime::block_on(state.handle.shutdown());
        }
    });
}
