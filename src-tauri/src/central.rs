//! btleplug-backed [`BleBackend`] for Mac/Linux/Windows.

use std::collections::HashSet;
use std::future::{self, Future};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use btleplug::api::{Central, CentralEvent, CentralState, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, PeripheralId};
use futures::stream::{self, Stream, StreamExt};
use uuid::Uuid;

use crate::adapter::{
    AdapterState, BleBackend, DeviceEvent, DiscoveryStream, ScanOptions, StateStream,
};
use crate::error::BleError;

pub struct BtleplugBackend {
    // Taken on destroy; the platform handle is released when dropped.
    adapter: Mutex<Option<Adapter>>,
}

impl BtleplugBackend {
    pub async fn acquire() -> Result<Self, BleError> {
        let manager = Manager::new().await.map_err(classify)?;
        let adapters = manager.adapters().await.map_err(classify)?;
        let adapter = adapters.into_iter().next().ok_or(BleError::NoAdapter)?;
        match adapter.adapter_info().await {
            Ok(info) => log::info!("using Bluetooth adapter {info}"),
            Err(e) => log::debug!("adapter info unavailable: {e}"),
        }
        Ok(Self {
            adapter: Mutex::new(Some(adapter)),
        })
    }

    fn adapter(&self) -> Result<Adapter, BleError> {
        self.adapter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(BleError::Released)
    }
}

fn map_state(state: CentralState) -> AdapterState {
    #[allow(unreachable_patterns)]
    match state {
        CentralState::PoweredOn => AdapterState::PoweredOn,
        CentralState::PoweredOff => AdapterState::PoweredOff,
        CentralState::Unknown => AdapterState::Unknown,
        _ => AdapterState::Unknown,
    }
}

/// Maps platform errors onto the classes the scanner reacts to.
///
/// btleplug has no dedicated location-services error; platforms that need
/// it (Android) report it in the message text.
pub(crate) fn classify(error: btleplug::Error) -> BleError {
    match error {
        btleplug::Error::PermissionDenied => BleError::Unauthorized,
        other => {
            let message = other.to_string();
            if message.to_lowercase().contains("location") {
                BleError::LocationServicesDisabled
            } else {
                BleError::Other(message)
            }
        }
    }
}

async fn describe(adapter: Adapter, id: PeripheralId) -> Result<DeviceEvent, BleError> {
    let peripheral = adapter.peripheral(&id).await.map_err(classify)?;
    let properties = peripheral.properties().await.map_err(classify)?;
    let (name, rssi) = match properties {
        Some(props) => (props.local_name, props.rssi),
        None => (None, None),
    };
    Ok(DeviceEvent {
        id: peripheral.id().to_string(),
        name,
        rssi,
    })
}

/// Turns peripheral ids into one discovery stream per scan.
///
/// A peripheral already known to the adapter from an earlier scan comes back
/// as an update, not a discovery, so both count and repeats are dropped per
/// stream. A peripheral that vanished before it could be described is
/// skipped; it is not a scan failure.
fn sightings<I, S, F, Fut>(ids: S, options: ScanOptions, describe: F) -> DiscoveryStream
where
    S: Stream<Item = I> + Send + 'static,
    F: Fn(I) -> Fut + Send + 'static,
    Fut: Future<Output = Result<DeviceEvent, BleError>> + Send + 'static,
{
    let mut seen = HashSet::new();
    ids.then(describe)
        .filter_map(|described| {
            future::ready(match described {
                Ok(event) => Some(event),
                Err(e) => {
                    log::debug!("skipping peripheral: {e}");
                    None
                }
            })
        })
        .filter(move |event| {
            future::ready(options.allow_duplicates || seen.insert(event.id.clone()))
        })
        .map(Ok)
        .boxed()
}

#[async_trait]
impl BleBackend for BtleplugBackend {
    async fn adapter_states(&self, emit_current: bool) -> Result<StateStream, BleError> {
        let adapter = self.adapter()?;
        let updates = adapter
            .events()
            .await
            .map_err(classify)?
            .filter_map(|event| async move {
                match event {
                    CentralEvent::StateUpdate(state) => Some(map_state(state)),
                    _ => None,
                }
            });

        if !emit_current {
            return Ok(updates.boxed());
        }
        let current = map_state(adapter.adapter_state().await.map_err(classify)?);
        Ok(stream::once(async move { current }).chain(updates).boxed())
    }

    async fn start_discovery(
        &self,
        services: &[Uuid],
        options: ScanOptions,
    ) -> Result<DiscoveryStream, BleError> {
        let adapter = self.adapter()?;
        let events = adapter.events().await.map_err(classify)?;
        adapter
            .start_scan(ScanFilter {
                services: services.to_vec(),
            })
            .await
            .map_err(classify)?;

        let peripherals = events.filter_map(|event| {
            future::ready(match event {
                CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => Some(id),
                _ => None,
            })
        });
        Ok(sightings(peripherals, options, move |id| describe(adapter.clone(), id)))
    }

    async fn stop_discovery(&self) -> Result<(), BleError> {
        self.adapter()?.stop_scan().await.map_err(classify)
    }

    async fn destroy(&self) -> Result<(), BleError> {
        let adapter = self
            .adapter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(BleError::Released)?;
        // The platform scan is not tied to the handle's lifetime.
        if let Err(e) = adapter.stop_scan().await {
            log::debug!("stop_scan on release: {e}");
        }
        Ok(())
    }
}
