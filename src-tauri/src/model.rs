use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::adapter::DeviceEvent;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub id: String,
    pub name: Option<String>,
    pub rssi: Option<i16>,
}

impl DeviceSummary {
    /// Name if advertised, otherwise the id.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

impl From<DeviceEvent> for DeviceSummary {
    fn from(event: DeviceEvent) -> Self {
        Self {
            id: event.id,
            name: event.name,
            rssi: event.rssi,
        }
    }
}

/// Discovered devices in discovery order, at most one entry per id.
#[derive(Clone, Debug, Default)]
pub struct DeviceList {
    devices: Vec<DeviceSummary>,
    seen: HashSet<String>,
}

impl DeviceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `device` unless its id is already listed. First sighting wins.
    pub fn insert(&mut self, device: DeviceSummary) -> bool {
        if !self.seen.insert(device.id.clone()) {
            return false;
        }
        self.devices.push(device);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn clear(&mut self) {
        self.devices.clear();
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn as_slice(&self) -> &[DeviceSummary] {
        &self.devices
    }

    pub fn to_vec(&self) -> Vec<DeviceSummary> {
        self.devices.clone()
    }
}
