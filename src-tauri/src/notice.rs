//! What the scanner tells the screen.

use serde::Serialize;

use crate::adapter::AdapterState;
use crate::debug_log::LogEntry;
use crate::model::DeviceSummary;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum UiEvent {
    AdapterState(AdapterState),
    Scanning(bool),
    Devices(Vec<DeviceSummary>),
    Log(LogEntry),
    Notice(Notice),
}

impl UiEvent {
    /// Event name used on the desktop event bus.
    pub fn name(&self) -> &'static str {
        match self {
            UiEvent::AdapterState(_) => "adapter-state",
            UiEvent::Scanning(_) => "scanning",
            UiEvent::Devices(_) => "devices",
            UiEvent::Log(_) => "log",
            UiEvent::Notice(_) => "notice",
        }
    }
}

/// Rendering side of the scanner. Called only from the dispatcher task.
pub trait Presenter: Send + Sync {
    fn present(&self, event: UiEvent);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn present(&self, _event: UiEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(UiEvent::Scanning(true).name(), "scanning");
        assert_eq!(
            UiEvent::Notice(Notice::new("a", "b")).name(),
            "notice"
        );
        assert_eq!(
            UiEvent::AdapterState(AdapterState::PoweredOn).name(),
            "adapter-state"
        );
    }

    #[test]
    fn test_event_serializes_tagged() {
        let json = serde_json::to_value(UiEvent::Scanning(false)).unwrap();
        assert_eq!(json["kind"], "scanning");
        assert_eq!(json["payload"], false);
    }
}
