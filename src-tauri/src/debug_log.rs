//! Append-only diagnostic log shown under the device list.

use chrono::{DateTime, Local};
use serde::Serialize;

/// Format used for the time column; the locale's time representation.
const TIME_FORMAT: &str = "%X";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
}

impl LogEntry {
    pub fn time_string(&self) -> String {
        self.timestamp.format(TIME_FORMAT).to_string()
    }
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.time_string(), self.message)
    }
}

/// Time-stamped log lines in append order. Bounded only by memory.
#[derive(Clone, Debug, Default)]
pub struct LogSink {
    entries: Vec<LogEntry>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: impl Into<String>) -> &LogEntry {
        let entry = LogEntry {
            timestamp: Local::now(),
            message: message.into(),
        };
        log::info!("{}", entry.message);
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn latest_first(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, message: &str) -> bool {
        self.entries.iter().any(|e| e.message == message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_order() {
        let mut sink = LogSink::new();
        sink.append("first");
        sink.append("second");

        let messages: Vec<&str> = sink.entries().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);

        let reversed: Vec<&str> = sink.latest_first().map(|e| e.message.as_str()).collect();
        assert_eq!(reversed, vec!["second", "first"]);
        // Reading latest-first does not reorder storage.
        assert_eq!(sink.entries()[0].message, "first");
    }

    #[test]
    fn test_timestamps_are_monotonic() {
        let mut sink = LogSink::new();
        sink.append("a");
        sink.append("b");
        assert!(sink.entries()[0].timestamp <= sink.entries()[1].timestamp);
    }

    #[test]
    fn test_display_prefixes_time() {
        let mut sink = LogSink::new();
        let line = sink.append("Scan started").to_string();
        assert!(line.ends_with(": Scan started"));
        assert!(line.len() > ": Scan started".len());
    }
}
