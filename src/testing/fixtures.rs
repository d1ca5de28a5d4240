//! Canned adb output and log helpers for tests

use crate::core::types::LogLevel;
use crate::output::LogEvent;
use tokio::sync::mpsc;

pub const DEVICES_NONE: &str = "List of devices attached\n\n";

pub const DEVICES_ONE: &str = "List of devices attached\nemulator-5554\tdevice\n\n";

pub const DEVICES_TWO: &str = "List of devices attached\nR58M123ABC\tdevice\nemulator-5554\tdevice\n\n";

pub const DEVICES_DAEMON_STARTING: &str = "* daemon not running; starting now at tcp:5037\n* daemon started successfully\nList of devices attached\nemulator-5554\tdevice\n";

/// Take every event currently queued in the sink
pub fn drain(rx: &mut mpsc::Receiver<LogEvent>) -> Vec<LogEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn messages(events: &[LogEvent]) -> Vec<&str> {
    events.iter().map(|e| e.message.as_str()).collect()
}

pub fn count_at(events: &[LogEvent], level: LogLevel) -> usize {
    events.iter().filter(|e| e.level == level).count()
}

pub fn contains(events: &[LogEvent], needle: &str) -> bool {
    events.iter().any(|e| e.message.contains(needle))
}
