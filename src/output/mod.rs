//! The log pane.
//!
//! Every producer (supervisor, poller, shell reader tasks) holds a cloned
//! [`LogSink`]; a single printer task owns the terminal and is the only
//! writer. Events from one producer keep their order.

use crate::core::types::LogLevel;
use chrono::{DateTime, Local};
use colored::*;
use log::debug;
use std::io::Write;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default capacity of the sink channel
pub const SINK_CAPACITY: usize = 256;

/// One line (or block) in the log pane
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

impl LogEvent {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            message: message.into(),
        }
    }
}

/// Producer handle for the log pane
#[derive(Debug, Clone)]
pub struct LogSink {
    tx: mpsc::Sender<LogEvent>,
}

impl LogSink {
    /// Create a sink and the receiver the printer drains
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<LogEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Append a message. Blank messages are dropped.
    pub async fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        if message.trim().is_empty() {
            return;
        }
        if self.tx.send(LogEvent::new(level, message)).await.is_err() {
            debug!("log sink closed, dropping event");
        }
    }

    pub async fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message).await
    }

    pub async fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message).await
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message).await
    }
}

/// Renders events as `[timestamp] [Level] message`
#[derive(Debug, Clone)]
pub struct LogFormatter {
    color_enabled: bool,
}

impl Default for LogFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl LogFormatter {
    pub fn new() -> Self {
        Self {
            color_enabled: true,
        }
    }

    pub fn with_color(mut self, enabled: bool) -> Self {
        self.color_enabled = enabled;
        self
    }

    pub fn format(&self, event: &LogEvent) -> String {
        let timestamp = event.timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
        let level = format!("[{}]", event.level);

        if !self.color_enabled {
            return format!("[{}] {} {}", timestamp, level, event.message);
        }

        let level = match event.level {
            LogLevel::Info => level.bright_blue(),
            LogLevel::Warning => level.bright_yellow(),
            LogLevel::Error => level.bright_red(),
        };
        format!("[{}] {} {}", timestamp.dimmed(), level, event.message)
    }
}

/// Drain events into `writer` until every sink has been dropped
pub async fn run_printer<W: Write>(
    mut rx: mpsc::Receiver<LogEvent>,
    formatter: LogFormatter,
    mut writer: W,
) {
    while let Some(event) = rx.recv().await {
        if writeln!(writer, "{}", formatter.format(&event)).is_err() {
            break;
        }
        let _ = writer.flush();
    }
    debug!("log printer finished");
}

/// Spawn the printer task that owns stdout
pub fn spawn_printer(rx: mpsc::Receiver<LogEvent>, formatter: LogFormatter) -> JoinHandle<()> {
    tokio::spawn(run_printer(rx, formatter, std::io::stdout()))
}
