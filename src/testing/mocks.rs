use crate::adb::runner::CommandRunner;
use crate::adb::session::{SessionLauncher, ShellSession};
use crate::core::types::{CommandInvocation, CommandResult};
use crate::error::{Result, ToolkitError};
use crate::output::LogSink;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Queued outcome for one command: `None` simulates a spawn failure
type Outcome = Option<CommandResult>;

/// Command runner that replays scripted output and records every call.
///
/// Responses are keyed by the command text (without the `-s` prefix).
/// Queued responses are consumed first, then the sticky one, then an empty
/// successful result.
#[derive(Default)]
pub struct ScriptedRunner {
    queued: Mutex<HashMap<String, VecDeque<Outcome>>>,
    sticky: Mutex<HashMap<String, CommandResult>>,
    calls: Mutex<Vec<CommandInvocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `command` with `stdout`
    pub fn with_response(self, command: &str, stdout: &str) -> Self {
        self.sticky
            .lock()
            .unwrap()
            .insert(command.to_string(), CommandResult::new(stdout, "", Some(0)));
        self
    }

    pub fn with_result(self, command: &str, result: CommandResult) -> Self {
        self.sticky
            .lock()
            .unwrap()
            .insert(command.to_string(), result);
        self
    }

    /// Answer the next call to `command` with `stdout`
    pub fn push_response(self, command: &str, stdout: &str) -> Self {
        self.push(command, Some(CommandResult::new(stdout, "", Some(0))))
    }

    /// Fail the next call to `command` as if the binary were missing
    pub fn push_failure(self, command: &str) -> Self {
        self.push(command, None)
    }

    fn push(self, command: &str, outcome: Outcome) -> Self {
        self.queued
            .lock()
            .unwrap()
            .entry(command.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    pub fn calls(&self) -> Vec<CommandInvocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, command: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|inv| inv.command == command)
            .count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, invocation: &CommandInvocation) -> Result<CommandResult> {
        self.calls.lock().unwrap().push(invocation.clone());

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&invocation.command)
            .and_then(|q| q.pop_front());

        let outcome = match queued {
            Some(outcome) => outcome,
            None => Some(
                self.sticky
                    .lock()
                    .unwrap()
                    .get(&invocation.command)
                    .cloned()
                    .unwrap_or_else(|| CommandResult::new("", "", Some(0))),
            ),
        };

        outcome.ok_or_else(|| ToolkitError::Spawn {
            program: "adb".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted failure"),
        })
    }
}

/// Shared counters for sessions handed out by [`RecordingLauncher`]
#[derive(Debug, Default)]
pub struct SessionCounters {
    pub launches: AtomicUsize,
    pub stops: AtomicUsize,
    pub sent: Mutex<Vec<String>>,
    /// When set, sessions report that their child has exited
    pub exited: AtomicBool,
}

impl SessionCounters {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

/// Launcher that hands out in-memory sessions and counts what happens to them
#[derive(Default)]
pub struct RecordingLauncher {
    pub counters: Arc<SessionCounters>,
    fail: bool,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every launch fails with a spawn error
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

struct RecordingSession {
    counters: Arc<SessionCounters>,
    running: bool,
}

#[async_trait]
impl ShellSession for RecordingSession {
    async fn send(&mut self, line: &str) -> Result<()> {
        if !self.is_running() {
            return Err(ToolkitError::misuse("shell is not running"));
        }
        self.counters.sent.lock().unwrap().push(line.to_string());
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if self.running {
            self.running = false;
            self.counters.stops.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_running(&mut self) -> bool {
        self.running && !self.counters.exited.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionLauncher for RecordingLauncher {
    async fn launch(&self, _sink: LogSink) -> Result<Box<dyn ShellSession>> {
        if self.fail {
            return Err(ToolkitError::Spawn {
                program: "adb".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted failure"),
            });
        }
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingSession {
            counters: Arc::clone(&self.counters),
            running: true,
        }))
    }
}
