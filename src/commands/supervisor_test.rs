use crate::commands::supervisor::SessionSupervisor;
use crate::config::Config;
use crate::core::types::{CommandInvocation, CommandResult, LogLevel, SessionState};
use crate::output::{LogEvent, LogSink};
use crate::testing::fixtures::{self, drain};
use crate::testing::{RecordingLauncher, ScriptedRunner, SessionCounters};
use crate::workspace::ToolWorkspace;
use std::collections::HashMap;
use std::fs;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;

struct Harness {
    supervisor: SessionSupervisor<ScriptedRunner, RecordingLauncher>,
    runner: Arc<ScriptedRunner>,
    counters: Arc<SessionCounters>,
    rx: mpsc::Receiver<LogEvent>,
    _dir: TempDir,
}

impl Harness {
    fn events(&mut self) -> Vec<LogEvent> {
        drain(&mut self.rx)
    }
}

fn harness_with(runner: ScriptedRunner, launcher: RecordingLauncher) -> Harness {
    let dir = TempDir::new().unwrap();
    let mut workspace = ToolWorkspace::new(dir.path().join("droidkit"));
    workspace.create().unwrap();
    fs::write(workspace.adb_path(), b"binary").unwrap();

    let runner = Arc::new(runner);
    let counters = Arc::clone(&launcher.counters);
    let (sink, rx) = LogSink::channel(256);
    let supervisor = SessionSupervisor::new(Arc::clone(&runner), launcher, sink, workspace);

    Harness {
        supervisor,
        runner,
        counters,
        rx,
        _dir: dir,
    }
}

fn harness() -> Harness {
    harness_with(ScriptedRunner::new(), RecordingLauncher::new())
}

#[tokio::test]
async fn test_passthrough_runs_once_with_text() {
    let mut h = harness_with(
        ScriptedRunner::new().with_response("devices", fixtures::DEVICES_ONE),
        RecordingLauncher::new(),
    );

    h.supervisor.dispatch("  devices  ").await;

    assert_eq!(h.runner.calls(), vec![CommandInvocation::new("devices")]);
    let events = h.events();
    assert_eq!(events[0].message, "Executing command: devices");
    assert!(events[1].message.starts_with("Output:\nList of devices attached"));
    assert_eq!(fixtures::count_at(&events, LogLevel::Error), 0);
}

#[tokio::test]
async fn test_each_command_is_one_runner_call() {
    let mut h = harness();
    let commands = ["devices", "get-state", "shell ls /sdcard", "reboot bootloader"];

    for command in commands {
        h.supervisor.dispatch(command).await;
    }

    let seen: Vec<String> = h.runner.calls().into_iter().map(|inv| inv.command).collect();
    assert_eq!(seen, commands);
    assert_eq!(h.counters.launches(), 0);
    assert!(h.runner.calls().iter().all(|inv| inv.device.is_none()));
}

#[tokio::test]
async fn test_stderr_and_status_are_reported() {
    let mut h = harness_with(
        ScriptedRunner::new().with_result(
            "bogus",
            CommandResult::new("", "adb: unknown command bogus\n", Some(1)),
        ),
        RecordingLauncher::new(),
    );

    h.supervisor.dispatch("bogus").await;
    let events = h.events();

    let errors: Vec<_> = events.iter().filter(|e| e.level == LogLevel::Error).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Errors:\nadb: unknown command bogus");
    assert!(events
        .iter()
        .any(|e| e.level == LogLevel::Warning && e.message.contains("exited with status 1")));
    assert!(!fixtures::contains(&events, "Output:"));
}

#[tokio::test]
async fn test_spawn_failure_is_logged() {
    let mut h = harness_with(
        ScriptedRunner::new().push_failure("devices"),
        RecordingLauncher::new(),
    );

    h.supervisor.dispatch("devices").await;
    let events = h.events();

    assert!(fixtures::contains(&events, "Exception running command 'devices'"));
    assert!(!fixtures::contains(&events, "exited with status"));
    assert_eq!(h.supervisor.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_shell_starts_exactly_one_session() {
    let mut h = harness();

    h.supervisor.dispatch("shell").await;
    assert_eq!(h.supervisor.state(), SessionState::InteractiveShellActive);
    assert_eq!(h.counters.launches(), 1);

    // A second "shell" goes to the running shell as a line
    h.supervisor.dispatch("SHELL").await;
    assert_eq!(h.counters.launches(), 1);
    assert_eq!(h.counters.sent(), vec!["SHELL"]);

    h.supervisor.dispatch("ls /sdcard").await;
    assert_eq!(h.counters.sent(), vec!["SHELL", "ls /sdcard"]);
    assert!(h.runner.calls().is_empty());

    let events = h.events();
    assert!(fixtures::contains(&events, "Executing shell command: ls /sdcard"));
}

#[tokio::test]
async fn test_exit_stops_once_and_returns_to_idle() {
    let mut h = harness();

    h.supervisor.dispatch("shell").await;
    h.supervisor.dispatch("Exit").await;
    assert_eq!(h.supervisor.state(), SessionState::Idle);
    assert_eq!(h.counters.stops(), 1);
    assert!(h.counters.sent().is_empty());

    // Idle "exit" is just another adb command
    h.supervisor.dispatch("exit").await;
    assert_eq!(h.counters.stops(), 1);
    assert_eq!(h.runner.calls_to("exit"), 1);
}

#[tokio::test]
async fn test_idle_exit_keeps_typed_case() {
    let mut h = harness();

    h.supervisor.dispatch("  EXIT ").await;

    assert_eq!(h.runner.calls(), vec![CommandInvocation::new("EXIT")]);
    let events = h.events();
    assert_eq!(events[0].message, "Executing command: EXIT");
}

#[tokio::test]
async fn test_exit_logs_like_a_shell_command_first() {
    let mut h = harness();

    h.supervisor.dispatch("shell").await;
    h.events();
    h.supervisor.dispatch("Exit").await;

    let events = h.events();
    assert_eq!(
        fixtures::messages(&events),
        vec![
            "Executing shell command: Exit",
            "Exiting ADB shell and returning to normal mode.",
        ]
    );
}

#[tokio::test]
async fn test_info_runs_nothing() {
    let mut h = harness();

    h.supervisor.dispatch("info").await;
    h.supervisor.dispatch("shell").await;
    h.supervisor.dispatch("INFO").await;

    assert!(h.runner.calls().is_empty());
    assert!(h.counters.sent().is_empty());

    let root = h.supervisor.workspace().root().display().to_string();
    let events = h.events();
    assert!(events.iter().all(|e| e.level == LogLevel::Info));
    assert_eq!(
        events.iter().filter(|e| e.message.contains(&root)).count(),
        2
    );
}

#[tokio::test]
async fn test_empty_input_warns() {
    let mut h = harness();

    h.supervisor.dispatch("   ").await;
    h.supervisor.dispatch("shell").await;
    h.supervisor.dispatch("").await;

    assert!(h.runner.calls().is_empty());
    assert!(h.counters.sent().is_empty());
    let events = h.events();
    let warnings: Vec<_> = events
        .iter()
        .filter(|e| e.level == LogLevel::Warning)
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(
        warnings,
        vec!["Please enter an ADB command.", "Please enter an ADB command."]
    );
}

#[tokio::test]
async fn test_launch_failure_stays_idle() {
    let mut h = harness_with(ScriptedRunner::new(), RecordingLauncher::failing());

    h.supervisor.dispatch("shell").await;

    assert_eq!(h.supervisor.state(), SessionState::Idle);
    let events = h.events();
    assert!(events
        .iter()
        .any(|e| e.level == LogLevel::Error && e.message.starts_with("Exception starting ADB shell")));

    // Next input is a normal command again
    h.supervisor.dispatch("devices").await;
    assert_eq!(h.runner.calls_to("devices"), 1);
}

#[tokio::test]
async fn test_exited_shell_returns_to_idle() {
    let mut h = harness();

    h.supervisor.dispatch("shell").await;
    h.counters.exited.store(true, Ordering::SeqCst);
    h.supervisor.dispatch("ls").await;

    assert_eq!(h.supervisor.state(), SessionState::Idle);
    assert!(h.counters.sent().is_empty());
    assert_eq!(h.counters.stops(), 1);
    let events = h.events();
    assert!(events
        .iter()
        .any(|e| e.level == LogLevel::Warning && e.message.contains("ADB shell has exited")));
}

#[tokio::test]
async fn test_aliases_apply_only_when_idle() {
    let config = Config {
        alias: HashMap::from([
            ("ll".to_string(), "shell ls -l /sdcard".to_string()),
            ("sh".to_string(), "shell".to_string()),
        ]),
        ..Config::default()
    };
    let mut h = harness();
    h.supervisor = h.supervisor.with_config(config);

    h.supervisor.dispatch("ll").await;
    assert_eq!(h.runner.calls_to("shell ls -l /sdcard"), 1);

    h.supervisor.dispatch("sh").await;
    assert_eq!(h.counters.launches(), 1);

    h.supervisor.dispatch("ll").await;
    assert_eq!(h.counters.sent(), vec!["ll"]);
}

#[tokio::test]
async fn test_shutdown_runs_once() {
    let mut h = harness();
    let root = h.supervisor.workspace().root().to_path_buf();

    h.supervisor.dispatch("shell").await;
    h.supervisor.shutdown().await;
    h.supervisor.shutdown().await;

    assert!(!root.exists());
    assert_eq!(h.counters.stops(), 1);
    assert_eq!(h.supervisor.state(), SessionState::Idle);

    let events = h.events();
    let removed = events
        .iter()
        .filter(|e| e.message.starts_with("Removed temporary directory"))
        .count();
    assert_eq!(removed, 1);
    assert!(fixtures::contains(&events, "Deleted file:"));
}

#[tokio::test]
async fn test_shutdown_without_activity_cleans_workspace() {
    let mut h = harness();
    let root = h.supervisor.workspace().root().to_path_buf();

    h.supervisor.shutdown().await;

    assert!(!root.exists());
    assert_eq!(h.counters.stops(), 0);
    assert!(h.runner.calls().is_empty());
}
