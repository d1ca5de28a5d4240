//! Long-lived interactive shell process.
//!
//! The child's stdout and stderr are each drained by their own task, which
//! forwards lines to the log pane as they arrive. Stdin stays with the
//! session so `send` can write and flush synchronously with the caller.

use crate::adb::runner::base_command;
use crate::core::types::{CommandInvocation, ExternalTool, LogLevel};
use crate::error::{Result, ToolkitError};
use crate::output::LogSink;
use async_trait::async_trait;
use log::*;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin};
use tokio::task::JoinHandle;

/// How long reader tasks get to flush buffered lines after the child exits
const READER_GRACE: Duration = Duration::from_millis(500);

/// Operations the supervisor needs from an active shell
#[async_trait]
pub trait ShellSession: Send {
    async fn send(&mut self, line: &str) -> Result<()>;
    async fn stop(&mut self) -> Result<()>;
    fn is_running(&mut self) -> bool;
}

/// Creates and starts shell sessions
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self, sink: LogSink) -> Result<Box<dyn ShellSession>>;
}

enum Phase {
    NotStarted,
    Running {
        child: Child,
        stdin: ChildStdin,
        readers: Vec<JoinHandle<()>>,
    },
    Stopped,
}

/// An interactive child process with piped stdio
pub struct InteractiveSession {
    tool: ExternalTool,
    invocation: CommandInvocation,
    sink: LogSink,
    phase: Phase,
}

impl InteractiveSession {
    pub fn new(tool: ExternalTool, invocation: CommandInvocation, sink: LogSink) -> Self {
        Self {
            tool,
            invocation,
            sink,
            phase: Phase::NotStarted,
        }
    }

    /// Spawn the child and its reader tasks. Returns once the process is up.
    pub fn start(&mut self) -> Result<()> {
        if !matches!(self.phase, Phase::NotStarted) {
            return Err(ToolkitError::misuse("session was already started"));
        }

        let args = self.invocation.args();
        info!("Spawning shell: {} {}", self.tool.program().display(), args.join(" "));

        let mut child = base_command(&self.tool)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolkitError::Spawn {
                program: self.tool.display_name(),
                source,
            })?;

        debug!("Shell process started with PID: {:?}", child.id());

        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(ToolkitError::misuse("shell process has no piped stdio"));
        };

        let readers = vec![
            tokio::spawn(forward_lines(stdout, "stdout", LogLevel::Info, self.sink.clone())),
            tokio::spawn(forward_lines(stderr, "stderr", LogLevel::Error, self.sink.clone())),
        ];

        self.phase = Phase::Running {
            child,
            stdin,
            readers,
        };
        Ok(())
    }

    pub fn pid(&self) -> Option<u32> {
        match &self.phase {
            Phase::Running { child, .. } => child.id(),
            _ => None,
        }
    }
}

#[async_trait]
impl ShellSession for InteractiveSession {
    /// Write `line` and a newline to the child, then flush
    async fn send(&mut self, line: &str) -> Result<()> {
        if !self.is_running() {
            return Err(ToolkitError::misuse("shell is not running"));
        }
        let Phase::Running { stdin, .. } = &mut self.phase else {
            return Err(ToolkitError::misuse("shell is not running"));
        };

        write_line(stdin, line).await.map_err(|e| match e.kind() {
            // The child closed its stdin or exited after the running check
            std::io::ErrorKind::BrokenPipe => ToolkitError::misuse("shell stopped reading input"),
            _ => ToolkitError::Io(e),
        })
    }

    /// Kill the child if needed and wait for it. No-op unless running.
    async fn stop(&mut self) -> Result<()> {
        if !matches!(self.phase, Phase::Running { .. }) {
            debug!("stop() on a session that is not running, ignoring");
            return Ok(());
        }
        let Phase::Running {
            mut child,
            stdin,
            readers,
        } = std::mem::replace(&mut self.phase, Phase::Stopped)
        else {
            return Ok(());
        };

        let mut outcome = Ok(());
        match child.try_wait() {
            Ok(Some(status)) => debug!("Shell already exited with {:?}", status),
            _ => {
                if let Err(e) = child.start_kill() {
                    warn!("Failed to kill shell process: {}", e);
                }
                match child.wait().await {
                    Ok(status) => {
                        info!("Shell process exited with {:?}", status);
                        self.sink.info("ADB shell process terminated.").await;
                    }
                    Err(e) => {
                        self.sink
                            .error(format!("Failed to kill ADB shell process: {}", e))
                            .await;
                        outcome = Err(e.into());
                    }
                }
            }
        }
        drop(stdin);

        for mut reader in readers {
            if tokio::time::timeout(READER_GRACE, &mut reader).await.is_err() {
                debug!("reader task still attached after exit, aborting");
                reader.abort();
            }
        }

        outcome
    }

    fn is_running(&mut self) -> bool {
        match &mut self.phase {
            Phase::Running { child, .. } => matches!(child.try_wait(), Ok(None)),
            _ => false,
        }
    }
}

async fn write_line(stdin: &mut ChildStdin, line: &str) -> std::io::Result<()> {
    stdin.write_all(line.as_bytes()).await?;
    stdin.write_all(b"\n").await?;
    stdin.flush().await
}

async fn forward_lines<R>(stream: R, name: &'static str, level: LogLevel, sink: LogSink)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']);
                trace!("{}: {}", name, line);
                sink.log(level, line).await;
            }
            Err(source) => {
                let err = ToolkitError::StreamRead { stream: name, source };
                sink.error(err.to_string()).await;
                break;
            }
        }
    }
    debug!("{} reader finished", name);
}

/// Launches `adb shell` sessions for the supervisor
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    tool: ExternalTool,
}

impl ProcessLauncher {
    pub fn new(tool: ExternalTool) -> Self {
        Self { tool }
    }
}

#[async_trait]
impl SessionLauncher for ProcessLauncher {
    async fn launch(&self, sink: LogSink) -> Result<Box<dyn ShellSession>> {
        let mut session =
            InteractiveSession::new(self.tool.clone(), CommandInvocation::new("shell"), sink);
        session.start()?;
        Ok(Box::new(session))
    }
}
