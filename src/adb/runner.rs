use crate::core::types::{CommandInvocation, CommandResult, ExternalTool};
use crate::error::{Result, ToolkitError};
use crate::output::LogSink;
use async_trait::async_trait;
use log::*;
use std::process::Stdio;
use tokio::process::Command;

/// Windows `CREATE_NO_WINDOW`: keep child consoles hidden
#[cfg(windows)]
pub(crate) const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Runs one external command to completion
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: &CommandInvocation) -> Result<CommandResult>;

    /// Run, logging any failure to the pane.
    ///
    /// `None` means the command could not be run at all; `Some` with empty
    /// stdout means it ran and printed nothing.
    async fn run_logged(
        &self,
        invocation: &CommandInvocation,
        sink: &LogSink,
    ) -> Option<CommandResult> {
        match self.run(invocation).await {
            Ok(result) => Some(result),
            Err(e) => {
                error!("'{}' failed: {}", invocation, e);
                sink.error(format!("Exception running command '{}': {}", invocation, e))
                    .await;
                None
            }
        }
    }
}

/// Spawns the external tool as a subprocess for every call
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    tool: ExternalTool,
}

impl ProcessRunner {
    pub fn new(tool: ExternalTool) -> Self {
        Self { tool }
    }

    pub fn tool(&self) -> &ExternalTool {
        &self.tool
    }
}

/// Base command for `tool` with the working directory and window flags set
pub(crate) fn base_command(tool: &ExternalTool) -> Command {
    let mut cmd = Command::new(tool.program());
    if tool.working_dir().is_dir() {
        cmd.current_dir(tool.working_dir());
    }
    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);
    cmd
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &CommandInvocation) -> Result<CommandResult> {
        let args = invocation.args();
        debug!("Running: {} {}", self.tool.program().display(), args.join(" "));

        let child = base_command(&self.tool)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ToolkitError::Spawn {
                program: self.tool.display_name(),
                source,
            })?;

        // Drains both pipes while waiting, so a chatty child can't block on a full pipe
        let output = child
            .wait_with_output()
            .await
            .map_err(|source| ToolkitError::StreamRead {
                stream: "command output",
                source,
            })?;

        let result = CommandResult::new(
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
            output.status.code(),
        );
        debug!("'{}' exited with {:?}", invocation, result.status);
        Ok(result)
    }
}
