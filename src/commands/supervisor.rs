//! Routes user commands to one-shot adb runs or the interactive shell.

use crate::adb::runner::CommandRunner;
use crate::adb::server::kill_processes_by_name;
use crate::adb::session::{SessionLauncher, ShellSession};
use crate::config::Config;
use crate::core::command::ToolkitCommand;
use crate::core::types::{CommandInvocation, SessionState};
use crate::output::LogSink;
use crate::workspace::ToolWorkspace;
use log::*;
use std::sync::Arc;

const FEATURES: &[&str] = &[
    "- Start and stop ADB server",
    "- Check connected devices",
    "- Execute shell commands",
    "- Load device information",
    "- Check bootloader status",
    "- Perform advanced device checks such as root and OEM unlock status",
];

pub struct SessionSupervisor<R: ?Sized, L> {
    runner: Arc<R>,
    launcher: L,
    sink: LogSink,
    workspace: ToolWorkspace,
    config: Config,
    /// Process name to reap at shutdown, if any
    reap_process: Option<String>,
    state: SessionState,
    session: Option<Box<dyn ShellSession>>,
    shut_down: bool,
}

impl<R, L> SessionSupervisor<R, L>
where
    R: CommandRunner + ?Sized,
    L: SessionLauncher,
{
    pub fn new(runner: Arc<R>, launcher: L, sink: LogSink, workspace: ToolWorkspace) -> Self {
        Self {
            runner,
            launcher,
            sink,
            workspace,
            config: Config::default(),
            reap_process: None,
            state: SessionState::Idle,
            session: None,
            shut_down: false,
        }
    }

    /// Use `config` for alias resolution
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Kill leftover processes named `name` during shutdown
    pub fn with_orphan_reaping(mut self, name: impl Into<String>) -> Self {
        self.reap_process = Some(name.into());
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn workspace(&self) -> &ToolWorkspace {
        &self.workspace
    }

    /// Handle one line of user input
    pub async fn dispatch(&mut self, input: &str) {
        let command = self.resolve(input);
        debug!("dispatch {:?} in {:?}", command, self.state);

        match command {
            ToolkitCommand::Info => self.print_info().await,
            ToolkitCommand::Empty => self.sink.warning("Please enter an ADB command.").await,
            command if self.state == SessionState::InteractiveShellActive => {
                self.forward_to_shell(command).await
            }
            ToolkitCommand::Shell(_) => self.start_shell().await,
            command => self.run_command(command.text()).await,
        }
    }

    /// Parse `input`, applying aliases to non-keyword input while idle
    fn resolve(&self, input: &str) -> ToolkitCommand {
        let command = ToolkitCommand::parse(input);
        if self.state != SessionState::Idle || command.is_keyword() {
            return command;
        }
        let expansion = self.config.resolve_alias(command.text());
        if expansion == command.text() {
            command
        } else {
            debug!("alias {} -> {}", command.text(), expansion);
            ToolkitCommand::parse(&expansion)
        }
    }

    async fn print_info(&self) {
        self.sink
            .info(format!("**droidkit v{}**", env!("CARGO_PKG_VERSION")))
            .await;
        self.sink
            .info("This toolkit allows you to manage and interact with your Android device using ADB commands.")
            .await;
        self.sink.info("Features include:").await;
        for feature in FEATURES {
            self.sink.info(*feature).await;
        }
        self.sink
            .info("Temporary files used by this toolkit are stored in the following directory and are deleted when it exits:")
            .await;
        self.sink
            .info(format!("    {}", self.workspace.root().display()))
            .await;
    }

    async fn start_shell(&mut self) {
        self.sink.info("Starting ADB shell...").await;
        match self.launcher.launch(self.sink.clone()).await {
            Ok(session) => {
                self.session = Some(session);
                self.state = SessionState::InteractiveShellActive;
                self.sink
                    .info("ADB shell started. You can now enter shell commands.")
                    .await;
            }
            Err(e) => {
                error!("shell launch failed: {}", e);
                self.sink
                    .error(format!("Exception starting ADB shell: {}", e))
                    .await;
            }
        }
    }

    async fn forward_to_shell(&mut self, command: ToolkitCommand) {
        let line = command.text();
        if let ToolkitCommand::Exit(_) = command {
            self.sink
                .info(format!("Executing shell command: {}", line))
                .await;
            self.sink
                .info("Exiting ADB shell and returning to normal mode.")
                .await;
            self.close_shell().await;
            return;
        }

        let alive = self.session.as_mut().is_some_and(|s| s.is_running());
        if !alive {
            self.sink
                .warning("ADB shell has exited. Returning to normal mode.")
                .await;
            self.close_shell().await;
            return;
        }

        self.sink
            .info(format!("Executing shell command: {}", line))
            .await;
        if let Some(session) = self.session.as_mut() {
            if let Err(e) = session.send(line).await {
                self.sink
                    .error(format!("Exception executing shell command: {}", e))
                    .await;
            }
        }
    }

    /// Stop the active session, if any, and go back to idle
    async fn close_shell(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.stop().await {
                warn!("shell stop failed: {}", e);
            }
        }
        self.state = SessionState::Idle;
    }

    async fn run_command(&self, command: &str) {
        self.sink
            .info(format!("Executing command: {}", command))
            .await;

        let Some(result) = self
            .runner
            .run_logged(&CommandInvocation::new(command), &self.sink)
            .await
        else {
            return;
        };

        if let Some(output) = result.output() {
            self.sink.info(format!("Output:\n{}", output)).await;
        }
        if !result.stderr.trim().is_empty() {
            self.sink
                .error(format!("Errors:\n{}", result.stderr.trim_end()))
                .await;
        }
        if !result.success() {
            let status = result
                .status
                .map_or_else(|| "a signal".to_string(), |code| code.to_string());
            self.sink
                .warning(format!("Command '{}' exited with status {}.", command, status))
                .await;
        }
    }

    /// Tear down the shell, orphaned processes and the workspace. Runs once.
    pub async fn shutdown(&mut self) {
        if self.shut_down {
            debug!("shutdown already ran");
            return;
        }
        self.shut_down = true;
        info!("Shutting down");

        self.close_shell().await;

        if let Some(name) = &self.reap_process {
            let killed = kill_processes_by_name(name, &self.sink).await;
            debug!("reaped {} {} processes", killed, name);
        }

        let errors = self.workspace.cleanup(&self.sink).await;
        if !errors.is_empty() {
            warn!("{} cleanup failures", errors.len());
        }
    }
}
