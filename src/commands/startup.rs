use crate::adb::runner::ProcessRunner;
use crate::adb::server::start_server;
use crate::core::types::ExternalTool;
use crate::device::poller::DevicePoller;
use crate::output::LogSink;
use crate::workspace::ToolWorkspace;
use log::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Resolved startup settings (config file, environment and flags merged)
#[derive(Debug, Clone)]
pub struct StartupOptions {
    pub work_dir: PathBuf,
    pub bundle_dir: Option<PathBuf>,
    /// Explicit tool path; otherwise the provisioned copy or `adb` on PATH
    pub adb_path: Option<PathBuf>,
    /// `None` disables device polling
    pub poll_interval: Option<Duration>,
}

/// Everything `bootstrap` brought up
pub struct Startup {
    pub workspace: ToolWorkspace,
    pub tool: ExternalTool,
    pub runner: Arc<ProcessRunner>,
    /// Whether the tool was found; when false nothing was started
    pub tool_available: bool,
    pub poller: Option<JoinHandle<()>>,
}

/// Pick the adb executable: explicit path, then the provisioned copy, then PATH
pub fn resolve_tool(options: &StartupOptions, workspace: &ToolWorkspace) -> ExternalTool {
    if let Some(path) = &options.adb_path {
        return ExternalTool::new(path, workspace.root());
    }
    if workspace.adb_path().is_file() {
        return workspace.tool();
    }
    ExternalTool::new("adb", workspace.root())
}

/// Provision the workspace, start the adb server and the device poller
pub async fn bootstrap(
    options: &StartupOptions,
    sink: &LogSink,
    cancel: CancellationToken,
) -> Startup {
    let mut workspace = ToolWorkspace::new(&options.work_dir);
    match workspace.create() {
        Ok(()) => match &options.bundle_dir {
            Some(bundle_dir) => {
                let copied = workspace.provision(bundle_dir, sink).await;
                debug!("provisioned {} files into {}", copied, workspace.root().display());
            }
            None => debug!("no bundle directory configured, skipping provisioning"),
        },
        Err(e) => {
            sink.error(format!(
                "Failed to create working directory {}: {}",
                workspace.root().display(),
                e
            ))
            .await
        }
    }

    let tool = resolve_tool(options, &workspace);
    let runner = Arc::new(ProcessRunner::new(tool.clone()));
    info!("Using adb at {}", tool.program().display());

    if !tool.is_available() {
        sink.error("ADB executable not found.").await;
        return Startup {
            workspace,
            tool,
            runner,
            tool_available: false,
            poller: None,
        };
    }

    start_server(runner.as_ref(), sink).await;

    let poller = options.poll_interval.map(|interval| {
        debug!("polling devices every {:?}", interval);
        DevicePoller::new(Arc::clone(&runner), sink.clone())
            .with_interval(interval)
            .spawn(cancel)
    });

    Startup {
        workspace,
        tool,
        runner,
        tool_available: true,
        poller,
    }
}
