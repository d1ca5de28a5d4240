use crate::adb::runner::CommandRunner;
use crate::core::types::{CommandInvocation, LogLevel};
use crate::output::LogSink;
use log::*;
use std::ffi::OsString;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

/// Start the ADB server and log what it printed
pub async fn start_server<R: CommandRunner + ?Sized>(runner: &R, sink: &LogSink) -> bool {
    sink.info("Starting ADB server...").await;

    let Some(result) = runner
        .run_logged(&CommandInvocation::new("start-server"), sink)
        .await
    else {
        return false;
    };

    if let Some(output) = result.output() {
        sink.info(format!("ADB Server Start Output:\n{}", output)).await;
    }
    if !result.stderr.trim().is_empty() {
        // adb reports "daemon started successfully" on stderr
        let (level, label) = if result.success() {
            (LogLevel::Info, "Messages")
        } else {
            (LogLevel::Error, "Errors")
        };
        sink.log(
            level,
            format!("ADB Server Start {}:\n{}", label, result.stderr.trim_end()),
        )
        .await;
    }

    result.success()
}

/// Executable name of `program` as the OS lists it (`adb` / `adb.exe`)
pub fn process_name(program: &str) -> OsString {
    let suffix = std::env::consts::EXE_SUFFIX;
    if suffix.is_empty() || program.ends_with(suffix) {
        OsString::from(program)
    } else {
        OsString::from(format!("{}{}", program, suffix))
    }
}

/// Kill every running process named `name`, returning how many were killed.
///
/// Catches adb servers and shells left behind by earlier runs or by
/// children that outlived their session.
pub async fn kill_processes_by_name(name: &str, sink: &LogSink) -> usize {
    let exe = process_name(name);
    let own_pid = std::process::id();

    let killed = tokio::task::spawn_blocking(move || {
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing(),
        );

        let mut killed = Vec::new();
        let mut failed = Vec::new();
        for process in system.processes_by_exact_name(&exe) {
            let pid = process.pid().as_u32();
            if pid == own_pid {
                continue;
            }
            if process.kill() {
                process.wait();
                killed.push(pid);
            } else {
                failed.push(pid);
            }
        }
        (killed, failed)
    })
    .await;

    match killed {
        Ok((killed, failed)) => {
            for pid in &killed {
                sink.info(format!("Terminated orphaned {} process (PID: {}).", name, pid))
                    .await;
            }
            for pid in failed {
                sink.error(format!("Failed to kill {} process (PID: {}).", name, pid))
                    .await;
            }
            killed.len()
        }
        Err(e) => {
            error!("process scan panicked: {}", e);
            sink.error(format!("Failed to kill {} processes: {}", name, e)).await;
            0
        }
    }
}
