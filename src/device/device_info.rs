use crate::adb::runner::CommandRunner;
use crate::core::types::{CommandInvocation, DeviceId, LogLevel};
use crate::output::LogSink;
use log::debug;
use regex::Regex;
use std::sync::LazyLock;

static RE_DEVICE_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\S+)").unwrap());

/// Basic properties, logged as `<label>: <value>`
pub const DEVICE_PROPERTIES: &[(&str, &str)] = &[
    ("ro.product.model", "Model"),
    ("ro.build.version.release", "Android Version"),
    ("ro.build.version.sdk", "SDK Version"),
    ("ro.product.manufacturer", "Manufacturer"),
    ("ro.serialno", "Serial Number"),
];

/// Bootloader diagnostics, logged as `<label> (<key>): <value>`
pub const BOOTLOADER_PROPERTIES: &[(&str, &str)] = &[
    ("ro.bootloader", "Bootloader Status"),
    ("ro.secureboot.lockstate", "Bootloader Lock State"),
    ("ro.boot.flash.locked", "Flash Lock State"),
    ("ro.boot.verifiedbootstate", "Verified Boot State"),
    ("ro.oem_unlock_supported", "OEM Unlock Supported"),
];

const FLASH_LOCK_KEY: &str = "ro.boot.flash.locked";

/// First device serial in `adb devices` output.
///
/// Skips the `List of devices attached` header, daemon notices (`* ...`)
/// and blank lines; the leading token of the next line is the serial.
pub fn first_device(output: &str) -> Option<DeviceId> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with("List of devices"))
        .find(|line| !line.starts_with('*'))
        .and_then(|line| RE_DEVICE_LINE.captures(line))
        .map(|caps| DeviceId::new(&caps[1]))
}

/// Everything one device-info fetch found, in display order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceReport {
    pub entries: Vec<(String, String)>,
}

impl DeviceReport {
    fn push(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.entries.push((label.into(), value.into()));
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Run `command` against `device`, returning trimmed stdout if it printed anything
async fn query<R: CommandRunner + ?Sized>(
    runner: &R,
    sink: &LogSink,
    device: &DeviceId,
    command: &str,
) -> Option<String> {
    let invocation = CommandInvocation::new(command).with_device(device.clone());
    let result = runner.run_logged(&invocation, sink).await?;

    if !result.stderr.trim().is_empty() {
        sink.error(format!("Command '{}' Errors:\n{}", command, result.stderr.trim_end()))
            .await;
    }
    result.output().map(str::to_string)
}

async fn getprop<R: CommandRunner + ?Sized>(
    runner: &R,
    sink: &LogSink,
    device: &DeviceId,
    key: &str,
) -> Option<String> {
    query(runner, sink, device, &format!("shell getprop {}", key)).await
}

/// Log the device summary and diagnostics for a newly attached device
pub async fn load_device_info<R: CommandRunner + ?Sized>(
    runner: &R,
    sink: &LogSink,
    device: &DeviceId,
) -> DeviceReport {
    let mut report = DeviceReport::default();

    sink.info(format!("Loading device information for {}...", device)).await;

    for (key, label) in DEVICE_PROPERTIES {
        if let Some(value) = getprop(runner, sink, device, key).await {
            sink.info(format!("{}: {}", label, value)).await;
            report.push(*label, value);
        }
    }

    check_advanced(runner, sink, device, &mut report).await;

    sink.info("**Note:** All commands already have the 'adb' prefix. You only need to type the rest of the command (e.g., `devices`, `shell`, etc.).")
        .await;
    sink.info("For more information about this tool, type the `info` command.")
        .await;

    debug!("device report for {}: {:?}", device, report);
    report
}

async fn check_advanced<R: CommandRunner + ?Sized>(
    runner: &R,
    sink: &LogSink,
    device: &DeviceId,
    report: &mut DeviceReport,
) {
    sink.info("Performing advanced device checks...").await;

    let rooted = query(runner, sink, device, "shell which su").await.is_some();
    if rooted {
        sink.info("Device is Rooted.").await;
    } else {
        sink.warning("Device is not Rooted.").await;
    }
    report.push("Root", if rooted { "Rooted" } else { "Not rooted" });

    check_bootloader(runner, sink, device, report).await;

    let oem_unlock = getprop(runner, sink, device, "sys.oem_unlock_allowed").await;
    if oem_unlock.as_deref() == Some("1") {
        sink.info("OEM Unlock is Enabled.").await;
        report.push("OEM Unlock", "Enabled");
    } else {
        sink.warning("OEM Unlock is Disabled.").await;
        report.push("OEM Unlock", "Disabled");
    }

    let su = query(runner, sink, device, r#"shell su -c "id""#).await;
    if su.is_some_and(|id| id.contains("uid=0(root)")) {
        sink.info("Device has SU rights.").await;
        report.push("SU Rights", "Yes");
    } else {
        sink.warning("Device does not have SU rights.").await;
        report.push("SU Rights", "No");
    }
}

async fn check_bootloader<R: CommandRunner + ?Sized>(
    runner: &R,
    sink: &LogSink,
    device: &DeviceId,
    report: &mut DeviceReport,
) {
    sink.info("Checking bootloader status...").await;

    for (key, label) in BOOTLOADER_PROPERTIES {
        let title = format!("{} ({})", label, key);
        let (level, value) = match getprop(runner, sink, device, key).await {
            Some(value) if *key == FLASH_LOCK_KEY => {
                let state = if value == "0" { "Unlocked" } else { "Locked" };
                (LogLevel::Info, state.to_string())
            }
            Some(value) => (LogLevel::Info, value),
            None => (LogLevel::Warning, "Unknown".to_string()),
        };
        sink.log(level, format!("{}: {}", title, value)).await;
        report.push(title, value);
    }
}
