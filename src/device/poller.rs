use crate::adb::runner::CommandRunner;
use crate::config::DEFAULT_POLL_INTERVAL_SECS;
use crate::core::types::{CommandInvocation, DeviceId};
use crate::device::device_info::{first_device, load_device_info};
use crate::output::LogSink;
use log::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollState {
    pub last_known_device: Option<DeviceId>,
    /// Attach detection is paused while a known device stays connected
    pub polling_enabled: bool,
}

impl Default for PollState {
    fn default() -> Self {
        Self {
            last_known_device: None,
            polling_enabled: true,
        }
    }
}

/// What a single tick observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollTransition {
    Attached(DeviceId),
    Detached,
    Unchanged,
}

/// Watches `adb devices` for attach/detach transitions
pub struct DevicePoller<R: ?Sized> {
    runner: Arc<R>,
    sink: LogSink,
    state: PollState,
    interval: Duration,
}

impl<R: CommandRunner + ?Sized + 'static> DevicePoller<R> {
    pub fn new(runner: Arc<R>, sink: LogSink) -> Self {
        Self {
            runner,
            sink,
            state: PollState::default(),
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    /// Enumerate devices once and apply the transition rules.
    ///
    /// A new serial triggers the device-info fetch and pauses attach
    /// detection; losing the device re-enables it. Steady state logs nothing.
    pub async fn tick(&mut self) -> PollTransition {
        let Some(result) = self
            .runner
            .run_logged(&CommandInvocation::new("devices"), &self.sink)
            .await
        else {
            return PollTransition::Unchanged;
        };

        if !result.stderr.trim().is_empty() {
            debug!("adb devices stderr: {}", result.stderr.trim_end());
        }

        match first_device(&result.stdout) {
            Some(device) if self.state.polling_enabled && !self.is_known(&device) => {
                info!("Device attached: {}", device);
                self.state.last_known_device = Some(device.clone());
                load_device_info(self.runner.as_ref(), &self.sink, &device).await;
                self.state.polling_enabled = false;
                PollTransition::Attached(device)
            }
            None if self.state.last_known_device.is_some() => {
                info!("Device detached: {:?}", self.state.last_known_device);
                self.state.last_known_device = None;
                self.sink.warning("No devices connected.").await;
                self.state.polling_enabled = true;
                PollTransition::Detached
            }
            _ => PollTransition::Unchanged,
        }
    }

    fn is_known(&self, device: &DeviceId) -> bool {
        self.state
            .last_known_device
            .as_ref()
            .is_some_and(|last| last.matches(device))
    }

    /// Tick on the configured interval until `cancel` fires
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("device poller shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let transition = self.tick().await;
                    trace!("poll tick: {:?}", transition);
                }
            }
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()>
    where
        R: Send + Sync,
    {
        tokio::spawn(self.run(cancel))
    }
}
