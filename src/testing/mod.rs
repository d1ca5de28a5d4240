pub mod fixtures;
pub mod mocks;

pub use mocks::{RecordingLauncher, ScriptedRunner, SessionCounters};
