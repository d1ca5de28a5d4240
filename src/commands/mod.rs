pub mod startup;
pub mod supervisor;

pub use startup::{bootstrap, resolve_tool, Startup, StartupOptions};
pub use supervisor::SessionSupervisor;

#[cfg(test)]
mod supervisor_test;
