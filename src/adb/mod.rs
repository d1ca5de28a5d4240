pub mod runner;
pub mod server;
pub mod session;

pub use runner::{CommandRunner, ProcessRunner};
pub use server::{kill_processes_by_name, start_server};
pub use session::{InteractiveSession, ProcessLauncher, SessionLauncher, ShellSession};
