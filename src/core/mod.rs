pub mod command;
pub mod types;

pub use command::ToolkitCommand;
pub use types::{
    CommandInvocation, CommandResult, DeviceId, ExternalTool, LogLevel, SessionState,
};
