use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[command(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,

    /// Subcommand to execute; without one an interactive prompt starts
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file path (defaults to ~/.droidkit.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the adb executable
    #[arg(long, global = true)]
    pub adb: Option<PathBuf>,

    /// Directory holding the adb binaries to provision from
    #[arg(long, global = true)]
    pub bundle_dir: Option<PathBuf>,

    /// Device poll interval in seconds
    #[arg(long, global = true)]
    pub poll_interval: Option<u64>,

    /// Don't watch for device attach/detach
    #[arg(long, global = true)]
    pub no_poll: bool,

    /// Disable colored log levels
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Run one command as if typed at the prompt, then exit
    Exec {
        /// The command, without the `adb` prefix
        #[arg(required = true, allow_hyphen_values = true, trailing_var_arg = true)]
        command: Vec<String>,
    },
}
