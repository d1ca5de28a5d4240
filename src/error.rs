use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while supervising the external tool.
///
/// None of these are fatal: every caller degrades to a logged message and
/// keeps going. Match on the variant, not on the rendered text.
#[derive(Debug, Error)]
pub enum ToolkitError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {stream}: {source}")]
    StreamRead {
        stream: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Session misuse: {0}")]
    SessionMisuse(String),

    #[error("Failed to remove {}: {source}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolkitError {
    pub fn misuse(msg: impl Into<String>) -> Self {
        ToolkitError::SessionMisuse(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ToolkitError>;
