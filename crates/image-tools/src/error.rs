//! Image tool errors

use thiserror::Error;

/// Errors that can occur when invoking an external image tool
#[derive(Debug, Error)]
pub enum ImageToolError {
    /// The tool could not be started (missing binary, permissions, ...)
    #[error("failed to execute {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and exited unsuccessfully
    #[error("{command} failed ({status}): stdout: {stdout}, stderr: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    /// The arguments could not be built from the given input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
