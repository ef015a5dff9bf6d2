//! External process execution
//!
//! Both image tools are one-shot, synchronous-from-the-caller invocations:
//! run the binary, wait for it, turn a non-zero exit into an error that
//! carries the captured output.

use crate::error::ImageToolError;
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

/// Captured result of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Whether command succeeded
    pub success: bool,
    /// Exit status as printed by the OS
    pub status: String,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

impl CommandOutput {
    /// Converts an unsuccessful run into `ImageToolError::CommandFailed`
    pub fn into_result(self, command: &str) -> Result<CommandOutput, ImageToolError> {
        if self.success {
            return Ok(self);
        }
        Err(ImageToolError::CommandFailed {
            command: command.to_string(),
            status: self.status,
            stdout: self.stdout.trim().to_string(),
            stderr: self.stderr.trim().to_string(),
        })
    }
}

/// Runs `binary args...` to completion
pub(crate) async fn run(binary: &str, args: &[String]) -> Result<CommandOutput, ImageToolError> {
    debug!(binary = %binary, args = ?args, "Executing command");

    let output = Command::new(binary)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| ImageToolError::Spawn {
            command: binary.to_string(),
            source,
        })?;

    CommandOutput::from(output).into_result(binary)
}
