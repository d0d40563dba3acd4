//! Dependency installer.
//!
//! Runs the package manager's install command inside an artifact
//! directory. A non-zero exit is terminal for the generation attempt; there
//! is no retry.

use std::path::Path;
use std::time::Duration;

use super::command::CommandSpec;
use super::subprocess::{self, CommandError, CommandInput};

/// How much of stderr is kept in an [`InstallError`].
const STDERR_TAIL_BYTES: usize = 4 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("dependency install failed with exit code {exit_code}: {stderr}")]
    Failed { exit_code: i32, stderr: String },

    #[error("dependency install timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("failed to run dependency install: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CommandError> for InstallError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Timeout { elapsed_ms } => Self::Timeout { elapsed_ms },
            CommandError::Io(e) => Self::Io(e),
        }
    }
}

/// Successful install summary.
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub duration_ms: u64,
}

/// Runs a configured install command with a wall-clock bound.
#[derive(Debug, Clone)]
pub struct DependencyInstaller {
    command: CommandSpec,
    timeout: Duration,
}

impl DependencyInstaller {
    pub fn new(command: CommandSpec, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    /// Install dependencies for the project in `directory`.
    pub async fn install(&self, directory: &Path) -> Result<InstallReport, InstallError> {
        tracing::debug!(
            directory = %directory.display(),
            command = %self.command,
            "Installing dependencies",
        );

        let input = CommandInput {
            env_vars: vec![],
            working_directory: Some(directory.to_string_lossy().into_owned()),
            timeout: self.timeout,
        };
        let output = subprocess::run_command(&mut self.command.to_command(), input).await?;

        if !output.success() {
            tracing::error!(
                directory = %directory.display(),
                exit_code = output.exit_code,
                "Dependency install failed",
            );
            return Err(InstallError::Failed {
                exit_code: output.exit_code,
                stderr: tail(&output.stderr, STDERR_TAIL_BYTES),
            });
        }

        tracing::debug!(
            directory = %directory.display(),
            elapsed_ms = output.duration_ms,
            "Dependencies installed",
        );
        Ok(InstallReport {
            duration_ms: output.duration_ms,
        })
    }
}

/// Last `max_bytes` of `text`, cut on a character boundary and trimmed.
fn tail(text: &str, max_bytes: usize) -> String {
    let text = text.trim();
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
