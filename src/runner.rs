//! Boundary to the external programs drivux drives.
//!
//! Every `systemctl`/`journalctl` invocation goes through [`CommandRunner`], so
//! the registry can be exercised against canned output.
use std::process::{Command, Output, Stdio};

use tracing::debug;

use crate::error::CommandError;

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the command exited successfully (exit code 0).
    pub success: bool,
    /// The exit code, if available.
    pub exit_code: Option<i32>,
    /// Captured stdout as a string.
    pub stdout: String,
    /// Captured stderr as a string.
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output carrying `stdout`.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output carrying an exit code and `stderr`.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// Runs an external program to completion and captures its output.
pub trait CommandRunner {
    /// Runs `program` with `args`, blocking until it exits.
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CommandError>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CommandError> {
        (**self).run(program, args)
    }
}

/// Runner that spawns real processes without a shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CommandError> {
        debug!(program = %program, args = ?args, "Executing command");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| CommandError {
                program: program.to_string(),
                source,
            })?;

        let output = CommandOutput::from_output(output);
        debug!(
            program = %program,
            exit_code = ?output.exit_code,
            stdout_len = output.stdout.len(),
            "Command finished"
        );
        Ok(output)
    }
}
