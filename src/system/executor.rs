// EN: src/system/executor.rs

use crate::models::{CapturedOutput, ExecMode};
use std::future::Future;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command could not be parsed: {0}")]
    CommandParse(String),
    #[error("No command specified to run.")]
    EmptyCommand,
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, std::io::Error),
}

/// Runs one command line to completion and hands back what it produced.
///
/// The task executor only depends on this trait, so tests can swap in runners
/// that never touch the operating system.
pub trait CommandRunner: Send + Sync + 'static {
    /// Runs `command_line`. A non-zero exit is `Ok`; only a failure to start is `Err`.
    fn run(
        &self,
        command_line: String,
    ) -> impl Future<Output = Result<CapturedOutput, ExecutionError>> + Send;
}

/// The default runner: spawns real processes with stdin closed and both
/// output streams captured.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    mode: ExecMode,
}

impl ShellRunner {
    /// A runner that hands command lines over according to `mode`.
    pub fn new(mode: ExecMode) -> Self {
        Self { mode }
    }

    fn build_command(&self, command_line: &str) -> Result<Command, ExecutionError> {
        let trimmed = command_line.trim();
        if trimmed.is_empty() {
            return Err(ExecutionError::EmptyCommand);
        }

        let command = match &self.mode {
            ExecMode::Shell { program, args } => {
                let mut command = Command::new(program);
                command.args(args).arg(trimmed);
                command
            }
            ExecMode::Direct => {
                let parts = shlex::split(trimmed)
                    .ok_or_else(|| ExecutionError::CommandParse(trimmed.to_string()))?;
                let (program, args) = parts.split_first().ok_or(ExecutionError::EmptyCommand)?;
                let mut command = Command::new(program);
                command.args(args);
                command
            }
        };
        Ok(command)
    }
}

impl CommandRunner for ShellRunner {
    async fn run(&self, command_line: String) -> Result<CapturedOutput, ExecutionError> {
        let mut command = self.build_command(&command_line)?;
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        log::debug!("Spawning: {}", command_line);
        let output = command
            .output()
            .await
            .map_err(|e| ExecutionError::CommandFailed(command_line.clone(), e))?;

        Ok(CapturedOutput {
            status: output.status.code(),
            success: output.status.success(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
