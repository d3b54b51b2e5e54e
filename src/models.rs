// src/models.rs

use serde::{Deserialize, Serialize};
use std::fmt;

// --- EXECUTION MODELS ---

/// Lifecycle of a single invocation.
///
/// `Pending → Dispatched → Running → {Completed | Failed} → Emitted`.
/// Dry-run invocations skip `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Pending,
    Dispatched,
    Running,
    Completed,
    Failed,
    Emitted,
}

/// What a spawned command left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    pub success: bool,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CapturedOutput {
    /// Convenience constructor for a successful run with the given stdout.
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            status: Some(0),
            success: true,
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// Convenience constructor for a run that exited with `code`.
    pub fn exited(code: i32, stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            status: Some(code),
            success: code == 0,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

/// The result attached to an invocation once it leaves the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Dry-run: the command line was rendered but nothing was spawned.
    DryRun,
    /// The process ran to completion (successfully or not).
    Exited(CapturedOutput),
    /// The process could not be started at all.
    SpawnFailed(String),
}

/// One execution of the command template against one task group.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub seq: u64,
    pub command_line: String,
    state: InvocationState,
    outcome: Option<Outcome>,
}

impl Invocation {
    pub fn new(seq: u64, command_line: String) -> Self {
        Self {
            seq,
            command_line,
            state: InvocationState::Pending,
            outcome: None,
        }
    }

    pub fn state(&self) -> InvocationState {
        self.state
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn mark_dispatched(&mut self) {
        self.transition(InvocationState::Dispatched);
    }

    pub fn mark_running(&mut self) {
        self.transition(InvocationState::Running);
    }

    /// Records the outcome and moves to `Completed` or `Failed`.
    pub fn finish(&mut self, outcome: Outcome) {
        let next = match &outcome {
            Outcome::DryRun => InvocationState::Completed,
            Outcome::Exited(output) if output.success => InvocationState::Completed,
            Outcome::Exited(_) | Outcome::SpawnFailed(_) => InvocationState::Failed,
        };
        self.outcome = Some(outcome);
        self.transition(next);
    }

    pub fn mark_emitted(&mut self) {
        self.transition(InvocationState::Emitted);
    }

    pub fn is_failed(&self) -> bool {
        self.state == InvocationState::Failed
            || matches!(
                self.outcome,
                Some(Outcome::SpawnFailed(_))
                    | Some(Outcome::Exited(CapturedOutput { success: false, .. }))
            )
    }

    fn transition(&mut self, to: InvocationState) {
        log::trace!("Invocation #{}: {:?} -> {:?}", self.seq, self.state, to);
        self.state = to;
    }
}

/// Final tally returned by the executor's join point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Highest number of invocations observed running at the same time.
    pub peak_running: usize,
    pub interrupted: bool,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} dispatched, {} succeeded, {} failed (peak concurrency {})",
            self.dispatched, self.succeeded, self.failed, self.peak_running
        )
    }
}

// --- CONFIGURATION MODELS ---

/// How command lines are handed to the operating system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecMode {
    /// Run through a shell program, e.g. `sh -c <line>`.
    Shell { program: String, args: Vec<String> },
    /// Split with shell-word rules and spawn the program directly.
    Direct,
}

impl ExecMode {
    /// A shell mode, falling back to the platform's shell for anything not given.
    pub fn shell(program: Option<String>, args: Option<Vec<String>>) -> Self {
        let (default_program, default_args) = if cfg!(target_os = "windows") {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };
        Self::Shell {
            program: program.unwrap_or_else(|| default_program.to_string()),
            args: args.unwrap_or_else(|| vec![default_args.to_string()]),
        }
    }
}

impl Default for ExecMode {
    fn default() -> Self {
        Self::shell(None, None)
    }
}

/// The immutable options of one run, resolved before execution begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Degree of parallelism, always at least 1.
    pub slots: usize,
    pub dry_run: bool,
    /// Dispatch strictly in sequence order.
    pub ordered: bool,
    /// Emit output strictly in sequence order.
    pub keep_order: bool,
    pub shuffle: bool,
    pub exec_mode: ExecMode,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            slots: 1,
            dry_run: false,
            ordered: false,
            keep_order: false,
            shuffle: false,
            exec_mode: ExecMode::default(),
        }
    }
}

/// Represents the deserialized structure of the optional `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub slots: Option<usize>,
    #[serde(default)]
    pub ordered: bool,
    #[serde(default)]
    pub keep_order: bool,
    #[serde(default)]
    pub shuffle: bool,
    pub shell: Option<String>,
    pub shell_args: Option<Vec<String>>,
}
