// src/system/output.rs

use crate::models::{Invocation, Outcome};
use colored::*;
use std::io::{self, Write};

/// Where finished invocations are released to.
///
/// Emission order is decided by the caller; a sink just writes.
pub trait OutputSink: Send + Sync {
    /// Writes one finished (or dry-run) invocation.
    fn emit(&self, invocation: &Invocation);
}

/// Writes captured output to the process's own stdout/stderr, one block per
/// invocation so concurrent output never interleaves mid-line.
#[derive(Debug, Default)]
pub struct TerminalSink;

impl OutputSink for TerminalSink {
    fn emit(&self, invocation: &Invocation) {
        let result = match invocation.outcome() {
            Some(Outcome::DryRun) => writeln!(io::stdout().lock(), "{}", invocation.command_line),
            Some(Outcome::Exited(output)) => {
                let mut out = io::stdout().lock();
                let stdout = out.write_all(&output.stdout).and_then(|_| out.flush());
                drop(out);
                let mut err = io::stderr().lock();
                let stderr = err.write_all(&output.stderr).and_then(|_| {
                    if output.success {
                        Ok(())
                    } else {
                        let status = output
                            .status
                            .map_or_else(|| "signal".to_string(), |code| code.to_string());
                        writeln!(
                            err,
                            "{} #{} exited with {}: {}",
                            "✗".red().bold(),
                            invocation.seq,
                            status.red(),
                            invocation.command_line.cyan()
                        )
                    }
                });
                stdout.and(stderr)
            }
            Some(Outcome::SpawnFailed(reason)) => writeln!(
                io::stderr().lock(),
                "{} #{} could not start: {}",
                "✗".red().bold(),
                invocation.seq,
                reason
            ),
            None => {
                log::warn!("Invocation #{} emitted without an outcome.", invocation.seq);
                Ok(())
            }
        };

        if let Err(e) = result {
            // A closed pipe (e.g. `| head`) must not take the run down.
            log::debug!("Failed to write output of #{}: {}", invocation.seq, e);
        }
    }
}
