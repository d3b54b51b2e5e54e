//! # Task Executor
//!
//! Drains task groups into invocations and runs them on a bounded number of
//! execution slots.
//!
//! - Each invocation gets the next sequence number at dispatch time. The
//!   counter lives in the executor and only the dispatcher (`&mut self`) moves it.
//! - A slot is a permit of a `tokio::sync::Semaphore` with `slots` permits; a
//!   worker holds it for exactly as long as its process runs.
//! - In ordered mode the dispatcher itself acquires the slot before spawning,
//!   so invocation `n + 1` can never start before `n` has been dispatched.
//! - Output goes through the [`OutputSequencer`], which enforces keep-order.
//!   A worker's backlog permit travels with its output, so at most
//!   `slots * BACKLOG_PER_SLOT` finished invocations are ever held back.
//! - Dry-run renders and emits the command line without a slot or a process.

use crate::{
    CancellationToken,
    constants::BACKLOG_PER_SLOT,
    core::{
        sequencer::OutputSequencer,
        tasks::{ExhaustedError, TaskGroup, TaskListSet},
        template::CommandTemplate,
    },
    models::{Invocation, Outcome, RunConfig, RunSummary},
    system::{executor::CommandRunner, output::OutputSink},
};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, atomic::Ordering::SeqCst};
use thiserror::Error;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Execution slots are no longer available.")]
    SlotsClosed(#[from] AcquireError),
    #[error("Run interrupted by the user.")]
    Interrupted,
}

/// Shared counters, written by workers, read once at the join point.
#[derive(Debug, Default)]
struct RunStats {
    running: AtomicUsize,
    peak_running: AtomicUsize,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl RunStats {
    fn enter(&self) {
        let now = self.running.fetch_add(1, SeqCst) + 1;
        self.peak_running.fetch_max(now, SeqCst);
    }

    fn leave(&self) {
        self.running.fetch_sub(1, SeqCst);
    }

    fn record(&self, invocation: &Invocation) {
        if invocation.is_failed() {
            self.failed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Hands out sequence numbers. Owned by the dispatcher, never shared.
#[derive(Debug, Default)]
struct SequenceCounter(u64);

impl SequenceCounter {
    fn advance(&mut self) -> u64 {
        let seq = self.0;
        self.0 += 1;
        seq
    }

    fn issued(&self) -> u64 {
        self.0
    }
}

/// Dispatches task groups onto execution slots. One per run.
pub struct Executor<R: CommandRunner> {
    config: Arc<RunConfig>,
    template: Arc<CommandTemplate>,
    runner: Arc<R>,
    slots: Arc<Semaphore>,
    backlog: Arc<Semaphore>,
    sequence: SequenceCounter,
    sequencer: Arc<OutputSequencer>,
    stats: Arc<RunStats>,
    workers: JoinSet<()>,
    cancellation_token: CancellationToken,
}

impl<R: CommandRunner> std::fmt::Debug for Executor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.config)
            .field("template", &self.template.source())
            .field("dispatched", &self.sequence.issued())
            .finish_non_exhaustive()
    }
}

impl<R: CommandRunner> Executor<R> {
    /// Creates an executor with `config.slots` slots (at least one) and a
    /// backlog of `BACKLOG_PER_SLOT` workers per slot.
    pub fn new(
        config: Arc<RunConfig>,
        template: CommandTemplate,
        runner: R,
        sink: Arc<dyn OutputSink>,
        cancellation_token: CancellationToken,
    ) -> Self {
        let slots = config.slots.max(1);
        Self {
            template: Arc::new(template),
            runner: Arc::new(runner),
            slots: Arc::new(Semaphore::new(slots)),
            backlog: Arc::new(Semaphore::new(slots.saturating_mul(BACKLOG_PER_SLOT))),
            sequence: SequenceCounter::default(),
            sequencer: Arc::new(OutputSequencer::new(config.keep_order, sink)),
            stats: Arc::new(RunStats::default()),
            workers: JoinSet::new(),
            cancellation_token,
            config,
        }
    }

    /// Number of invocations dispatched so far.
    pub fn dispatched(&self) -> u64 {
        self.sequence.issued()
    }

    /// Enumerates `set` front to back, dispatching every task group.
    ///
    /// Stops early (without touching running invocations) when the run is
    /// cancelled; call [`Self::finish`] afterwards in every case.
    pub async fn dispatch_all(&mut self, set: &mut TaskListSet) -> Result<(), ExecutorError> {
        log::debug!(
            "Dispatching {} combination(s) from {} task list(s).",
            set.size(),
            set.lists().len()
        );
        loop {
            match set.next_group() {
                Ok(group) => self.dispatch_group(group).await?,
                Err(ExhaustedError) => return Ok(()),
            };
        }
    }

    /// Turns one task group into an invocation and starts it, waiting for a
    /// free slot (ordered mode) or backlog space first. Returns its sequence number.
    pub async fn dispatch_group(&mut self, group: TaskGroup) -> Result<u64, ExecutorError> {
        if self.is_cancelled() {
            return Err(ExecutorError::Interrupted);
        }
        self.reap_finished();

        if self.config.dry_run {
            let seq = self.sequence.advance();
            let mut invocation = Invocation::new(seq, self.template.render(&group));
            invocation.mark_dispatched();
            invocation.finish(Outcome::DryRun);
            self.stats.record(&invocation);
            self.sequencer.submit(invocation, None);
            return Ok(seq);
        }

        // Permits first: a dispatch abandoned while waiting must not burn a
        // sequence number, or keep-order output would stall on the gap.
        let backlog = Arc::clone(&self.backlog).acquire_owned().await?;
        let slot = if self.config.ordered {
            Some(Arc::clone(&self.slots).acquire_owned().await?)
        } else {
            None
        };

        let seq = self.sequence.advance();
        let mut invocation = Invocation::new(seq, self.template.render(&group));
        invocation.mark_dispatched();

        let worker = Worker {
            runner: Arc::clone(&self.runner),
            slots: Arc::clone(&self.slots),
            sequencer: Arc::clone(&self.sequencer),
            stats: Arc::clone(&self.stats),
        };
        self.workers.spawn(worker.run(invocation, slot, backlog));
        Ok(seq)
    }

    /// The join point: waits for every dispatched invocation, flushes any
    /// held output and reports the tally.
    pub async fn finish(mut self) -> RunSummary {
        while let Some(result) = self.workers.join_next().await {
            self.absorb(result);
        }
        self.sequencer.flush();

        let summary = RunSummary {
            dispatched: self.sequence.issued(),
            succeeded: self.stats.succeeded.load(SeqCst),
            failed: self.stats.failed.load(SeqCst),
            peak_running: self.stats.peak_running.load(SeqCst),
            interrupted: self.is_cancelled(),
        };
        log::info!("Run finished: {}", summary);
        summary
    }

    fn reap_finished(&mut self) {
        while let Some(result) = self.workers.try_join_next() {
            self.absorb(result);
        }
    }

    fn absorb(&self, result: Result<(), tokio::task::JoinError>) {
        if let Err(e) = result {
            log::error!("A worker task died: {}", e);
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation_token.load(SeqCst)
    }
}

/// Everything a spawned invocation needs, detached from the dispatcher.
struct Worker<R: CommandRunner> {
    runner: Arc<R>,
    slots: Arc<Semaphore>,
    sequencer: Arc<OutputSequencer>,
    stats: Arc<RunStats>,
}

impl<R: CommandRunner> Worker<R> {
    async fn run(
        self,
        mut invocation: Invocation,
        slot: Option<OwnedSemaphorePermit>,
        backlog: OwnedSemaphorePermit,
    ) {
        let slot = match slot {
            Some(permit) => Ok(permit),
            None => Arc::clone(&self.slots).acquire_owned().await,
        };

        match slot {
            Ok(permit) => {
                invocation.mark_running();
                self.stats.enter();
                let outcome = match self.runner.run(invocation.command_line.clone()).await {
                    Ok(output) => Outcome::Exited(output),
                    Err(e) => Outcome::SpawnFailed(e.to_string()),
                };
                self.stats.leave();
                drop(permit);
                invocation.finish(outcome);
            }
            Err(e) => invocation.finish(Outcome::SpawnFailed(e.to_string())),
        }

        if invocation.is_failed() {
            log::warn!(
                "Invocation #{} failed: {}",
                invocation.seq,
                invocation.command_line
            );
        }
        self.stats.record(&invocation);
        // Held output keeps its backlog permit until it is emitted.
        self.sequencer.submit(invocation, Some(backlog));
    }
}
