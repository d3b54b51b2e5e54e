//! # Output Sequencer
//!
//! Releases finished invocations to an [`OutputSink`]. In keep-order mode an
//! invocation whose predecessors have not been emitted yet is held back until
//! every lower sequence number is out; otherwise output is released as soon
//! as it arrives.

use crate::{models::Invocation, system::output::OutputSink};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OwnedSemaphorePermit;

/// A finished invocation waiting for its predecessors, plus the backlog
/// permit it keeps until it is emitted.
#[derive(Debug)]
struct HeldOutput {
    invocation: Invocation,
    _ticket: Option<OwnedSemaphorePermit>,
}

#[derive(Debug, Default)]
struct SequencerState {
    next_to_emit: u64,
    held: BTreeMap<u64, HeldOutput>,
}

/// Decides when finished invocations reach the sink.
pub struct OutputSequencer {
    keep_order: bool,
    sink: Arc<dyn OutputSink>,
    state: Mutex<SequencerState>,
}

impl std::fmt::Debug for OutputSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSequencer")
            .field("keep_order", &self.keep_order)
            .finish_non_exhaustive()
    }
}

impl OutputSequencer {
    pub fn new(keep_order: bool, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            keep_order,
            sink,
            state: Mutex::new(SequencerState::default()),
        }
    }

    /// Hands a finished invocation over for emission.
    ///
    /// `ticket` is released together with the invocation's output, so held
    /// output never outgrows the number of tickets handed out.
    ///
    /// The lock is held while writing so emission order is exactly the order
    /// decided here, even with many workers submitting at once.
    pub fn submit(&self, mut invocation: Invocation, ticket: Option<OwnedSemaphorePermit>) {
        let mut state = self.lock();
        if !self.keep_order {
            self.release(&mut invocation);
            drop(ticket);
            return;
        }

        state.held.insert(
            invocation.seq,
            HeldOutput {
                invocation,
                _ticket: ticket,
            },
        );
        self.drain_ready(&mut state);
    }

    /// Number of invocations currently waiting for a predecessor.
    pub fn held(&self) -> usize {
        self.lock().held.len()
    }

    /// Emits everything still held, in sequence order, skipping over gaps.
    ///
    /// Gaps only exist when a worker died without submitting; returns how many
    /// invocations had to be forced out.
    pub fn flush(&self) -> usize {
        let mut state = self.lock();
        let stranded = state.held.len();
        if stranded > 0 {
            log::warn!(
                "Flushing {} held output block(s); sequence #{} never completed.",
                stranded,
                state.next_to_emit
            );
        }
        while let Some((seq, mut held)) = state.held.pop_first() {
            self.release(&mut held.invocation);
            state.next_to_emit = seq + 1;
        }
        stranded
    }

    fn drain_ready(&self, state: &mut SequencerState) {
        while let Some(mut held) = state.held.remove(&state.next_to_emit) {
            self.release(&mut held.invocation);
            state.next_to_emit += 1;
        }
        if !state.held.is_empty() {
            log::trace!(
                "Holding {} block(s) until #{} is emitted.",
                state.held.len(),
                state.next_to_emit
            );
        }
    }

    fn release(&self, invocation: &mut Invocation) {
        invocation.mark_emitted();
        self.sink.emit(invocation);
    }

    fn lock(&self) -> MutexGuard<'_, SequencerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
