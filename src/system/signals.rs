// src/system/signals.rs

use crate::{CancellationToken, constants::EXIT_INTERRUPTED};
use std::future::Future;
use std::io;
use std::sync::atomic::Ordering;

/// Sets `cancellation_token` on the first Ctrl+C and exits with 130 on the second.
///
/// Running children are not killed on the first signal: they share the
/// terminal's process group and receive the same SIGINT. The dispatcher
/// notices the flag, stops enumerating and waits for them. The second signal
/// is for children that ignore SIGINT.
pub fn spawn_interrupt_watcher(cancellation_token: CancellationToken) {
    tokio::spawn(watch_interrupts(
        cancellation_token,
        tokio::signal::ctrl_c,
        || {
            eprintln!("Interrupted twice, exiting without waiting for running commands.");
            std::process::exit(EXIT_INTERRUPTED);
        },
    ));
}

/// Waits for interrupts from `next_signal`: the first one cancels the run,
/// the second calls `force_exit`.
pub async fn watch_interrupts<S, F, X>(
    cancellation_token: CancellationToken,
    mut next_signal: S,
    force_exit: X,
) where
    S: FnMut() -> F,
    F: Future<Output = io::Result<()>>,
    X: FnOnce(),
{
    if let Err(e) = next_signal().await {
        log::warn!("Could not listen for Ctrl+C: {}", e);
        return;
    }
    log::debug!("Interrupt received, no further commands will be started.");
    cancellation_token.store(true, Ordering::SeqCst);

    match next_signal().await {
        Ok(()) => {
            log::debug!("Second interrupt received, forcing exit.");
            force_exit();
        }
        Err(e) => log::warn!("Could not listen for a second Ctrl+C: {}", e),
    }
}
