// EN: src/bin/fanrun.rs

use colored::*;
use fanrun::{
    cli::{Cli, handlers},
    constants::EXIT_INTERRUPTED,
    core::task_executor::ExecutorError,
    system::signals,
};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// The main entry point of the `fanrun` application.
/// It sets up logging, parses arguments, runs the handler,
/// and performs centralized error handling.
#[tokio::main]
async fn main() {
    env_logger::init();
    let parsed = Cli::parse_with_sources();
    log::debug!("CLI args parsed: {:?}", parsed);

    let cancellation_token = Arc::new(AtomicBool::new(false));
    signals::spawn_interrupt_watcher(Arc::clone(&cancellation_token));

    // --- Centralized Error Handling ---
    if let Err(e) = handlers::run::handle(parsed, &cancellation_token).await {
        // An interrupted run exits silently with the shell's interruption code.
        if let Some(ExecutorError::Interrupted) = e.downcast_ref::<ExecutorError>() {
            std::process::exit(EXIT_INTERRUPTED);
        }

        // Everything else is fatal: print it and exit with a failure code.
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}
