//! fanrun: run a command template over the cross-product of its input lists,
//! on a bounded number of parallel slots.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Shared stop flag, set on Ctrl+C and polled by the dispatcher.
pub type CancellationToken = Arc<AtomicBool>;

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod system;
