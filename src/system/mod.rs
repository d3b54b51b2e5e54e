//! # System Interaction Layer
//!
//! This module provides abstractions for interacting with the underlying operating system.
//! It serves as a boundary between the task engine and the specifics of process
//! management and terminal output.
//!
//! ## Modules
//!
//! - **`executor`**: Spawns external processes and captures their output. The engine only
//!   sees the `CommandRunner` trait, so the process layer can be swapped out in tests.
//! - **`output`**: Writes finished invocations to the terminal.
//! - **`signals`**: Turns Ctrl+C into a cancellation request.

pub mod executor;
pub mod output;
pub mod signals;
