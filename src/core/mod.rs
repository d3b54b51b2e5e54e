// src/core/mod.rs

pub mod config_loader;
pub mod paths;
pub mod range;
pub mod resolver;
pub mod sequencer;
pub mod task_executor;
pub mod tasks;
pub mod template;
