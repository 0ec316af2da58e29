//! CLI command handlers.
//!
//! Handlers hold the logic behind each subcommand so it can be tested
//! without going through argument parsing in `main.rs`.

mod assemble;

pub use assemble::run_assemble;

// Re-export config types used by handlers
pub use crate::config::AssembleConfig;
