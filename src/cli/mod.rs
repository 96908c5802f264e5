//! Command-line interface for blogforge.
//!
//! Provides commands for processing a single note, running a batch over
//! an inbox directory, and probing external service health.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli};
