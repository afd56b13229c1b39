//! # Command-Line Interface
//!
//! Argument parsing, configuration loading and output formatting for the
//! `anvil` binary.
//!
//! ## Usage
//!
//! ```bash
//! anvil                      # run the default task
//! anvil test -- --nocapture  # run `test`, forwarding the rest
//! anvil --plan release       # show what `release` would run
//! anvil --list               # show registered tasks
//! ```
//!
//! Everything after the task name is passed to that task. Progress goes to
//! stderr so a task's own output is all that lands on stdout.
//!
//! ## Output Formats
//!
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON for `--list`, `--plan` and run summaries
//!
//! ## Entry Point
//!
//! Call [`run()`] for the built-in workflow, or [`run_with()`] to drive the
//! CLI from a registry of your own.

mod app;
mod output;

pub use app::{run, run_with, Cli, LOG_ENV};
pub use output::{Output, OutputFormat, Reporter};
