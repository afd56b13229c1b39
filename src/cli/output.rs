//! Output formatting for CLI commands

use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::domain::{RunEvent, RunObserver};

/// Output format
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Output helper for consistent formatting
pub struct Output {
    format: OutputFormat,
    verbose: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }

    /// Prints a success message
    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green().bold(), message.green());
    }

    /// Prints structured data as a single JSON line
    pub fn data<T: Serialize>(&self, data: &T) -> serde_json::Result<()> {
        println!("{}", serde_json::to_string(data)?);
        Ok(())
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Returns true if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Prints a verbose debug message (only when --verbose is set)
    pub fn verbose(&self, message: &str) {
        if self.verbose {
            eprintln!("[verbose] {}", message);
        }
    }

    /// Prints a verbose debug message with context (only when --verbose is set)
    pub fn verbose_ctx(&self, context: &str, message: &str) {
        if self.verbose {
            eprintln!("[verbose:{}] {}", context, message);
        }
    }
}

/// Renders run progress on stderr so task output keeps stdout to itself
pub struct Reporter<'a> {
    output: &'a Output,
}

impl<'a> Reporter<'a> {
    pub fn new(output: &'a Output) -> Self {
        Self { output }
    }
}

impl RunObserver for Reporter<'_> {
    fn on_event(&self, event: &RunEvent<'_>) {
        if self.output.is_json() {
            return;
        }

        match event {
            RunEvent::Started { task, direct } => {
                let how = if *direct { " (direct call)" } else { "" };
                eprintln!("{} {}{}", "▶".cyan().bold(), task.as_str().bold(), how);
            }
            RunEvent::Skipped { task } => {
                if self.output.is_verbose() {
                    eprintln!("{} {} already done", "↷".bright_black(), task);
                }
            }
            RunEvent::Finished { task, elapsed } => {
                eprintln!(
                    "{} {} {}",
                    "✓".green().bold(),
                    task,
                    format!("({:.2?})", elapsed).bright_black()
                );
            }
            RunEvent::Failed { task, .. } => {
                eprintln!("{} {} {}", "✗".red().bold(), task, "failed".red());
            }
        }
    }
}
