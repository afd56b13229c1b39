//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat, Reporter};
use crate::config::Config;
use crate::domain::{Dispatcher, Invocation, Registry, RunSummary};
use crate::workflow;

/// Environment variable holding a tracing filter directive
pub const LOG_ENV: &str = "ANVIL_LOG";

#[derive(Parser)]
#[command(name = "anvil")]
#[command(author, version, about = "Run project tasks and their prerequisites")]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', value_enum)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Project configuration file (defaults to the nearest anvil.toml)
    #[arg(long, short = 'c', env = "ANVIL_CONFIG")]
    pub config: Option<PathBuf>,

    /// List registered tasks and exit
    #[arg(long, short = 'l', conflicts_with = "plan")]
    pub list: bool,

    /// Print the tasks a run would execute, in order, without running them
    #[arg(long, short = 'p')]
    pub plan: bool,

    /// Task to run followed by the arguments passed to it
    #[arg(value_name = "TASK [ARGS]", trailing_var_arg = true)]
    pub command: Vec<String>,
}

/// Runs the CLI with the built-in workflow
pub fn run() -> Result<()> {
    run_with(|config| Ok(workflow::registry(config)?))
}

/// Runs the CLI against the registry produced by `build`
pub fn run_with<F>(build: F) -> Result<()>
where
    F: FnOnce(&Config) -> Result<Registry>,
{
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;
    let format = cli.format.unwrap_or(config.global.default_format);
    let output = Output::new(format, cli.verbose);

    match &config.source {
        Some(path) => output.verbose_ctx("config", &format!("loaded {}", path.display())),
        None => output.verbose_ctx("config", "no anvil.toml found, using defaults"),
    }

    let registry = build(&config)?;
    output.verbose(&format!("{} tasks registered", registry.len()));

    let dispatcher = Dispatcher::new(&registry).with_default(config.project.default_task.clone());
    let invocation = Invocation::from_args(cli.command);

    if cli.list {
        return list_tasks(&output, &registry, config.project.default_task.as_deref());
    }

    if cli.plan {
        return show_plan(&output, &dispatcher, &invocation);
    }

    let reporter = Reporter::new(&output);
    let summary = dispatcher.dispatch_observed(&invocation, &reporter)?;
    show_summary(&output, &summary)
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "anvil_cli=debug" } else { "error" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

    // A second init (tests driving run_with) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Serialize)]
struct TaskEntry<'a> {
    name: &'a str,
    description: Option<&'a str>,
    prerequisites: Vec<&'a str>,
    default: bool,
}

fn list_tasks(output: &Output, registry: &Registry, default_override: Option<&str>) -> Result<()> {
    let default = default_override.or_else(|| registry.default_task().map(|t| t.name().as_str()));

    let entries: Vec<TaskEntry<'_>> = registry
        .iter()
        .map(|task| TaskEntry {
            name: task.name().as_str(),
            description: task.description(),
            prerequisites: task.prerequisites().iter().map(|p| p.as_str()).collect(),
            default: Some(task.name().as_str()) == default,
        })
        .collect();

    if output.is_json() {
        output.data(&entries)?;
        return Ok(());
    }

    if entries.is_empty() {
        println!("No tasks registered.");
        return Ok(());
    }

    let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0);

    println!("{}", "Tasks:".bold());
    for entry in &entries {
        let mut line = format!("  {:<width$}  {}", entry.name, entry.description.unwrap_or(""));
        if !entry.prerequisites.is_empty() {
            line.push_str(&format!(" [after: {}]", entry.prerequisites.join(", ")));
        }
        if entry.default {
            println!("{} {}", line, "(default)".cyan());
        } else {
            println!("{}", line);
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct Plan<'a> {
    target: &'a str,
    order: Vec<&'a str>,
}

fn show_plan(output: &Output, dispatcher: &Dispatcher<'_>, invocation: &Invocation) -> Result<()> {
    let order = dispatcher.plan(invocation)?;

    if output.is_json() {
        let plan = Plan {
            target: order.last().map(|n| n.as_str()).unwrap_or(""),
            order: order.iter().map(|n| n.as_str()).collect(),
        };
        output.data(&plan)?;
        return Ok(());
    }

    for (i, name) in order.iter().enumerate() {
        println!("{}. {}", i + 1, name);
    }

    Ok(())
}

fn show_summary(output: &Output, summary: &RunSummary) -> Result<()> {
    if output.is_json() {
        output.data(summary)?;
        return Ok(());
    }

    let count = summary.executed.len() + summary.direct_calls.len();
    output.success(&format!(
        "{} finished ({} task{} in {:.2?})",
        summary.target,
        count,
        if count == 1 { "" } else { "s" },
        summary.elapsed
    ));

    Ok(())
}
