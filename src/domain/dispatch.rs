//! Invocation dispatch
//!
//! Turns "task name (maybe) plus trailing arguments" into a run: picks the
//! target, falling back to the default task, and hands it to the [`Runner`].

use tracing::info;

use super::error::EngineError;
use super::name::TaskName;
use super::registry::Registry;
use super::runner::{RunObserver, RunSummary, Runner, Silent};
use super::task::Task;

/// A requested task plus the arguments forwarded to it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub task: Option<String>,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(task: Option<String>, args: Vec<String>) -> Self {
        Self { task, args }
    }

    /// Splits a raw argument list: the first token that does not start with
    /// `-` names the task, everything after it is forwarded
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        match args.next() {
            Some(first) if !first.starts_with('-') => Self::new(Some(first), args.collect()),
            Some(first) => Self::new(None, std::iter::once(first).chain(args).collect()),
            None => Self::default(),
        }
    }
}

/// Resolves invocations against a registry
pub struct Dispatcher<'r> {
    registry: &'r Registry,
    default_override: Option<String>,
}

impl<'r> Dispatcher<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            default_override: None,
        }
    }

    /// Uses `name` instead of the registry's default task
    pub fn with_default(mut self, name: Option<String>) -> Self {
        self.default_override = name;
        self
    }

    /// Picks the task to run: explicit name, then override, then registry default
    pub fn resolve(&self, invocation: &Invocation) -> Result<&'r Task, EngineError> {
        match invocation.task.as_deref().or(self.default_override.as_deref()) {
            Some(name) => self.registry.lookup(name),
            None => self.registry.default_task().ok_or(EngineError::NoDefaultTask),
        }
    }

    /// Lists what running the invocation would execute, without running it
    pub fn plan(&self, invocation: &Invocation) -> Result<Vec<TaskName>, EngineError> {
        let task = self.resolve(invocation)?;
        let graph = self.registry.validate()?;
        graph.execution_order(task.name().as_str())
    }

    /// Runs the invocation with a fresh run-state
    pub fn dispatch(&self, invocation: &Invocation) -> Result<RunSummary, EngineError> {
        self.dispatch_observed(invocation, &Silent)
    }

    /// Like [`dispatch`](Self::dispatch), reporting progress to `observer`
    pub fn dispatch_observed(
        &self,
        invocation: &Invocation,
        observer: &dyn RunObserver,
    ) -> Result<RunSummary, EngineError> {
        let task = self.resolve(invocation)?;
        info!(task = %task.name(), args = ?invocation.args, "dispatching");

        Runner::new(self.registry)
            .with_observer(observer)
            .invoke(task.name().as_str(), &invocation.args)
    }
}
