//! Execution engine
//!
//! Runs a task after its prerequisites, depth-first and left-to-right, and
//! records every completed task in a per-invocation [`RunState`] so that no
//! body runs twice in one invocation.
//!
//! Task bodies get a [`TaskContext`] exposing two deliberately different
//! operations:
//! - [`TaskContext::require`] runs another task as a prerequisite. It honours
//!   the run-state: a task that already completed is skipped.
//! - [`TaskContext::call`] invokes another task's body directly. It bypasses
//!   the graph and the run-state: the callee's prerequisites are not run and
//!   the body runs every time it is called.
//!
//! Execution is single-threaded. A failing body stops the run; side effects of
//! tasks that already completed are not undone.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use super::error::{Cycle, EngineError};
use super::name::TaskName;
use super::registry::Registry;
use super::task::Task;

/// Something that happened while running tasks
#[derive(Debug)]
pub enum RunEvent<'a> {
    /// A body is about to run; `direct` is true for [`TaskContext::call`]
    Started { task: &'a TaskName, direct: bool },

    /// The task already completed in this invocation
    Skipped { task: &'a TaskName },

    Finished { task: &'a TaskName, elapsed: Duration },

    Failed { task: &'a TaskName, error: &'a anyhow::Error },
}

/// Receives [`RunEvent`]s as the engine runs
pub trait RunObserver {
    fn on_event(&self, event: &RunEvent<'_>);
}

impl<F> RunObserver for F
where
    F: Fn(&RunEvent<'_>),
{
    fn on_event(&self, event: &RunEvent<'_>) {
        self(event)
    }
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl RunObserver for Silent {
    fn on_event(&self, _: &RunEvent<'_>) {}
}

/// Per-invocation memoization state
#[derive(Debug, Default)]
pub struct RunState {
    completed: HashSet<TaskName>,

    /// Tasks whose prerequisites or body are currently running
    in_progress: Vec<TaskName>,

    /// Bodies run through the graph, in order
    executed: Vec<TaskName>,

    /// Bodies run through [`TaskContext::call`], in order
    direct: Vec<TaskName>,
}

impl RunState {
    /// Creates an empty run-state
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the task's body already completed in this run
    pub fn is_completed(&self, name: &str) -> bool {
        self.completed.contains(name)
    }

    /// Bodies run as prerequisites or targets, in execution order
    pub fn executed(&self) -> &[TaskName] {
        &self.executed
    }

    /// Bodies run directly, in execution order
    pub fn direct_calls(&self) -> &[TaskName] {
        &self.direct
    }

    fn begin(&mut self, name: &TaskName) -> Result<(), EngineError> {
        if let Some(start) = self.in_progress.iter().position(|n| n == name) {
            let mut path = self.in_progress[start..].to_vec();
            path.push(name.clone());
            return Err(EngineError::CyclicDependency(Cycle::new(path)));
        }

        self.in_progress.push(name.clone());
        Ok(())
    }

    fn end(&mut self) {
        self.in_progress.pop();
    }

    fn complete(&mut self, name: &TaskName) {
        self.completed.insert(name.clone());
        self.executed.push(name.clone());
    }
}

/// Outcome of a successful invocation
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub target: TaskName,
    pub executed: Vec<TaskName>,
    pub direct_calls: Vec<TaskName>,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

fn as_millis<S: serde::Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u128(elapsed.as_millis())
}

/// Runs tasks from a registry
pub struct Runner<'r> {
    registry: &'r Registry,
    observer: &'r dyn RunObserver,
}

impl<'r> Runner<'r> {
    /// Creates a runner that reports nothing
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            observer: &Silent,
        }
    }

    /// Sends run events to `observer`
    pub fn with_observer(mut self, observer: &'r dyn RunObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Runs `name` with a fresh run-state
    ///
    /// The whole registry is validated first, so an unknown prerequisite or a
    /// cycle anywhere is reported before any body executes.
    pub fn invoke(&self, name: &str, args: &[String]) -> Result<RunSummary, EngineError> {
        let task = self.registry.lookup(name)?;
        self.registry.validate()?;

        let started = Instant::now();
        let mut state = RunState::new();
        self.run(task, args, &mut state)?;

        Ok(RunSummary {
            target: task.name().clone(),
            executed: state.executed,
            direct_calls: state.direct,
            elapsed: started.elapsed(),
        })
    }

    /// Runs `task` as part of the graph
    ///
    /// Prerequisites run first in declared order with no arguments; only
    /// `task` itself receives `args`. Already completed tasks are skipped.
    pub fn run(&self, task: &Task, args: &[String], state: &mut RunState) -> Result<(), EngineError> {
        let name = task.name();

        if state.is_completed(name.as_str()) {
            debug!(task = %name, "already completed, skipping");
            self.observer.on_event(&RunEvent::Skipped { task: name });
            return Ok(());
        }

        state.begin(name)?;
        let result = self.run_prerequisites(task, state).and_then(|()| {
            self.execute(task, args, state, false)
        });
        state.end();

        result?;
        state.complete(name);
        Ok(())
    }

    /// Looks up `name` and runs it as part of the graph
    pub fn run_named(&self, name: &str, args: &[String], state: &mut RunState) -> Result<(), EngineError> {
        let task = self.registry.lookup(name)?;
        self.run(task, args, state)
    }

    /// Invokes the body of `task` directly, skipping the graph and run-state
    ///
    /// A callee already running further up, through the graph or another
    /// direct call, is reported as a cycle.
    pub fn call(&self, task: &Task, args: &[String], state: &mut RunState) -> Result<(), EngineError> {
        state.begin(task.name())?;
        let result = self.execute(task, args, state, true);
        state.end();

        result?;
        state.direct.push(task.name().clone());
        Ok(())
    }

    fn run_prerequisites(&self, task: &Task, state: &mut RunState) -> Result<(), EngineError> {
        for prerequisite in task.prerequisites() {
            let dep = self.registry.get(prerequisite.as_str()).ok_or_else(|| {
                EngineError::UnknownPrerequisite {
                    task: task.name().clone(),
                    prerequisite: prerequisite.to_string(),
                }
            })?;
            self.run(dep, &[], state)?;
        }
        Ok(())
    }

    fn execute(&self, task: &Task, args: &[String], state: &mut RunState, direct: bool) -> Result<(), EngineError> {
        let name = task.name();
        debug!(task = %name, ?args, direct, "running task");
        self.observer.on_event(&RunEvent::Started { task: name, direct });

        let started = Instant::now();
        let mut ctx = TaskContext {
            runner: self,
            task,
            args,
            state,
        };

        match task.invoke(&mut ctx) {
            Ok(()) => {
                let elapsed = started.elapsed();
                debug!(task = %name, elapsed_ms = elapsed.as_millis() as u64, "task finished");
                self.observer.on_event(&RunEvent::Finished { task: name, elapsed });
                Ok(())
            }
            // Errors from nested require/call were reported where they happened
            Err(error) => match error.downcast::<EngineError>() {
                Ok(nested) => {
                    debug!(task = %name, error = %nested, "nested task failed");
                    Err(nested)
                }
                Err(error) => {
                    let message = format!("{:#}", error);
                    warn!(task = %name, error = %message, "task failed");
                    self.observer.on_event(&RunEvent::Failed { task: name, error: &error });
                    Err(EngineError::TaskExecution {
                        task: name.clone(),
                        source: error,
                    })
                }
            },
        }
    }
}

/// What a task body sees while it runs
pub struct TaskContext<'a> {
    runner: &'a Runner<'a>,
    task: &'a Task,
    args: &'a [String],
    state: &'a mut RunState,
}

impl TaskContext<'_> {
    /// Name of the running task
    pub fn name(&self) -> &TaskName {
        self.task.name()
    }

    /// Positional arguments passed to this task
    pub fn args(&self) -> &[String] {
        self.args
    }

    /// Positional argument `index`, if present
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Runs `name` as a prerequisite, unless it already completed in this run
    pub fn require(&mut self, name: &str) -> Result<(), EngineError> {
        self.runner.run_named(name, &[], self.state)
    }

    /// Invokes the body of `name` directly with `args`
    ///
    /// Unlike [`require`](Self::require) this always runs the body and does not
    /// run the callee's prerequisites.
    pub fn call<S: AsRef<str>>(&mut self, name: &str, args: &[S]) -> Result<(), EngineError> {
        let task = self.runner.registry().lookup(name)?;
        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
        self.runner.call(task, &args, self.state)
    }

    /// True if `name` already completed in this run
    pub fn is_completed(&self, name: &str) -> bool {
        self.state.is_completed(name)
    }
}
