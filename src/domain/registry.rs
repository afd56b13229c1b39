//! Task registry
//!
//! The registry owns every task for the lifetime of the program. It is filled
//! during an explicit setup phase and only read afterwards; nothing is ever
//! removed.
//!
//! Dependencies can be declared two ways:
//! - [`TaskBuilder::depends_on`] takes a [`TaskHandle`] returned by an earlier
//!   registration, so the prerequisite is known to exist.
//! - [`TaskBuilder::depends_on_named`] takes a plain name that is resolved
//!   lazily when the [`DependencyGraph`](super::DependencyGraph) is built.
//!   This is the only way to express a forward reference (and thus a cycle).

use std::collections::HashMap;

use tracing::debug;

use super::error::EngineError;
use super::graph::DependencyGraph;
use super::name::TaskName;
use super::runner::TaskContext;
use super::task::{Task, TaskHandle};

/// Owned collection of tasks plus the default task
#[derive(Debug, Default)]
pub struct Registry {
    /// Tasks in registration order
    tasks: Vec<Task>,

    /// Map from task name to position in `tasks`
    index: HashMap<TaskName, usize>,

    default: Option<TaskName>,
}

impl Registry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts declaring a task called `name`
    pub fn task(&mut self, name: impl Into<String>) -> TaskBuilder<'_> {
        TaskBuilder {
            registry: self,
            name: name.into(),
            prerequisites: Vec::new(),
            checked: Vec::new(),
            description: None,
        }
    }

    /// Adds a fully built task
    ///
    /// Prerequisites are taken as forward references and checked when the
    /// dependency graph is built.
    pub fn register(&mut self, task: Task) -> Result<TaskHandle, EngineError> {
        if self.index.contains_key(task.name()) {
            return Err(EngineError::DuplicateTask(task.name().clone()));
        }

        let name = task.name().clone();
        debug!(task = %name, prerequisites = ?task.prerequisites(), "registered task");

        self.index.insert(name.clone(), self.tasks.len());
        self.tasks.push(task);

        Ok(TaskHandle::new(name))
    }

    /// Looks up a task by name
    pub fn lookup(&self, name: &str) -> Result<&Task, EngineError> {
        self.get(name)
            .ok_or_else(|| EngineError::UnknownTask(name.to_string()))
    }

    /// Returns the task if registered
    pub fn get(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|&i| &self.tasks[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Marks the task to run when no task name is given.
    ///
    /// Calling this again replaces the previous default (last call wins).
    pub fn set_default(&mut self, task: &TaskHandle) -> Result<(), EngineError> {
        if !self.contains(task.name().as_str()) {
            return Err(EngineError::UnknownTask(task.name().to_string()));
        }

        self.default = Some(task.name().clone());
        Ok(())
    }

    /// Returns the default task, if one was set
    pub fn default_task(&self) -> Option<&Task> {
        self.default.as_ref().and_then(|name| self.get(name.as_str()))
    }

    /// Iterates tasks in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Builds the dependency graph and checks it for cycles
    pub fn validate(&self) -> Result<DependencyGraph, EngineError> {
        let graph = DependencyGraph::from_registry(self)?;
        graph.validate()?;
        Ok(graph)
    }
}

/// Builder returned by [`Registry::task`]; nothing is registered until
/// [`TaskBuilder::run`] is called
pub struct TaskBuilder<'r> {
    registry: &'r mut Registry,
    name: String,
    prerequisites: Vec<TaskName>,
    /// Prerequisites given as handles, which must already be registered
    checked: Vec<TaskName>,
    description: Option<String>,
}

impl TaskBuilder<'_> {
    /// Adds a description shown by `--list`
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a prerequisite registered earlier
    pub fn depends_on(mut self, task: &TaskHandle) -> Self {
        self.prerequisites.push(task.name().clone());
        self.checked.push(task.name().clone());
        self
    }

    /// Adds a prerequisite by name, resolved when the graph is built
    pub fn depends_on_named(mut self, name: impl Into<String>) -> Result<Self, EngineError> {
        let name = TaskName::new(name)?;
        self.prerequisites.push(name);
        Ok(self)
    }

    /// Registers the task with `body` and returns its handle
    pub fn run<F>(self, body: F) -> Result<TaskHandle, EngineError>
    where
        F: Fn(&mut TaskContext<'_>) -> anyhow::Result<()> + 'static,
    {
        let name = TaskName::new(self.name)?;

        if let Some(missing) = self.checked.iter().find(|p| !self.registry.contains(p.as_str())) {
            return Err(EngineError::UnknownPrerequisite {
                task: name,
                prerequisite: missing.to_string(),
            });
        }

        let mut task = Task::new(name, body);
        for prerequisite in self.prerequisites {
            task = task.with_prerequisite(prerequisite);
        }
        if let Some(description) = self.description {
            task = task.with_description(description);
        }

        self.registry.register(task)
    }
}

/// Registers a function as a task named after the function itself.
///
/// ```rust,ignore
/// let lint = register_fn!(registry, lint)?;
/// let test = register_fn!(registry, test, [lint])?;
/// ```
#[macro_export]
macro_rules! register_fn {
    ($registry:expr, $body:ident) => {
        $registry.task(stringify!($body)).run($body)
    };
    ($registry:expr, $body:ident, [$($dep:expr),* $(,)?]) => {
        $registry.task(stringify!($body))$(.depends_on(&$dep))*.run($body)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut TaskContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = Registry::new();
        let handle = registry
            .task("build")
            .describe("Compile everything")
            .run(noop)
            .unwrap();

        assert_eq!(handle.name().as_str(), "build");
        assert_eq!(registry.len(), 1);

        let task = registry.lookup("build").unwrap();
        assert_eq!(task.description(), Some("Compile everything"));
        assert!(task.prerequisites().is_empty());
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut registry = Registry::new();
        registry.task("build").run(noop).unwrap();

        let result = registry.task("build").run(noop);
        assert!(matches!(result, Err(EngineError::DuplicateTask(name)) if name.as_str() == "build"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn invalid_name_rejected() {
        let mut registry = Registry::new();
        let result = registry.task("--build").run(noop);
        assert!(matches!(result, Err(EngineError::InvalidTaskName(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn unknown_lookup() {
        let registry = Registry::new();
        assert!(matches!(
            registry.lookup("missing"),
            Err(EngineError::UnknownTask(name)) if name == "missing"
        ));
    }

    #[test]
    fn handle_from_other_registry_rejected() {
        let mut other = Registry::new();
        let foreign = other.task("lint").run(noop).unwrap();

        let mut registry = Registry::new();
        let result = registry.task("test").depends_on(&foreign).run(noop);

        assert!(matches!(
            result,
            Err(EngineError::UnknownPrerequisite { prerequisite, .. }) if prerequisite == "lint"
        ));
    }

    #[test]
    fn prerequisites_keep_declared_order() {
        let mut registry = Registry::new();
        let a = registry.task("a").run(noop).unwrap();
        let b = registry.task("b").run(noop).unwrap();
        registry
            .task("c")
            .depends_on(&b)
            .depends_on(&a)
            .depends_on_named("later")
            .unwrap()
            .run(noop)
            .unwrap();

        let names: Vec<_> = registry
            .lookup("c")
            .unwrap()
            .prerequisites()
            .iter()
            .map(|n| n.as_str())
            .collect();
        assert_eq!(names, vec!["b", "a", "later"]);
    }

    #[test]
    fn default_last_call_wins() {
        let mut registry = Registry::new();
        assert!(registry.default_task().is_none());

        let a = registry.task("a").run(noop).unwrap();
        let b = registry.task("b").run(noop).unwrap();

        registry.set_default(&a).unwrap();
        registry.set_default(&b).unwrap();

        assert_eq!(registry.default_task().unwrap().name().as_str(), "b");
    }

    #[test]
    fn default_must_be_registered() {
        let mut other = Registry::new();
        let foreign = other.task("x").run(noop).unwrap();

        let mut registry = Registry::new();
        assert!(matches!(
            registry.set_default(&foreign),
            Err(EngineError::UnknownTask(_))
        ));
    }

    #[test]
    fn iter_in_registration_order() {
        let mut registry = Registry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.task(name).run(noop).unwrap();
        }

        let names: Vec<_> = registry.iter().map(|t| t.name().as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn register_fn_uses_function_name() {
        fn lint(_: &mut TaskContext<'_>) -> anyhow::Result<()> {
            Ok(())
        }
        fn test(_: &mut TaskContext<'_>) -> anyhow::Result<()> {
            Ok(())
        }

        let mut registry = Registry::new();
        let lint_handle = register_fn!(registry, lint).unwrap();
        register_fn!(registry, test, [lint_handle]).unwrap();

        let task = registry.lookup("test").unwrap();
        assert_eq!(task.prerequisites()[0].as_str(), "lint");
    }

    #[test]
    fn registration_does_not_run_bodies() {
        use std::cell::Cell;
        use std::rc::Rc;

        let ran = Rc::new(Cell::new(false));
        let flag = ran.clone();

        let mut registry = Registry::new();
        registry
            .task("side-effect")
            .run(move |_| {
                flag.set(true);
                Ok(())
            })
            .unwrap();
        registry.validate().unwrap();

        assert!(!ran.get());
    }
}
