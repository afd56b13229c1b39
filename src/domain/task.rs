//! Task definitions
//!
//! A task is a named body plus the ordered list of tasks that must complete
//! before it. Tasks are immutable once handed to the [`Registry`](super::Registry).

use std::fmt;

use super::name::TaskName;
use super::runner::TaskContext;

/// The callable part of a task
pub type TaskBody = Box<dyn Fn(&mut TaskContext<'_>) -> anyhow::Result<()>>;

/// A named unit of work with declared prerequisites
pub struct Task {
    name: TaskName,
    prerequisites: Vec<TaskName>,
    description: Option<String>,
    body: TaskBody,
}

impl Task {
    /// Creates a task with no prerequisites
    pub fn new<F>(name: TaskName, body: F) -> Self
    where
        F: Fn(&mut TaskContext<'_>) -> anyhow::Result<()> + 'static,
    {
        Self {
            name,
            prerequisites: Vec::new(),
            description: None,
            body: Box::new(body),
        }
    }

    /// Appends a prerequisite, referenced by name
    pub fn with_prerequisite(mut self, prerequisite: TaskName) -> Self {
        self.prerequisites.push(prerequisite);
        self
    }

    /// Sets the human-readable description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &TaskName {
        &self.name
    }

    /// Prerequisites in declared order
    pub fn prerequisites(&self) -> &[TaskName] {
        &self.prerequisites
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub(crate) fn invoke(&self, ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        (self.body)(ctx)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("prerequisites", &self.prerequisites)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Proof that a task was registered, used to declare typed dependencies
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    name: TaskName,
}

impl TaskHandle {
    pub(crate) fn new(name: TaskName) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &TaskName {
        &self.name
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.name, f)
    }
}
