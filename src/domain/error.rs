//! Engine error taxonomy

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::name::{NameError, TaskName};

/// An ordered dependency cycle; the first and last names are the same task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Cycle(Vec<TaskName>);

impl Cycle {
    pub(crate) fn new(path: Vec<TaskName>) -> Self {
        Self(path)
    }

    /// Task names along the cycle, closing name included
    pub fn tasks(&self) -> &[TaskName] {
        &self.0
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, name) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{}", name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Task already registered: {0}")]
    DuplicateTask(TaskName),

    #[error(transparent)]
    InvalidTaskName(#[from] NameError),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Task '{task}' depends on unknown task '{prerequisite}'")]
    UnknownPrerequisite { task: TaskName, prerequisite: String },

    #[error("No task given and no default task is configured")]
    NoDefaultTask,

    #[error("Cyclic dependency: {0}")]
    CyclicDependency(Cycle),

    #[error("Task '{task}' failed")]
    TaskExecution {
        task: TaskName,
        #[source]
        source: anyhow::Error,
    },
}

impl EngineError {
    /// Name of the task whose body failed, if this is an execution failure
    pub fn failed_task(&self) -> Option<&TaskName> {
        match self {
            EngineError::TaskExecution { task, .. } => Some(task),
            _ => None,
        }
    }
}
