//! Task engine
//!
//! Registration, dependency graph, execution and dispatch. Nothing in here
//! touches the filesystem or spawns processes; task bodies do that.

mod name;
mod error;
mod task;
mod registry;
mod graph;
mod runner;
mod dispatch;

pub use name::{NameError, TaskName};
pub use error::{Cycle, EngineError};
pub use task::{Task, TaskBody, TaskHandle};
pub use registry::{Registry, TaskBuilder};
pub use graph::DependencyGraph;
pub use runner::{RunEvent, RunObserver, RunState, RunSummary, Runner, Silent, TaskContext};
pub use dispatch::{Dispatcher, Invocation};
