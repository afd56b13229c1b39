//! Anvil - a code-defined task runner
//!
//! Tasks are named Rust closures with ordered prerequisites. Running a task
//! runs its prerequisites first, depth-first and left to right, and every
//! task executes at most once per invocation. Cycles and unknown
//! prerequisites are reported before anything runs.
//!
//! ```no_run
//! use anvil_cli::domain::{Dispatcher, Invocation, Registry};
//!
//! # fn main() -> Result<(), anvil_cli::domain::EngineError> {
//! let mut registry = Registry::new();
//! let build = registry.task("build").run(|_| Ok(()))?;
//! let test = registry.task("test").depends_on(&build).run(|ctx| {
//!     println!("testing with {:?}", ctx.args());
//!     Ok(())
//! })?;
//! registry.set_default(&test)?;
//!
//! Dispatcher::new(&registry).dispatch(&Invocation::from_args(std::env::args().skip(1)))?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod workflow;

pub use config::Config;
pub use domain::{EngineError, Registry, Task, TaskContext, TaskHandle, TaskName};
