pub mod context;
pub mod executor;
pub mod run_log;
pub mod runner;
pub mod scheduler;
pub mod summary;
pub mod template;
pub mod validate;

pub use context::ContextBuilder;
pub use executor::NodeExecutor;
pub use run_log::RunLogger;
pub use runner::{EventStream, RunOutcome, WorkflowRunner};
pub use scheduler::{execution_order, ReadyQueue};
pub use summary::summarize;
pub use template::default_workflow;
pub use validate::{is_valid, validate};
