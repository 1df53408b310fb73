pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod schema;
pub mod traits;
pub mod workflow;

pub use config::AppConfig;
pub use context::{ExecutionContext, LogEntry, LogStatus, NodeResult, RequestId};
pub use error::{FrogError, Result};
pub use event::{EventBus, RunEvent, WorkflowEvent};
pub use schema::{ParamKind, ParamSpec, ParameterSchema};
pub use workflow::{ToolDefinition, Workflow, WorkflowNode};
