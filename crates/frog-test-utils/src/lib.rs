//! Mocks, fakes and workflow fixtures shared by the frog test suites.

pub mod fixtures;
pub mod secrets;
pub mod tools;

pub use fixtures::{
    cyclic_workflow, dangling_workflow, diamond_workflow, fan_out_workflow, linear_workflow,
    mock_node,
};
pub use secrets::FakeSecretStore;
pub use tools::{ContextProbeTool, FailingTool, MockTool, PanicTool, SlowTool};
