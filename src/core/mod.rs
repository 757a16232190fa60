//! 核心类型层：项目配置、状态投影、错误

pub mod error;
pub mod project;
pub mod state;

pub use error::{CallSite, FailureKind, GenerationFailure, WorkflowError};
pub use project::{ProjectConfig, ProjectFileError, Theme};
pub use state::{
    initial_agents, initial_steps, Agent, AgentRole, AgentStatus, ExecutionStep, LogEntry,
    LogKind, StepId, StepStatus, WorkflowPhase,
};
