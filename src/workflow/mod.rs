//! 工作流：步骤编排、状态看板、观察者通道、细化与导出

pub mod board;
pub mod builder;
pub mod engine;
pub mod events;
pub mod export;
pub mod refine;
pub mod sink;

pub use board::{BoardSnapshot, StateBoard};
pub use builder::{create_llm_from_config, ForgeBuilder};
pub use engine::Forge;
pub use events::WorkflowEvent;
pub use export::{export_artifacts, project_dir_name};
pub use refine::{refine_artifacts, refine_prompt, RefineOutcome, RefineStatus};
pub use sink::{ChannelSink, NullSink, RecordingSink, WorkflowSink};
