//! 工作流事件：推送给观察者（终端视图、Web 前端等）的状态变化
//!
//! 观察者只需按最新状态幂等渲染，不需要回执。

use serde::Serialize;

use crate::artifact::ArtifactSet;
use crate::core::{Agent, ExecutionStep, LogEntry, WorkflowPhase};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// 新一轮运行开始，观察者应清空之前的状态
    Reset,
    Phase { phase: WorkflowPhase },
    StepUpdate { step: ExecutionStep },
    AgentUpdate { agent: Agent },
    Log { entry: LogEntry },
    /// 合并之后的完整产物集合
    Artifacts { files: ArtifactSet },
    /// 每次失败的运行恰好一条
    Error { message: String },
}
