//! StateBoard：面向 UI 的状态容器
//!
//! 编排器只通过这里的更新操作（记录日志、设置 Agent、推进步骤、合并产物）改变状态；
//! 每次更新后把对应事件推给 WorkflowSink。锁只在同步代码内持有，不跨 await。

use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::artifact::{Artifact, ArtifactSet, MergeReport};
use crate::core::state::SYSTEM_AGENT_ID;
use crate::core::{
    initial_agents, initial_steps, Agent, AgentStatus, ExecutionStep, LogEntry, LogKind,
    ProjectConfig, StepId, StepStatus, WorkflowPhase,
};
use crate::workflow::{WorkflowEvent, WorkflowSink};

/// 状态快照（可序列化给前端）
#[derive(Debug, Clone, Serialize)]
pub struct BoardSnapshot {
    pub project: Option<ProjectConfig>,
    pub phase: WorkflowPhase,
    pub agents: Vec<Agent>,
    pub steps: Vec<ExecutionStep>,
    pub logs: Vec<LogEntry>,
    pub artifacts: ArtifactSet,
    /// 最近一次向用户展示的错误
    pub error: Option<String>,
}

impl Default for BoardSnapshot {
    fn default() -> Self {
        Self {
            project: None,
            phase: WorkflowPhase::Idle,
            agents: initial_agents(),
            steps: initial_steps(),
            logs: Vec::new(),
            artifacts: ArtifactSet::new(),
            error: None,
        }
    }
}

pub struct StateBoard {
    state: Mutex<BoardSnapshot>,
    sink: Arc<dyn WorkflowSink>,
}

impl StateBoard {
    pub fn new(sink: Arc<dyn WorkflowSink>) -> Self {
        Self {
            state: Mutex::new(BoardSnapshot::default()),
            sink,
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut BoardSnapshot) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        self.with_state(|s| s.clone())
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.with_state(|s| s.phase)
    }

    pub fn project(&self) -> Option<ProjectConfig> {
        self.with_state(|s| s.project.clone())
    }

    pub fn artifacts(&self) -> ArtifactSet {
        self.with_state(|s| s.artifacts.clone())
    }

    /// 新一轮运行：清空产物、日志、错误，Agent 与步骤回到初始状态
    pub fn reset(&self, project: &ProjectConfig) {
        self.with_state(|s| {
            *s = BoardSnapshot {
                project: Some(project.clone()),
                ..BoardSnapshot::default()
            };
        });
        self.sink.emit(WorkflowEvent::Reset);
    }

    pub fn set_phase(&self, phase: WorkflowPhase) {
        self.with_state(|s| s.phase = phase);
        self.sink.emit(WorkflowEvent::Phase { phase });
    }

    pub fn set_step(&self, step: StepId, status: StepStatus) {
        let updated = self.with_state(|s| {
            s.steps.iter_mut().find(|e| e.id == step.number()).map(|e| {
                e.status = status;
                e.clone()
            })
        });
        if let Some(step) = updated {
            self.sink.emit(WorkflowEvent::StepUpdate { step });
        }
    }

    pub fn set_agent(&self, id: &str, status: AgentStatus, message: impl Into<String>) {
        let message = message.into();
        let updated = self.with_state(|s| {
            s.agents.iter_mut().find(|a| a.id == id).map(|a| {
                a.status = status;
                a.message = message;
                a.clone()
            })
        });
        match updated {
            Some(agent) => self.sink.emit(WorkflowEvent::AgentUpdate { agent }),
            None => tracing::warn!(agent_id = id, "Status update for unknown agent"),
        }
    }

    pub fn agent_name(&self, id: &str) -> Option<String> {
        self.with_state(|s| s.agents.iter().find(|a| a.id == id).map(|a| a.name.clone()))
    }

    pub fn log(&self, agent_id: &str, message: impl Into<String>, kind: LogKind) {
        let entry = LogEntry::new(agent_id, message, kind);
        self.with_state(|s| s.logs.push(entry.clone()));
        self.sink.emit(WorkflowEvent::Log { entry });
    }

    pub fn system_log(&self, message: impl Into<String>, kind: LogKind) {
        self.log(SYSTEM_AGENT_ID, message, kind);
    }

    /// 合并产物；没有任何文件变化时不推送事件
    pub fn merge_artifacts(&self, files: Vec<Artifact>) -> MergeReport {
        let (report, files) = self.with_state(|s| {
            let report = s.artifacts.merge(files);
            (report, s.artifacts.clone())
        });
        if !report.is_empty() {
            self.sink.emit(WorkflowEvent::Artifacts { files });
        }
        report
    }

    /// 用户可见错误：写入 error、记录错误日志并推送 Error 事件
    pub fn report_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.with_state(|s| s.error = Some(message.clone()));
        self.system_log(message.clone(), LogKind::Error);
        self.sink.emit(WorkflowEvent::Error { message });
    }
}
