//! 状态定义：Agent、执行步骤、日志与工作流阶段
//!
//! 这些类型只用于展示与进度跟踪，不参与生成内容本身；由 StateBoard 持有并推送给观察者。

use serde::{Deserialize, Serialize};

/// 系统日志使用的 agent_id
pub const SYSTEM_AGENT_ID: &str = "system";

pub const PLANNER_ID: &str = "1";
pub const ARCHITECT_ID: &str = "2";
pub const DESIGNER_ID: &str = "3";
pub const ENGINEER_ID: &str = "4";
pub const QA_ID: &str = "5";

/// Agent 角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Planner,
    Architect,
    Designer,
    Engineer,
    Qa,
    Devops,
}

/// Agent 状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Working,
    /// 等待其他 Agent 回答澄清问题
    Waiting,
    Done,
}

/// 参与协作的 Agent（人设）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub role: AgentRole,
    pub status: AgentStatus,
    pub message: String,
}

impl Agent {
    fn idle(id: &str, name: &str, role: AgentRole, message: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            role,
            status: AgentStatus::Idle,
            message: message.to_string(),
        }
    }
}

/// 每次运行开始时的 Agent 阵容
pub fn initial_agents() -> Vec<Agent> {
    vec![
        Agent::idle(PLANNER_ID, "Atlas", AgentRole::Planner, "Ready to plan."),
        Agent::idle(ARCHITECT_ID, "Nexus", AgentRole::Architect, "Standing by."),
        Agent::idle(DESIGNER_ID, "Pixel", AgentRole::Designer, "Awaiting specs."),
        Agent::idle(ENGINEER_ID, "Spark", AgentRole::Engineer, "Ready to code."),
        Agent::idle(QA_ID, "Bugsy", AgentRole::Qa, "Tests ready."),
    ]
}

/// 流水线中的六个步骤，编号即执行顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    Requirements,
    Architecture,
    Styles,
    Structure,
    Logic,
    Verification,
}

impl StepId {
    pub const ALL: [StepId; 6] = [
        StepId::Requirements,
        StepId::Architecture,
        StepId::Styles,
        StepId::Structure,
        StepId::Logic,
        StepId::Verification,
    ];

    pub fn number(&self) -> u8 {
        match self {
            StepId::Requirements => 1,
            StepId::Architecture => 2,
            StepId::Styles => 3,
            StepId::Structure => 4,
            StepId::Logic => 5,
            StepId::Verification => 6,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StepId::Requirements => "Analyze Requirements",
            StepId::Architecture => "Design Architecture",
            StepId::Styles => "Scaffold Project",
            StepId::Structure => "Generate UI Assets",
            StepId::Logic => "Implement Logic",
            StepId::Verification => "Verify & Deploy",
        }
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "step {} ({})", self.number(), self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
}

/// 观察者看到的步骤进度
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub id: u8,
    pub label: String,
    pub status: StepStatus,
}

pub fn initial_steps() -> Vec<ExecutionStep> {
    StepId::ALL
        .iter()
        .map(|s| ExecutionStep {
            id: s.number(),
            label: s.label().to_string(),
            status: StepStatus::Pending,
        })
        .collect()
}

/// 日志类别（决定终端视图中的颜色/图标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Success,
    Error,
    Cmd,
    Warning,
    /// Agent 之间的对话（澄清回答）
    Chat,
}

impl LogKind {
    /// 终端输出的短标签
    pub fn tag(&self) -> &'static str {
        match self {
            LogKind::Info => "info",
            LogKind::Success => "ok",
            LogKind::Error => "error",
            LogKind::Cmd => "$",
            LogKind::Warning => "warn",
            LogKind::Chat => "chat",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    /// 本地时间 HH:MM:SS
    pub timestamp: String,
    pub agent_id: String,
    pub message: String,
    pub kind: LogKind,
}

impl LogEntry {
    pub fn new(agent_id: impl Into<String>, message: impl Into<String>, kind: LogKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
            agent_id: agent_id.into(),
            message: message.into(),
            kind,
        }
    }
}

/// 工作流整体阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "step", rename_all = "snake_case")]
pub enum WorkflowPhase {
    Idle,
    Running(StepId),
    /// 仅在第 6 步之后进入；导出与精修只在此阶段可用
    Completed,
    Failed(StepId),
}

impl WorkflowPhase {
    pub fn is_completed(&self) -> bool {
        matches!(self, WorkflowPhase::Completed)
    }
}
