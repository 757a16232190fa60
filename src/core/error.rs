//! 错误类型：生成调用失败与工作流级错误
//!
//! GenerationFailure 由生成客户端（或编排器在空结果时）产生，标明失败位置与类别；
//! WorkflowError 是调用方看到的最终错误。

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::core::state::StepId;

/// 失败类别；都不自动重试
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 清洗/解析失败
    MalformedResponse,
    /// 结构合法但必需步骤返回 0 个文件
    EmptyResult,
    /// 后端调用本身失败（网络、超时、鉴权）
    BackendFailure,
    /// 澄清后的第二次生成仍未产出代码
    ClarificationExhausted,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::MalformedResponse => "malformed response",
            FailureKind::EmptyResult => "empty result",
            FailureKind::BackendFailure => "backend failure",
            FailureKind::ClarificationExhausted => "clarification exhausted",
        };
        f.write_str(s)
    }
}

/// 发起生成调用的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "site", content = "step", rename_all = "snake_case")]
pub enum CallSite {
    Step(StepId),
    AmbiguityProbe,
    ClarificationAnswer,
    Refinement,
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallSite::Step(step) => write!(f, "{}", step),
            CallSite::AmbiguityProbe => f.write_str("ambiguity probe"),
            CallSite::ClarificationAnswer => f.write_str("clarification answer"),
            CallSite::Refinement => f.write_str("refinement"),
        }
    }
}

/// 单次生成调用失败
#[derive(Debug, Clone, Error)]
#[error("{site}: {kind}: {detail}")]
pub struct GenerationFailure {
    pub site: CallSite,
    pub kind: FailureKind,
    pub detail: String,
    /// 出错的原始响应文本（解析失败时才有）
    pub raw: Option<String>,
}

impl GenerationFailure {
    pub fn new(site: CallSite, kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            site,
            kind,
            detail: detail.into(),
            raw: None,
        }
    }

    pub fn malformed(site: CallSite, detail: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            raw: Some(raw.into()),
            ..Self::new(site, FailureKind::MalformedResponse, detail)
        }
    }

    pub fn backend(site: CallSite, detail: impl Into<String>) -> Self {
        Self::new(site, FailureKind::BackendFailure, detail)
    }

    pub fn empty(site: CallSite) -> Self {
        Self::new(site, FailureKind::EmptyResult, "no files were returned")
    }

    /// 澄清之后的重试失败：统一归类为 ClarificationExhausted，保留原因
    pub fn exhausted(self) -> Self {
        Self {
            kind: FailureKind::ClarificationExhausted,
            detail: format!("retry after clarification failed ({}): {}", self.kind, self.detail),
            ..self
        }
    }
}

/// 调用方可见的工作流错误
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{step} failed: {failure}")]
    StepFailed {
        step: StepId,
        failure: GenerationFailure,
    },

    #[error("another workflow run or refinement is still in progress")]
    Busy,

    #[error("workflow has not completed")]
    NotCompleted,

    #[error("no artifacts to refine")]
    NothingToRefine,

    #[error("refinement instruction is empty")]
    EmptyInstruction,

    #[error("unsafe artifact path: {0}")]
    UnsafePath(String),

    #[error("export failed: {0}")]
    Export(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_keeps_site_and_reason() {
        let f = GenerationFailure::empty(CallSite::Step(StepId::Logic)).exhausted();
        assert_eq!(f.kind, FailureKind::ClarificationExhausted);
        assert_eq!(f.site, CallSite::Step(StepId::Logic));
        assert!(f.detail.contains("empty result"));
    }

    #[test]
    fn test_step_failed_message_names_step() {
        let err = WorkflowError::StepFailed {
            step: StepId::Styles,
            failure: GenerationFailure::empty(CallSite::Step(StepId::Styles)),
        };
        assert!(err.to_string().starts_with("step 3 (Scaffold Project) failed"));
    }
}
