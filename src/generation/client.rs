//! 生成客户端：一次后端调用 + 清洗 + 解析
//!
//! 每次调用都是可恢复点：后端错误、超时、非法 JSON 都转成带调用位置的 GenerationFailure，
//! 不会让编排器 panic。空文件数组是合法（虽然无产出）的成功结果。

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::artifact::Artifact;
use crate::core::{CallSite, GenerationFailure, ProjectConfig};
use crate::generation::personas::{
    clarification_prompt, probe_prompt, GenerationContext, StepGeneration,
    ARCHITECT_SYSTEM_INSTRUCTION, DEFAULT_CLARIFICATION_ANSWER, PROBE_FROM_AGENT,
    PROBE_SYSTEM_INSTRUCTION, PROBE_TO_AGENT,
};
use crate::generation::sanitize::sanitize;
use crate::generation::schema::{FilesPayload, QuestionProbe, ResponseSchema};
use crate::llm::{LlmClient, LlmError, Message};

/// 澄清请求：由提问 Agent 发往回答 Agent，只在编排器内短暂存在
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ClarificationRequest {
    pub from_agent_id: String,
    pub to_agent_id: String,
    pub question: String,
}

/// 生成客户端与编排器之间的契约
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    Code { files: Vec<Artifact> },
    Clarification { request: ClarificationRequest },
}

/// 生成客户端：持有后端与可选请求超时，调用之间无状态
#[derive(Clone)]
pub struct GenerationClient {
    llm: Arc<dyn LlmClient>,
    request_timeout: Option<Duration>,
}

impl GenerationClient {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            request_timeout: None,
        }
    }

    /// 单次后端调用超时（秒）；0 表示不限制
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }

    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    async fn send(&self, site: CallSite, messages: &[Message]) -> Result<String, GenerationFailure> {
        tracing::debug!(%site, "Issuing generation call");
        let result = match self.request_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.llm.complete(messages)).await {
                Ok(r) => r,
                Err(_) => Err(LlmError::Timeout(limit.as_secs())),
            },
            None => self.llm.complete(messages).await,
        };
        result.map_err(|e| {
            tracing::warn!(%site, error = %e, "Generation backend call failed");
            GenerationFailure::backend(site, e.to_string())
        })
    }

    /// 结构化调用：Schema 拼入 system 指令，返回清洗并解析后的 JSON
    pub async fn call_structured(
        &self,
        site: CallSite,
        prompt: &str,
        system_instruction: &str,
        schema: ResponseSchema,
    ) -> Result<Value, GenerationFailure> {
        let messages = vec![
            Message::system(schema.apply_to(system_instruction)),
            Message::user(prompt),
        ];
        let raw = self.send(site, &messages).await?;
        let cleaned = sanitize(&raw);
        serde_json::from_str(&cleaned).map_err(|e| {
            tracing::warn!(%site, error = %e, "Failed to parse generation response");
            GenerationFailure::malformed(site, e.to_string(), raw)
        })
    }

    /// 自由文本调用（不约束格式），返回去除首尾空白的文本
    pub async fn generate_free_text(
        &self,
        site: CallSite,
        prompt: &str,
        system_instruction: &str,
    ) -> Result<String, GenerationFailure> {
        let system = ResponseSchema::FreeText.apply_to(system_instruction);
        let mut messages = Vec::with_capacity(2);
        if !system.is_empty() {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(prompt));
        Ok(self.send(site, &messages).await?.trim().to_string())
    }

    /// 请求文件数组；缺少 files 键视为空数组，条目字段缺失视为格式错误
    pub async fn generate_files(
        &self,
        site: CallSite,
        prompt: &str,
        system_instruction: &str,
    ) -> Result<Vec<Artifact>, GenerationFailure> {
        let value = self
            .call_structured(site, prompt, system_instruction, ResponseSchema::Files)
            .await?;
        let raw = value.to_string();
        let payload: FilesPayload = serde_json::from_value(value)
            .map_err(|e| GenerationFailure::malformed(site, e.to_string(), raw))?;
        tracing::debug!(%site, files = payload.files.len(), "Files decoded");
        Ok(payload.files)
    }

    /// 歧义探测：返回需要澄清的问题。
    /// question 为 null、缺失或空白表示无需澄清；后端错误与非法 JSON 照常向上传递。
    pub async fn probe_ambiguity(
        &self,
        config: &ProjectConfig,
    ) -> Result<Option<ClarificationRequest>, GenerationFailure> {
        let site = CallSite::AmbiguityProbe;
        let value = self
            .call_structured(
                site,
                &probe_prompt(config),
                PROBE_SYSTEM_INSTRUCTION,
                ResponseSchema::Question,
            )
            .await?;

        let raw = value.to_string();
        let probe: QuestionProbe = serde_json::from_value(value)
            .map_err(|e| GenerationFailure::malformed(site, e.to_string(), raw))?;
        let question = match probe.question.map(|q| q.trim().to_string()) {
            Some(q) if !q.is_empty() => q,
            _ => return Ok(None),
        };
        Ok(Some(ClarificationRequest {
            from_agent_id: PROBE_FROM_AGENT.to_string(),
            to_agent_id: PROBE_TO_AGENT.to_string(),
            question,
        }))
    }

    /// 由架构师回答澄清问题；空回答替换为默认答复
    pub async fn answer_clarification(
        &self,
        request: &ClarificationRequest,
        config: &ProjectConfig,
    ) -> Result<String, GenerationFailure> {
        let answer = self
            .generate_free_text(
                CallSite::ClarificationAnswer,
                &clarification_prompt(&request.question, config),
                ARCHITECT_SYSTEM_INSTRUCTION,
            )
            .await?;
        if answer.is_empty() {
            Ok(DEFAULT_CLARIFICATION_ANSWER.to_string())
        } else {
            Ok(answer)
        }
    }

    /// 执行一个必需步骤：可选先探测歧义，然后请求文件。
    /// `ctx.has_clarified` 为 true 时跳过探测，因此重试永远不会再次返回 Clarification。
    pub async fn generate_step(
        &self,
        site: CallSite,
        generation: &StepGeneration,
        ctx: &GenerationContext<'_>,
        allow_clarification: bool,
    ) -> Result<StepResult, GenerationFailure> {
        if generation.probe_ambiguity && allow_clarification && !ctx.has_clarified {
            if let Some(request) = self.probe_ambiguity(ctx.config).await? {
                return Ok(StepResult::Clarification { request });
            }
        }

        let prompt = generation.build_prompt(ctx);
        let files = self
            .generate_files(site, &prompt, generation.system_instruction)
            .await?;
        Ok(StepResult::Code { files })
    }
}
