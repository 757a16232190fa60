//! Forge 构建器
//!
//! 提供流畅的 API 组装后端、观察者与节奏配置；未指定后端时按配置与环境变量选择。

use std::sync::Arc;

use crate::config::{AppConfig, WorkflowSection};
use crate::generation::GenerationClient;
use crate::llm::{create_deepseek_client, LlmClient, MockLlmClient, OpenAiClient};
use crate::workflow::{Forge, NullSink, WorkflowSink};

/// 根据配置与环境变量选择 LLM 后端：有 DeepSeek Key（或 provider=deepseek 且只有 OpenAI Key）走 DeepSeek，
/// 有 OpenAI Key 且 provider 不是 deepseek 走 OpenAI，provider=mock 或没有任何 Key 时使用离线 Mock。
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    if provider == "mock" {
        tracing::info!("Using Mock LLM (configured)");
        return Arc::new(MockLlmClient);
    }

    let use_deepseek = std::env::var("DEEPSEEK_API_KEY").is_ok()
        || (provider == "deepseek" && std::env::var("OPENAI_API_KEY").is_ok());
    let use_openai = std::env::var("OPENAI_API_KEY").is_ok() && provider != "deepseek";

    if use_deepseek {
        let model = cfg
            .llm
            .deepseek
            .model
            .clone()
            .unwrap_or_else(|| cfg.llm.model.clone());
        tracing::info!("Using DeepSeek LLM ({})", model);
        Arc::new(create_deepseek_client(Some(&model)))
    } else if use_openai {
        let model = cfg
            .llm
            .openai
            .model
            .clone()
            .unwrap_or_else(|| "gpt-4o-mini".to_string());
        let base = cfg.llm.base_url.as_deref();
        tracing::info!("Using OpenAI LLM ({})", model);
        Arc::new(OpenAiClient::new(
            base,
            &model,
            std::env::var("OPENAI_API_KEY").ok().as_deref(),
        ))
    } else {
        tracing::warn!("No API key set or provider unknown, using Mock LLM");
        Arc::new(MockLlmClient)
    }
}

/// Forge 构建器
pub struct ForgeBuilder {
    llm: Option<Arc<dyn LlmClient>>,
    sink: Option<Arc<dyn WorkflowSink>>,
    settings: WorkflowSection,
    request_timeout_secs: u64,
}

impl Default for ForgeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ForgeBuilder {
    pub fn new() -> Self {
        Self {
            llm: None,
            sink: None,
            settings: WorkflowSection::default(),
            request_timeout_secs: 0,
        }
    }

    /// 采用配置中的节奏、超时与后端选择
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            llm: Some(create_llm_from_config(cfg)),
            sink: None,
            settings: cfg.workflow.clone(),
            request_timeout_secs: cfg.llm.timeouts.request,
        }
    }

    /// 指定后端（测试中注入 ScriptedLlmClient）
    pub fn llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn WorkflowSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn settings(mut self, settings: WorkflowSection) -> Self {
        self.settings = settings;
        self
    }

    /// 单次后端调用超时（秒），0 表示不限制
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn build(self) -> Forge {
        let llm = self.llm.unwrap_or_else(|| {
            tracing::warn!("No LLM backend configured, using Mock LLM");
            Arc::new(MockLlmClient)
        });
        let client = GenerationClient::new(llm).with_timeout_secs(self.request_timeout_secs);
        let sink = self.sink.unwrap_or_else(|| Arc::new(NullSink));
        Forge::new(client, self.settings, sink)
    }
}
