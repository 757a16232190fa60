//! 工作流引擎
//!
//! 按 PIPELINE 顺序执行六个步骤：咨询性步骤只做展示停顿，必需步骤调用生成客户端并合并产物。
//! 逻辑实现步骤可能先触发一轮澄清（提问 → 架构师回答 → 带答复重试），之后不会再探测。
//! 任一必需步骤失败即终止本次运行，保留已合并的部分产物，恰好报告一条错误。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::artifact::{Artifact, ArtifactSet};
use crate::config::WorkflowSection;
use crate::core::{
    AgentStatus, FailureKind, GenerationFailure, LogKind, ProjectConfig, StepStatus,
    WorkflowError, WorkflowPhase,
};
use crate::generation::{
    ClarificationRequest, GenerationClient, GenerationContext, StepDescriptor, StepGeneration,
    StepResult, PIPELINE,
};
use crate::workflow::board::{BoardSnapshot, StateBoard};
use crate::workflow::WorkflowSink;

/// 运行期间持有；释放时清除忙标记
pub(crate) struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// 工作流引擎：一次只允许一个运行或一次细化
pub struct Forge {
    pub(crate) client: GenerationClient,
    pub(crate) settings: WorkflowSection,
    pub(crate) board: StateBoard,
    busy: AtomicBool,
}

impl Forge {
    pub fn new(
        client: GenerationClient,
        settings: WorkflowSection,
        sink: Arc<dyn WorkflowSink>,
    ) -> Self {
        Self {
            client,
            settings,
            board: StateBoard::new(sink),
            busy: AtomicBool::new(false),
        }
    }

    pub fn board(&self) -> &StateBoard {
        &self.board
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.board.phase()
    }

    pub fn artifacts(&self) -> ArtifactSet {
        self.board.artifacts()
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        self.board.snapshot()
    }

    /// 累计 token 用量 (prompt, completion, total)；不统计的后端返回全 0
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.client.token_usage()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub(crate) fn acquire(&self) -> Result<BusyGuard<'_>, WorkflowError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| WorkflowError::Busy)?;
        Ok(BusyGuard(&self.busy))
    }

    async fn pause(&self, ms: u64) {
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    /// 运行完整流水线。成功返回最终产物集合；失败时阶段停在 `Failed(step)`，部分产物保留在看板上。
    pub async fn run_workflow(&self, config: ProjectConfig) -> Result<ArtifactSet, WorkflowError> {
        let _guard = self.acquire()?;

        tracing::info!(project = %config.name, theme = %config.theme, "Starting generation workflow");
        self.board.reset(&config);
        self.board.system_log(
            format!("Initializing Agent Swarm for project: \"{}\"", config.name),
            LogKind::Cmd,
        );

        for desc in PIPELINE.iter() {
            self.board.set_phase(WorkflowPhase::Running(desc.step));
            self.board.set_step(desc.step, StepStatus::Running);
            self.board.set_agent(
                desc.agent_id,
                AgentStatus::Working,
                desc.start_message_for(&config),
            );
            tracing::info!(step = %desc.step, agent = desc.agent_id, "Step started");

            if let Some(generation) = &desc.generation {
                let files = match self.run_required(desc, generation, &config).await {
                    Ok(files) => files,
                    Err(failure) => return Err(self.fail(desc, generation, failure)),
                };
                let report = self.board.merge_artifacts(files);
                tracing::info!(
                    step = %desc.step,
                    created = report.created.len(),
                    updated = report.updated.len(),
                    "Artifacts merged"
                );
            } else {
                self.pause(self.settings.advisory_delay_ms).await;
            }

            self.board.log(desc.agent_id, desc.success_log, desc.success_kind);
            self.board
                .set_agent(desc.agent_id, AgentStatus::Done, desc.done_message);
            self.board.set_step(desc.step, StepStatus::Completed);
        }

        self.board.set_phase(WorkflowPhase::Completed);
        let artifacts = self.board.artifacts();
        tracing::info!(files = artifacts.len(), "Workflow completed");
        Ok(artifacts)
    }

    /// 必需步骤：生成（必要时经过一轮澄清），并检查至少有一个文件
    async fn run_required(
        &self,
        desc: &StepDescriptor,
        generation: &StepGeneration,
        config: &ProjectConfig,
    ) -> Result<Vec<Artifact>, GenerationFailure> {
        let current = self.board.artifacts();
        let ctx = GenerationContext::new(config, &current);

        let (files, clarified) = match self
            .client
            .generate_step(desc.site(), generation, &ctx, self.settings.enable_clarification)
            .await?
        {
            StepResult::Code { files } => (files, false),
            StepResult::Clarification { request } => {
                let answer = self.clarify(&request, config).await?;
                let retry = ctx.clarified(&answer);
                match self
                    .client
                    .generate_step(desc.site(), generation, &retry, false)
                    .await
                    .map_err(GenerationFailure::exhausted)?
                {
                    StepResult::Code { files } => (files, true),
                    StepResult::Clarification { .. } => {
                        return Err(GenerationFailure::new(
                            desc.site(),
                            FailureKind::ClarificationExhausted,
                            "clarification requested again after one round",
                        ))
                    }
                }
            }
        };

        if files.is_empty() {
            let failure = GenerationFailure::empty(desc.site());
            return Err(if clarified { failure.exhausted() } else { failure });
        }
        Ok(files)
    }

    /// 澄清往返：提问方等待，回答方工作后回到空闲，返回答复
    async fn clarify(
        &self,
        request: &ClarificationRequest,
        config: &ProjectConfig,
    ) -> Result<String, GenerationFailure> {
        let to_name = self
            .board
            .agent_name(&request.to_agent_id)
            .unwrap_or_else(|| request.to_agent_id.clone());
        tracing::info!(from = %request.from_agent_id, to = %request.to_agent_id, "Clarification requested");

        self.board.set_agent(
            &request.from_agent_id,
            AgentStatus::Waiting,
            format!("Asking {}...", to_name),
        );
        self.board
            .log(&request.from_agent_id, request.question.clone(), LogKind::Warning);

        self.pause(self.settings.clarification_pause_ms).await;
        self.board.set_agent(
            &request.to_agent_id,
            AgentStatus::Working,
            "Resolving ambiguity...",
        );

        let answer = match self.client.answer_clarification(request, config).await {
            Ok(answer) => answer,
            Err(failure) => {
                self.board
                    .set_agent(&request.to_agent_id, AgentStatus::Idle, "Failed.");
                return Err(failure);
            }
        };
        self.board
            .log(&request.to_agent_id, answer.clone(), LogKind::Chat);
        self.board
            .set_agent(&request.to_agent_id, AgentStatus::Idle, "Standing by.");

        self.pause(self.settings.clarification_pause_ms).await;
        self.board.system_log(
            "Clarification received. Resuming implementation.",
            LogKind::Info,
        );
        self.board.set_agent(
            &request.from_agent_id,
            AgentStatus::Working,
            "Coding with new context...",
        );
        Ok(answer)
    }

    fn fail(
        &self,
        desc: &StepDescriptor,
        generation: &StepGeneration,
        failure: GenerationFailure,
    ) -> WorkflowError {
        tracing::error!(step = %desc.step, error = %failure, "Step failed, aborting workflow");
        self.board
            .set_agent(desc.agent_id, AgentStatus::Idle, "Failed.");
        self.board.set_phase(WorkflowPhase::Failed(desc.step));
        self.board
            .report_error(format!("{} {}", generation.failure_message, failure));
        WorkflowError::StepFailed {
            step: desc.step,
            failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::{ARCHITECT_ID, ENGINEER_ID};
    use crate::core::{StepId, Theme};
    use crate::llm::{LlmClient, LlmError, Message, ScriptedLlmClient};
    use crate::workflow::{RecordingSink, WorkflowEvent};

    fn files_json(name: &str, language: &str, content: &str) -> String {
        format!(
            "{{\"files\":[{{\"name\":\"{}\",\"language\":\"{}\",\"content\":\"{}\"}}]}}",
            name, language, content
        )
    }

    fn forge(script: Arc<ScriptedLlmClient>) -> (Forge, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let forge = Forge::new(
            GenerationClient::new(script),
            WorkflowSection::immediate(),
            sink.clone(),
        );
        (forge, sink)
    }

    fn config() -> ProjectConfig {
        ProjectConfig::new("T", "d", Theme::Minimal)
    }

    #[tokio::test]
    async fn test_happy_path_without_clarification() {
        let script = Arc::new(ScriptedLlmClient::with_responses([
            files_json("README.md", "markdown", "# T"),
            files_json("style.css", "css", "body{}"),
            files_json("index.html", "html", "<main></main>"),
            "{\"question\": null}".to_string(),
            files_json("app.js", "javascript", "init()"),
        ]));
        let (forge, sink) = forge(script.clone());

        let files = forge.run_workflow(config()).await.unwrap();
        assert_eq!(
            files.names(),
            vec!["README.md", "style.css", "index.html", "app.js"]
        );
        assert_eq!(forge.phase(), WorkflowPhase::Completed);
        assert_eq!(script.call_count(), 5);
        assert!(sink.errors().is_empty());

        let snap = forge.snapshot();
        assert!(snap.steps.iter().all(|s| s.status == StepStatus::Completed));
        assert!(snap.agents.iter().all(|a| a.status == AgentStatus::Done));
        assert!(!forge.is_busy());
    }

    #[tokio::test]
    async fn test_empty_step_stops_before_next_call() {
        let script = Arc::new(ScriptedLlmClient::with_responses([
            files_json("README.md", "markdown", "# T"),
            "{\"files\": []}".to_string(),
            files_json("index.html", "html", "<main></main>"),
        ]));
        let (forge, sink) = forge(script.clone());

        let err = forge.run_workflow(config()).await.unwrap_err();
        match err {
            WorkflowError::StepFailed { step, failure } => {
                assert_eq!(step, StepId::Styles);
                assert_eq!(failure.kind, FailureKind::EmptyResult);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(script.call_count(), 2);
        assert_eq!(forge.phase(), WorkflowPhase::Failed(StepId::Styles));
        // 部分产物保留
        assert_eq!(forge.artifacts().names(), vec!["README.md"]);

        let errors = sink.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Failed to generate styles."));
        assert!(errors[0].contains("step 3"));
    }

    #[tokio::test]
    async fn test_clarification_round_trip_order() {
        let script = Arc::new(ScriptedLlmClient::with_responses([
            files_json("README.md", "markdown", "# T"),
            files_json("style.css", "css", "body{}"),
            files_json("index.html", "html", "<main></main>"),
            "```json\n{\"question\": \"Persist to localStorage or a server?\"}\n```".to_string(),
            "Use localStorage.".to_string(),
            files_json("app.js", "javascript", "save()"),
        ]));
        let (forge, _sink) = forge(script.clone());

        forge.run_workflow(config()).await.unwrap();
        let requests = script.requests();
        assert_eq!(requests.len(), 6);
        assert!(requests[3][0].content.contains("QuestionProbe"));
        assert!(requests[4][1]
            .content
            .contains("Persist to localStorage or a server?"));
        assert!(requests[5][1]
            .content
            .contains("CLARIFICATION FROM ARCHITECT: \"Use localStorage.\""));

        let snap = forge.snapshot();
        let question = snap
            .logs
            .iter()
            .find(|l| l.kind == LogKind::Warning)
            .unwrap();
        assert_eq!(question.agent_id, ENGINEER_ID);
        let answer = snap.logs.iter().find(|l| l.kind == LogKind::Chat).unwrap();
        assert_eq!(answer.agent_id, ARCHITECT_ID);
        assert_eq!(answer.message, "Use localStorage.");
        let nexus = snap.agents.iter().find(|a| a.id == ARCHITECT_ID).unwrap();
        // 步骤 2 结束时为 done，澄清后回到 idle
        assert_eq!(nexus.status, AgentStatus::Idle);
    }

    #[tokio::test]
    async fn test_empty_retry_after_clarification_is_exhausted() {
        let script = Arc::new(ScriptedLlmClient::with_responses([
            files_json("README.md", "markdown", "# T"),
            files_json("style.css", "css", "body{}"),
            files_json("index.html", "html", "<main></main>"),
            "{\"question\": \"Which storage?\"}".to_string(),
            "localStorage".to_string(),
            "{\"files\": []}".to_string(),
        ]));
        let (forge, sink) = forge(script);

        let err = forge.run_workflow(config()).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::StepFailed { step: StepId::Logic, ref failure }
                if failure.kind == FailureKind::ClarificationExhausted
        ));
        assert_eq!(sink.errors().len(), 1);
        assert_eq!(forge.artifacts().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_ambiguity_check_halts_logic_step() {
        let script = Arc::new(ScriptedLlmClient::with_responses([
            files_json("README.md", "markdown", "# T"),
            files_json("style.css", "css", "body{}"),
            files_json("index.html", "html", "<main></main>"),
        ]));
        script.push_err(LlmError::Request("connection reset".into()));
        script.push_ok(files_json("app.js", "javascript", "init()"));
        let (forge, sink) = forge(script.clone());

        let err = forge.run_workflow(config()).await.unwrap_err();
        match err {
            WorkflowError::StepFailed { step, failure } => {
                assert_eq!(step, StepId::Logic);
                assert_eq!(failure.kind, FailureKind::BackendFailure);
                assert_eq!(failure.site, crate::core::CallSite::AmbiguityProbe);
            }
            other => panic!("unexpected error: {other}"),
        }
        // 代码请求从未发出
        assert_eq!(script.call_count(), 4);
        assert_eq!(script.remaining(), 1);
        assert_eq!(forge.phase(), WorkflowPhase::Failed(StepId::Logic));
        assert_eq!(forge.artifacts().len(), 3);
        assert_eq!(sink.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_question_halts_logic_step() {
        let script = Arc::new(ScriptedLlmClient::with_responses([
            files_json("README.md", "markdown", "# T"),
            files_json("style.css", "css", "body{}"),
            files_json("index.html", "html", "<main></main>"),
            "{\"question\": [1, 2]}".to_string(),
            files_json("app.js", "javascript", "init()"),
        ]));
        let (forge, sink) = forge(script.clone());

        let err = forge.run_workflow(config()).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::StepFailed { step: StepId::Logic, ref failure }
                if failure.kind == FailureKind::MalformedResponse
        ));
        assert_eq!(script.call_count(), 4);
        assert_eq!(sink.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_answer_returns_architect_to_idle() {
        let script = Arc::new(ScriptedLlmClient::with_responses([
            files_json("README.md", "markdown", "# T"),
            files_json("style.css", "css", "body{}"),
            files_json("index.html", "html", "<main></main>"),
            "{\"question\": \"Which storage?\"}".to_string(),
        ]));
        script.push_err(LlmError::Timeout(30));
        let (forge, sink) = forge(script.clone());

        let err = forge.run_workflow(config()).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::StepFailed { step: StepId::Logic, ref failure }
                if failure.kind == FailureKind::BackendFailure
                    && failure.site == crate::core::CallSite::ClarificationAnswer
        ));
        assert_eq!(script.call_count(), 5);
        assert_eq!(forge.phase(), WorkflowPhase::Failed(StepId::Logic));
        assert_eq!(sink.errors().len(), 1);

        let snap = forge.snapshot();
        let nexus = snap.agents.iter().find(|a| a.id == ARCHITECT_ID).unwrap();
        assert_eq!(nexus.status, AgentStatus::Idle);
        let spark = snap.agents.iter().find(|a| a.id == ENGINEER_ID).unwrap();
        assert_eq!(spark.status, AgentStatus::Idle);
        assert!(snap.agents.iter().all(|a| a.status != AgentStatus::Working));
    }

    #[tokio::test]
    async fn test_disabled_clarification_skips_probe() {
        let script = Arc::new(ScriptedLlmClient::with_responses([
            files_json("README.md", "markdown", "# T"),
            files_json("style.css", "css", "body{}"),
            files_json("index.html", "html", "<main></main>"),
            files_json("app.js", "javascript", "init()"),
        ]));
        let sink = Arc::new(RecordingSink::new());
        let forge = Forge::new(
            GenerationClient::new(script.clone()),
            WorkflowSection {
                enable_clarification: false,
                ..WorkflowSection::immediate()
            },
            sink,
        );

        forge.run_workflow(config()).await.unwrap();
        assert_eq!(script.call_count(), 4);
    }

    #[tokio::test]
    async fn test_backend_failure_reports_single_error() {
        let script = Arc::new(ScriptedLlmClient::new());
        script.push_err(LlmError::Request("connection reset".into()));
        let (forge, sink) = forge(script);

        let err = forge.run_workflow(config()).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::StepFailed { step: StepId::Requirements, ref failure }
                if failure.kind == FailureKind::BackendFailure
        ));
        assert_eq!(sink.errors().len(), 1);
        assert_eq!(
            sink.count(|e| matches!(e, WorkflowEvent::Phase { phase: WorkflowPhase::Failed(_) })),
            1
        );
    }

    #[test]
    fn test_token_usage_comes_from_backend() {
        struct Metered;

        #[async_trait::async_trait]
        impl LlmClient for Metered {
            async fn complete(&self, _messages: &[Message]) -> Result<String, LlmError> {
                Ok("{}".into())
            }

            fn token_usage(&self) -> (u64, u64, u64) {
                (120, 30, 150)
            }
        }

        let metered = Forge::new(
            GenerationClient::new(Arc::new(Metered)),
            WorkflowSection::immediate(),
            Arc::new(crate::workflow::NullSink),
        );
        assert_eq!(metered.token_usage(), (120, 30, 150));

        let (scripted, _sink) = forge(Arc::new(ScriptedLlmClient::new()));
        assert_eq!(scripted.token_usage(), (0, 0, 0));
    }

    #[tokio::test]
    async fn test_second_run_while_busy_is_rejected() {
        use tokio::sync::Notify;

        struct Gate {
            entered: Notify,
            release: Notify,
        }

        #[async_trait::async_trait]
        impl LlmClient for Gate {
            async fn complete(&self, _messages: &[Message]) -> Result<String, LlmError> {
                self.entered.notify_one();
                self.release.notified().await;
                Ok("{}".into())
            }
        }

        let gate = Arc::new(Gate {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let forge = Arc::new(Forge::new(
            GenerationClient::new(gate.clone()),
            WorkflowSection::immediate(),
            Arc::new(crate::workflow::NullSink),
        ));

        let running = {
            let forge = forge.clone();
            tokio::spawn(async move { forge.run_workflow(config()).await })
        };
        gate.entered.notified().await;

        assert!(forge.is_busy());
        assert!(matches!(
            forge.run_workflow(config()).await,
            Err(WorkflowError::Busy)
        ));

        gate.release.notify_one();
        let first = running.await.unwrap();
        assert!(matches!(first, Err(WorkflowError::StepFailed { .. })));
        assert!(!forge.is_busy());
    }

    #[tokio::test]
    async fn test_new_run_resets_previous_state() {
        let script = Arc::new(ScriptedLlmClient::with_responses([
            files_json("README.md", "markdown", "# T"),
            "no json".to_string(),
            files_json("notes.md", "markdown", "second run"),
        ]));
        let (forge, _sink) = forge(script);

        assert!(forge.run_workflow(config()).await.is_err());
        assert_eq!(forge.artifacts().names(), vec!["README.md"]);

        // 第二次运行：步骤 1 产出 notes.md，步骤 3 因脚本耗尽失败
        assert!(forge.run_workflow(config()).await.is_err());
        assert_eq!(forge.artifacts().names(), vec!["notes.md"]);
        assert_eq!(forge.snapshot().error.iter().count(), 1);
    }
}
