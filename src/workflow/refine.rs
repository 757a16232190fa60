//! 细化：在已完成的项目上应用一条用户指令
//!
//! 一次调用，提示词包含全部文件、项目配置与指令；只要求返回变更过的文件（完整内容），
//! 按名称后写覆盖合并。空数组表示无变化；失败不改动现有产物。

use crate::artifact::{Artifact, ArtifactSet, MergeReport};
use crate::core::state::ENGINEER_ID;
use crate::core::{AgentStatus, CallSite, GenerationFailure, LogKind, ProjectConfig, WorkflowError};
use crate::generation::GenerationClient;
use crate::workflow::Forge;

pub const REFINE_SYSTEM_INSTRUCTION: &str = "You are a Senior Full Stack Developer tasking with refining an existing codebase based on user feedback.";

pub fn refine_prompt(current: &ArtifactSet, instruction: &str, config: &ProjectConfig) -> String {
    format!(
        "Project: {}\n\
         Description: {}\n\
         Theme: {}\n\n\
         Current Files:\n\
         {}\n\n\
         User Refinement Instruction: \"{}\"\n\n\
         DIRECTIVE:\n\
         - Analyze the request.\n\
         - Modify the existing files or create new ones to satisfy the request.\n\
         - Ensure consistency with the existing theme and structure.\n\
         - Return a JSON object with a \"files\" array containing ONLY the files that need to be updated.\n\
         - You MUST return the FULL CONTENT of any file you modify. Do not use diffs or placeholders.",
        config.name,
        config.description,
        config.theme,
        current.render_context(),
        instruction
    )
}

/// 请求部分更新；不做合并
pub async fn refine_artifacts(
    client: &GenerationClient,
    current: &ArtifactSet,
    instruction: &str,
    config: &ProjectConfig,
) -> Result<Vec<Artifact>, GenerationFailure> {
    client
        .generate_files(
            CallSite::Refinement,
            &refine_prompt(current, instruction, config),
            REFINE_SYSTEM_INSTRUCTION,
        )
        .await
}

#[derive(Debug, Clone)]
pub enum RefineStatus {
    Applied(MergeReport),
    /// 后端返回空数组
    NoChange,
    /// 已报告给观察者，产物未变
    Failed(GenerationFailure),
}

#[derive(Debug, Clone)]
pub struct RefineOutcome {
    /// 细化之后（或失败时原样）的产物集合
    pub artifacts: ArtifactSet,
    pub status: RefineStatus,
}

impl Forge {
    /// 对已完成的运行应用一条细化指令
    pub async fn refine(&self, instruction: &str) -> Result<RefineOutcome, WorkflowError> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(WorkflowError::EmptyInstruction);
        }
        let _guard = self.acquire()?;

        if !self.board.phase().is_completed() {
            return Err(WorkflowError::NotCompleted);
        }
        let current = self.board.artifacts();
        if current.is_empty() {
            return Err(WorkflowError::NothingToRefine);
        }
        let config = self.board.project().ok_or(WorkflowError::NotCompleted)?;

        tracing::info!(files = current.len(), "Applying refinement");
        self.board.system_log(
            format!("Refinement request: \"{}\"", instruction),
            LogKind::Cmd,
        );
        self.board
            .set_agent(ENGINEER_ID, AgentStatus::Working, "Applying refinements...");

        let status = match refine_artifacts(&self.client, &current, instruction, &config).await {
            Ok(files) if files.is_empty() => {
                tracing::warn!("Refinement returned no files");
                self.board.log(
                    ENGINEER_ID,
                    "No changes required or refinement failed.",
                    LogKind::Warning,
                );
                RefineStatus::NoChange
            }
            Ok(files) => {
                let report = self.board.merge_artifacts(files);
                for name in &report.updated {
                    self.board
                        .log(ENGINEER_ID, format!("Updated {}", name), LogKind::Success);
                }
                for name in &report.created {
                    self.board
                        .log(ENGINEER_ID, format!("Created {}", name), LogKind::Success);
                }
                self.board
                    .system_log("Refinement applied successfully.", LogKind::Success);
                RefineStatus::Applied(report)
            }
            Err(failure) => {
                tracing::error!(error = %failure, "Refinement failed");
                self.board
                    .report_error(format!("Refinement error: {}", failure));
                RefineStatus::Failed(failure)
            }
        };

        self.board
            .set_agent(ENGINEER_ID, AgentStatus::Idle, "Refinement complete.");
        Ok(RefineOutcome {
            artifacts: self.board.artifacts(),
            status,
        })
    }
}
