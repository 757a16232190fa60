//! 步骤人设表：步骤 → {负责 Agent, system 指令, 提示词构建器, 是否必须产出文件, 状态文案}
//!
//! 编排器只遍历 PIPELINE，不针对具体步骤写分支；增删步骤只改这张表。

use crate::artifact::ArtifactSet;
use crate::core::state::{
    LogKind, StepId, ARCHITECT_ID, DESIGNER_ID, ENGINEER_ID, PLANNER_ID, QA_ID,
};
use crate::core::{CallSite, ProjectConfig};

/// 构建某一步提示词时可见的上下文
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    pub config: &'a ProjectConfig,
    /// 之前步骤累计的产物
    pub current_files: &'a ArtifactSet,
    /// 已经过一轮澄清：禁止再次探测歧义
    pub has_clarified: bool,
    pub clarification_answer: Option<&'a str>,
}

impl<'a> GenerationContext<'a> {
    pub fn new(config: &'a ProjectConfig, current_files: &'a ArtifactSet) -> Self {
        Self {
            config,
            current_files,
            has_clarified: false,
            clarification_answer: None,
        }
    }

    /// 澄清之后的重试上下文
    pub fn clarified(self, answer: &'a str) -> Self {
        Self {
            has_clarified: true,
            clarification_answer: Some(answer),
            ..self
        }
    }

    fn file_context(&self) -> String {
        if self.current_files.is_empty() {
            String::new()
        } else {
            format!(
                "Current Project Files:\n{}",
                self.current_files.render_context()
            )
        }
    }
}

pub type PromptBuilder = fn(&GenerationContext<'_>) -> String;

/// 必需步骤的生成配置
pub struct StepGeneration {
    pub system_instruction: &'static str,
    pub prompt: PromptBuilder,
    /// 生成代码前先探测歧义（仅逻辑实现步骤）
    pub probe_ambiguity: bool,
    /// 失败时的用户可见说明
    pub failure_message: &'static str,
}

impl StepGeneration {
    pub fn build_prompt(&self, ctx: &GenerationContext<'_>) -> String {
        (self.prompt)(ctx)
    }
}

/// 单个步骤的描述
pub struct StepDescriptor {
    pub step: StepId,
    /// 执行该步骤的 Agent
    pub agent_id: &'static str,
    /// None 表示咨询性步骤：不调用后端、不产出文件
    pub generation: Option<StepGeneration>,
    /// Agent 工作中的状态文案，`{theme}` 会被替换
    pub start_message: &'static str,
    pub done_message: &'static str,
    pub success_log: &'static str,
    pub success_kind: LogKind,
}

impl StepDescriptor {
    pub fn site(&self) -> CallSite {
        CallSite::Step(self.step)
    }

    pub fn start_message_for(&self, config: &ProjectConfig) -> String {
        self.start_message.replace("{theme}", config.theme.as_str())
    }
}

/// 提示词结尾的目标文件声明
fn target_line(file: &str) -> String {
    format!("Return JSON object with \"files\" array containing {}.", file)
}

fn requirements_prompt(ctx: &GenerationContext<'_>) -> String {
    let c = ctx.config;
    format!(
        "Analyze this app request:\n\
         Name: {}\n\
         Description: {}\n\
         Theme: {}\n\
         Key Features: {}\n\n\
         Generate a professional README.md that outlines the features, tech stack (Vanilla JS + Tailwind CSS), and project structure.\n\n\
         {}",
        c.name,
        c.description,
        c.theme,
        c.features_list(),
        target_line("README.md")
    )
}

fn styles_prompt(ctx: &GenerationContext<'_>) -> String {
    let c = ctx.config;
    format!(
        "Create a 'style.css' for this app.\n\
         Theme: {} (Strictly adhere to this style).\n\
         Description: {}\n\n\
         - Use modern CSS variables.\n\
         - Implement a clean, responsive design.\n\
         - Ensure it works well with Tailwind CSS utility classes.\n\
         {}\n\n\
         {}",
        c.theme,
        c.description,
        ctx.file_context(),
        target_line("style.css")
    )
}

fn structure_prompt(ctx: &GenerationContext<'_>) -> String {
    let c = ctx.config;
    format!(
        "Create 'index.html' for this app.\n\
         Name: {}\n\
         Theme: {}\n\n\
         - Use Tailwind CSS via CDN: <script src=\"https://cdn.tailwindcss.com\"></script>\n\
         - Link the local 'style.css'.\n\
         - Link the local 'app.js' at the end of body.\n\
         - Use Semantic HTML5.\n\
         - Ensure responsive layout (mobile-first).\n\
         - Implement the UI structure to support: {}.\n\
         - Ensure all IDs and classes required for JS logic are present.\n\
         {}\n\n\
         {}",
        c.name,
        c.theme,
        c.features_list(),
        ctx.file_context(),
        target_line("index.html")
    )
}

fn logic_prompt(ctx: &GenerationContext<'_>) -> String {
    let clarification = ctx
        .clarification_answer
        .map(|a| {
            format!(
                "\nCLARIFICATION FROM ARCHITECT: \"{}\". Use this to guide your implementation.\n",
                a
            )
        })
        .unwrap_or_default();
    format!(
        "Write 'app.js' for this app.\n\
         Features to implement: {}\n\
         {}\n\
         CRITICAL REQUIREMENTS:\n\
         - Implement robust state management.\n\
         - MANDATORY: Integrate 'localStorage' for data persistence.\n\
         \x20 1. Load data from localStorage on startup.\n\
         \x20 2. Save data to localStorage on every state change (add, edit, delete).\n\
         - Wrap all initialization in 'document.addEventListener(\"DOMContentLoaded\", ...)' to ensure DOM is ready.\n\
         - Handle edge cases (empty state, invalid input).\n\n\
         Context: The HTML structure is already defined in index.html.\n\
         {}\n\n\
         {}",
        ctx.config.features_list(),
        clarification,
        ctx.file_context(),
        target_line("app.js")
    )
}

/// 固定的六步流水线
pub static PIPELINE: [StepDescriptor; 6] = [
    StepDescriptor {
        step: StepId::Requirements,
        agent_id: PLANNER_ID,
        generation: Some(StepGeneration {
            system_instruction: "You are a Technical Product Manager (Atlas).",
            prompt: requirements_prompt,
            probe_ambiguity: false,
            failure_message: "Failed to generate initial documentation.",
        }),
        start_message: "Analyzing project scope...",
        done_message: "Specs complete.",
        success_log: "Project structure and documentation generated.",
        success_kind: LogKind::Success,
    },
    StepDescriptor {
        step: StepId::Architecture,
        agent_id: ARCHITECT_ID,
        generation: None,
        start_message: "Designing architecture...",
        done_message: "Architecture defined.",
        success_log: "Defining MVC pattern and component hierarchy.",
        success_kind: LogKind::Info,
    },
    StepDescriptor {
        step: StepId::Styles,
        agent_id: DESIGNER_ID,
        generation: Some(StepGeneration {
            system_instruction: "You are a UI/UX Designer (Pixel).",
            prompt: styles_prompt,
            probe_ambiguity: false,
            failure_message: "Failed to generate styles.",
        }),
        start_message: "Implementing {theme} design system...",
        done_message: "Assets ready.",
        success_log: "Stylesheet generated.",
        success_kind: LogKind::Success,
    },
    StepDescriptor {
        step: StepId::Structure,
        agent_id: ENGINEER_ID,
        generation: Some(StepGeneration {
            system_instruction: "You are a Frontend Architect.",
            prompt: structure_prompt,
            probe_ambiguity: false,
            failure_message: "Failed to generate DOM.",
        }),
        start_message: "Scaffolding DOM...",
        done_message: "DOM ready.",
        success_log: "DOM structure generated.",
        success_kind: LogKind::Success,
    },
    StepDescriptor {
        step: StepId::Logic,
        agent_id: ENGINEER_ID,
        generation: Some(StepGeneration {
            system_instruction: "You are a Senior Software Engineer (Spark).",
            prompt: logic_prompt,
            probe_ambiguity: true,
            failure_message: "Logic implementation failed.",
        }),
        start_message: "Implementing business logic...",
        done_message: "Implementation complete.",
        success_log: "Logic implementation complete.",
        success_kind: LogKind::Success,
    },
    StepDescriptor {
        step: StepId::Verification,
        agent_id: QA_ID,
        generation: None,
        start_message: "Running integration tests...",
        done_message: "Verified.",
        success_log: "All systems verify. Deployment ready.",
        success_kind: LogKind::Success,
    },
];

pub fn descriptor(step: StepId) -> &'static StepDescriptor {
    &PIPELINE[usize::from(step.number() - 1)]
}

/// 逻辑实现前的歧义探测：提出澄清的是工程师，回答者是架构师
pub const PROBE_FROM_AGENT: &str = ENGINEER_ID;
pub const PROBE_TO_AGENT: &str = ARCHITECT_ID;

pub const PROBE_SYSTEM_INSTRUCTION: &str = "You are Spark, a Senior Lead Engineer. \
If you encounter any ambiguity in the requirements or architecture (e.g., missing persistence strategy, undefined API endpoints), do not guess: ask.";

pub fn probe_prompt(config: &ProjectConfig) -> String {
    format!(
        "You are a Senior Lead Engineer analyzing a request to build: \"{} - {}\".\n\
         Features context: {}.\n\
         Review the requirements and current progress.\n\
         Identify ONE critical ambiguity or missing detail that prevents you from writing perfect code (e.g., state persistence preference, undefined API behavior).\n\
         Return a JSON object with a 'question' field. If everything is clear, set it to null.",
        config.name,
        config.description,
        config.features_list()
    )
}

pub const ARCHITECT_SYSTEM_INSTRUCTION: &str = "You are a software architect. You may receive clarification requests from other agents.\n\
When answering:\n\
1. Be direct and concise.\n\
2. Reference the original project intent.\n\
3. Provide a definitive technical decision.";

/// 回答为空时的默认答复
pub const DEFAULT_CLARIFICATION_ANSWER: &str = "Proceed with standard best practices.";

pub fn clarification_prompt(question: &str, config: &ProjectConfig) -> String {
    format!(
        "You are Nexus, a Software Architect.\n\
         The Lead Engineer asked: \"{}\".\n\
         The Project Goal is: \"{}: {}\".\n\
         Provide a decisive, technical answer to resolve the ambiguity. Keep it under 30 words.",
        question, config.name, config.description
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Artifact;
    use crate::core::Theme;

    fn config() -> ProjectConfig {
        ProjectConfig::new("TaskMaster", "A todo app", Theme::Glassmorphism)
    }

    #[test]
    fn test_pipeline_is_ordered_and_lookup_matches() {
        for (i, desc) in PIPELINE.iter().enumerate() {
            assert_eq!(usize::from(desc.step.number()), i + 1);
            assert_eq!(descriptor(desc.step).step, desc.step);
        }
    }

    fn generation(step: StepId) -> &'static StepGeneration {
        descriptor(step).generation.as_ref().unwrap()
    }

    #[test]
    fn test_only_architecture_and_verification_are_advisory() {
        let advisory: Vec<StepId> = PIPELINE
            .iter()
            .filter(|d| d.generation.is_none())
            .map(|d| d.step)
            .collect();
        assert_eq!(advisory, vec![StepId::Architecture, StepId::Verification]);
        let probing: Vec<StepId> = PIPELINE
            .iter()
            .filter(|d| d.generation.as_ref().is_some_and(|g| g.probe_ambiguity))
            .map(|d| d.step)
            .collect();
        assert_eq!(probing, vec![StepId::Logic]);
    }

    #[test]
    fn test_prompts_name_target_file() {
        let cfg = config();
        let files = ArtifactSet::new();
        let ctx = GenerationContext::new(&cfg, &files);
        for (step, file) in [
            (StepId::Requirements, "README.md"),
            (StepId::Styles, "style.css"),
            (StepId::Structure, "index.html"),
            (StepId::Logic, "app.js"),
        ] {
            let prompt = generation(step).build_prompt(&ctx);
            assert!(prompt.ends_with(&format!("array containing {}.", file)));
            assert!(!generation(step).failure_message.is_empty());
        }
    }

    #[test]
    fn test_logic_prompt_includes_context_and_clarification() {
        let cfg = config();
        let files = ArtifactSet::from(vec![Artifact::new("index.html", "html", "<main id=\"list\">")]);
        let ctx = GenerationContext::new(&cfg, &files).clarified("Use localStorage only.");
        let prompt = generation(StepId::Logic).build_prompt(&ctx);
        assert!(prompt.contains("--- index.html ---\n<main id=\"list\">"));
        assert!(prompt.contains("CLARIFICATION FROM ARCHITECT: \"Use localStorage only.\""));
        assert!(ctx.has_clarified);
    }

    #[test]
    fn test_start_message_substitutes_theme() {
        let msg = descriptor(StepId::Styles).start_message_for(&config());
        assert_eq!(msg, "Implementing glassmorphism design system...");
    }
}
