//! AppForge - 多 Agent 协作的 Web 小应用生成器
//!
//! 模块划分：
//! - **artifact**: 产物文件与按名称后写覆盖的合并
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 项目描述、Agent / 步骤 / 日志状态、错误类型
//! - **generation**: 响应清洗、响应 Schema、步骤人设表、生成客户端
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **observability**: 日志初始化
//! - **workflow**: 六步流水线、澄清协议、状态看板、细化与导出

pub mod artifact;
pub mod config;
pub mod core;
pub mod generation;
pub mod llm;
pub mod observability;
pub mod workflow;

pub use artifact::{Artifact, ArtifactSet};
pub use workflow::{Forge, ForgeBuilder};
