//! 响应 Schema：文件数组 / 澄清问题探测 / 自由文本
//!
//! 用 schemars 生成 JSON Schema 并拼入 system 指令，约束后端输出格式。

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;

/// 产出代码的调用返回的结构：`{"files": [{name, language, content}]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FilesPayload {
    /// 需要新建或整体替换的文件；缺省视为空数组
    #[serde(default)]
    pub files: Vec<Artifact>,
}

/// 歧义探测返回的结构：`{"question": string | null}`
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct QuestionProbe {
    /// 唯一一个阻碍实现的关键问题；没有疑问时为 null
    #[serde(default)]
    pub question: Option<String>,
}

/// 一次调用期望的响应形状
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSchema {
    Files,
    Question,
    /// 不约束，直接返回文本（澄清回答）
    FreeText,
}

impl ResponseSchema {
    /// 返回 JSON Schema 字符串；FreeText 没有 Schema
    pub fn json_schema(&self) -> Option<String> {
        let schema = match self {
            ResponseSchema::Files => schema_for!(FilesPayload),
            ResponseSchema::Question => schema_for!(QuestionProbe),
            ResponseSchema::FreeText => return None,
        };
        serde_json::to_string_pretty(&schema).ok()
    }

    /// 将 Schema 约束拼到 system 指令之后
    pub fn apply_to(&self, system_instruction: &str) -> String {
        match self.json_schema() {
            Some(schema) => format!(
                "{}\n\nRespond ONLY with a JSON object matching this JSON Schema (no prose, no markdown):\n{}",
                system_instruction, schema
            ),
            None => system_instruction.to_string(),
        }
    }
}
