//! 发往后端的消息：角色 + 文本
//!
//! 生成客户端把「系统指令 + 响应 Schema」放进 System 消息，把步骤提示词放进 User 消息。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 取第一条指定角色的消息内容
pub fn first_of(messages: &[Message], role: Role) -> Option<&str> {
    messages
        .iter()
        .find(|m| m.role == role)
        .map(|m| m.content.as_str())
}
