//! Mock LLM 客户端（无需 API）
//!
//! - MockLlmClient：离线跑通整条流水线，按请求类型返回固定内容（无澄清问题、每步一个文件）
//! - ScriptedLlmClient：测试用，按顺序回放预置响应并记录每次请求

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{first_of, LlmClient, LlmError, Message, Role};

/// 提示词中声明目标文件的固定句式
const TARGET_MARKER: &str = "array containing ";

/// Mock 客户端：根据 System 消息中的 Schema 名判断调用类型
#[derive(Debug, Default)]
pub struct MockLlmClient;

impl MockLlmClient {
    fn canned_file(name: &str) -> (String, String) {
        let ext = name.rsplit('.').next().unwrap_or_default();
        match ext {
            "md" => (
                "markdown".into(),
                "# Project\n\nGenerated offline by the mock backend.\n".into(),
            ),
            "css" => (
                "css".into(),
                ":root { --accent: #6366f1; }\nbody { font-family: system-ui, sans-serif; }\n".into(),
            ),
            "html" => (
                "html".into(),
                "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n  <link rel=\"stylesheet\" href=\"style.css\">\n</head>\n<body>\n  <main id=\"app\"></main>\n  <script src=\"app.js\"></script>\n</body>\n</html>\n".into(),
            ),
            "js" => (
                "javascript".into(),
                "document.addEventListener(\"DOMContentLoaded\", () => {\n  const state = JSON.parse(localStorage.getItem(\"state\") || \"{}\");\n  localStorage.setItem(\"state\", JSON.stringify(state));\n});\n".into(),
            ),
            _ => ("text".into(), String::new()),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let system = first_of(messages, Role::System).unwrap_or_default();
        let user = first_of(messages, Role::User).unwrap_or_default();

        if system.contains("QuestionProbe") {
            return Ok("```json\n{\"question\": null}\n```".to_string());
        }
        if !system.contains("FilesPayload") {
            return Ok("Proceed with standard best practices.".to_string());
        }

        let target = user
            .rsplit_once(TARGET_MARKER)
            .map(|(_, rest)| rest.trim().trim_end_matches('.').to_string())
            .filter(|name| !name.is_empty() && !name.contains(char::is_whitespace));
        let Some(name) = target else {
            return Ok(r#"{"files": []}"#.to_string());
        };
        let (language, content) = Self::canned_file(&name);
        let payload = serde_json::json!({
            "files": [{ "name": name, "language": language, "content": content }]
        });
        Ok(format!("Here is the file you asked for:\n{}", payload))
    }
}

/// 按顺序回放预置响应；脚本耗尽后返回错误
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new();
        for r in responses {
            client.push_ok(r);
        }
        client
    }

    pub fn push_ok(&self, response: impl Into<String>) {
        self.lock_responses().push_back(Ok(response.into()));
    }

    pub fn push_err(&self, error: LlmError) {
        self.lock_responses().push_back(Err(error));
    }

    /// 已收到的全部请求（按调用顺序）
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// 尚未被消费的响应数
    pub fn remaining(&self) -> usize {
        self.lock_responses().len()
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, LlmError>>> {
        self.responses.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(messages.to_vec());
        self.lock_responses()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Request("script exhausted".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_requested_file() {
        let reply = MockLlmClient
            .complete(&[
                Message::system("schema: FilesPayload"),
                Message::user("Return JSON object with \"files\" array containing style.css."),
            ])
            .await
            .unwrap();
        assert!(reply.contains("\"name\":\"style.css\""));
        assert!(reply.contains("\"language\":\"css\""));
    }

    #[tokio::test]
    async fn test_mock_refine_request_changes_nothing() {
        let reply = MockLlmClient
            .complete(&[
                Message::system("schema: FilesPayload"),
                Message::user("- Return a JSON object with a \"files\" array containing ONLY the files that need to be updated."),
            ])
            .await
            .unwrap();
        assert_eq!(reply, r#"{"files": []}"#);
    }

    #[tokio::test]
    async fn test_mock_probe_has_no_question() {
        let reply = MockLlmClient
            .complete(&[Message::system("schema: QuestionProbe"), Message::user("?")])
            .await
            .unwrap();
        assert!(reply.contains("\"question\": null"));
    }

    #[tokio::test]
    async fn test_scripted_replays_in_order_then_fails() {
        let client = ScriptedLlmClient::with_responses(["one", "two"]);
        client.push_err(LlmError::Timeout(3));

        assert_eq!(client.complete(&[Message::user("a")]).await.unwrap(), "one");
        assert_eq!(client.complete(&[Message::user("b")]).await.unwrap(), "two");
        assert!(matches!(
            client.complete(&[]).await,
            Err(LlmError::Timeout(3))
        ));
        assert!(client.complete(&[]).await.is_err());
        assert_eq!(client.call_count(), 4);
        assert_eq!(client.requests()[1][0].content, "b");
    }
}
