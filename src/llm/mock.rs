//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 可预置固定回复或固定失败；未预置时把最后一条 User 消息包成 unknown 意图返回。

use async_trait::async_trait;

use crate::llm::{LlmClient, Message, Role};

#[derive(Debug, Default)]
pub struct MockLlmClient {
    reply: Option<Result<String, String>>,
}

impl MockLlmClient {
    /// 每次都返回给定内容
    pub fn scripted(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(Ok(reply.into())),
        }
    }

    /// 每次都失败（模拟服务不可达）
    pub fn failing(error: impl Into<String>) -> Self {
        Self {
            reply: Some(Err(error.into())),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        if let Some(reply) = &self.reply {
            return reply.clone();
        }

        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        Ok(serde_json::json!({ "intent": "unknown", "raw": last_user }).to_string())
    }
}
