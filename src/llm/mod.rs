//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）

pub mod message;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::LlmSection;

pub use message::{Message, Role};
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::LlmClient;

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";

/// 按 [llm] 段创建客户端；未启用或缺少 API Key 时返回 None（调用方退回纯模式匹配）
pub fn create_client(section: &LlmSection) -> Option<Arc<dyn LlmClient>> {
    if !section.enabled {
        return None;
    }

    match section.provider.as_str() {
        "mock" => Some(Arc::new(MockLlmClient::default())),
        "deepseek" => {
            let Some(key) = std::env::var("DEEPSEEK_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            else {
                warn!("LLM enabled but DEEPSEEK_API_KEY is not set, using pattern parsing only");
                return None;
            };
            let base_url = section.base_url.as_deref().unwrap_or(DEEPSEEK_BASE_URL);
            info!(model = %section.model, "Using DeepSeek for command parsing");
            Some(Arc::new(OpenAiClient::new(
                Some(base_url),
                &section.model,
                Some(key.as_str()),
            )))
        }
        "openai" => {
            if std::env::var("OPENAI_API_KEY").is_err() {
                warn!("LLM enabled but OPENAI_API_KEY is not set, using pattern parsing only");
                return None;
            }
            info!(model = %section.model, "Using OpenAI-compatible endpoint for command parsing");
            Some(Arc::new(OpenAiClient::new(
                section.base_url.as_deref(),
                &section.model,
                None,
            )))
        }
        other => {
            warn!(provider = %other, "Unknown LLM provider, using pattern parsing only");
            None
        }
    }
}
