//! DeepSeek API 客户端（OpenAI 兼容格式）
//!
//! - Base URL: https://api.deepseek.com
//! - 模型: deepseek-chat (常规对话), deepseek-reasoner (思考模式)
//! - 不支持 json_schema，结构化输出走 json_object 模式

use crate::llm::{OpenAiClient, StructuredMode};

/// DeepSeek API 常量
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";
pub const DEEPSEEK_REASONER: &str = "deepseek-reasoner";

/// 创建 DeepSeek 客户端；base_url 为空时使用官方地址，model 为空时使用 deepseek-chat
pub fn create_deepseek_client(
    base_url: Option<&str>,
    model: Option<&str>,
    api_key: &str,
) -> OpenAiClient {
    let base_url = base_url.unwrap_or(DEEPSEEK_BASE_URL);
    let model = model.unwrap_or(DEEPSEEK_CHAT);
    OpenAiClient::new(Some(base_url), model, api_key)
        .with_structured_mode(StructuredMode::JsonObject)
}
