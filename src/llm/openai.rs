//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；支持 OpenAI、DeepSeek、自建代理等。
//! 结构化输出两种模式：`json_schema`（严格 schema）与 `json_object`（schema 写入 system 消息，供不支持 schema 的端点使用）。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest, CreateChatCompletionRequestArgs, ResponseFormat,
    ResponseFormatJsonSchema,
};
use async_openai::Client;
use async_trait::async_trait;
use serde_json::Value;

use crate::core::CapabilityError;
use crate::llm::{LlmClient, Message, ResponseSchema, Role};

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

/// 结构化输出的请求方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuredMode {
    /// response_format = json_schema（strict）
    JsonSchema,
    /// response_format = json_object，schema 放进 system 消息
    JsonObject,
}

/// OpenAI 兼容客户端：持有 Client、model 与 temperature
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    base_url: Option<String>,
    model: String,
    temperature: Option<f32>,
    structured_mode: StructuredMode,
    /// 累计 token 使用统计
    pub usage: TokenUsage,
}

impl OpenAiClient {
    /// 凭证由调用方注入，客户端内部不读取环境变量
    pub fn new(base_url: Option<&str>, model: &str, api_key: &str) -> Self {
        let config = match base_url {
            Some(url) => OpenAIConfig::new().with_api_base(url).with_api_key(api_key),
            None => OpenAIConfig::new().with_api_key(api_key),
        };

        Self {
            client: Client::with_config(config),
            base_url: base_url.map(str::to_string),
            model: model.to_string(),
            temperature: None,
            structured_mode: StructuredMode::JsonSchema,
            usage: TokenUsage::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_structured_mode(mut self, mode: StructuredMode) -> Self {
        self.structured_mode = mode;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// 自定义端点；None 表示 async-openai 默认的 OpenAI 地址
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn structured_mode(&self) -> StructuredMode {
        self.structured_mode
    }

    fn to_openai_messages(
        &self,
        messages: &[Message],
    ) -> Result<Vec<ChatCompletionRequestMessage>, CapabilityError> {
        messages
            .iter()
            .map(|m| {
                let msg = match m.role {
                    Role::System => ChatCompletionRequestMessage::System(
                        ChatCompletionRequestSystemMessageArgs::default()
                            .content(m.content.clone())
                            .build()
                            .map_err(map_openai_error)?,
                    ),
                    Role::User => ChatCompletionRequestMessage::User(
                        ChatCompletionRequestUserMessageArgs::default()
                            .content(m.content.clone())
                            .build()
                            .map_err(map_openai_error)?,
                    ),
                };
                Ok(msg)
            })
            .collect()
    }

    fn build_request(
        &self,
        messages: &[Message],
        response_format: Option<ResponseFormat>,
    ) -> Result<CreateChatCompletionRequest, CapabilityError> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(self.to_openai_messages(messages)?);
        if let Some(t) = self.temperature {
            args.temperature(t);
        }
        if let Some(format) = response_format {
            args.response_format(format);
        }
        args.build().map_err(map_openai_error)
    }

    /// 发送请求并取首条 content；顺带累计 token 使用
    async fn send(&self, request: CreateChatCompletionRequest) -> Result<String, CapabilityError> {
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        if let Some(usage) = &response.usage {
            self.usage
                .add(usage.prompt_tokens as u64, usage.completion_tokens as u64);
        }

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(content)
    }
}

fn map_openai_error(e: OpenAIError) -> CapabilityError {
    match e {
        OpenAIError::Reqwest(err) => CapabilityError::from(err),
        OpenAIError::ApiError(api) => CapabilityError::Api(api.message),
        other => CapabilityError::Api(other.to_string()),
    }
}

/// 从模型回复中提取 JSON 对象（兼容 ```json ... ``` 包裹或前后夹杂文字）
pub(crate) fn extract_json_object(output: &str) -> Result<Value, CapabilityError> {
    let trimmed = output.trim();
    let json_str = if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim())
    } else if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start <= end {
            &trimmed[start..=end]
        } else {
            trimmed
        }
    } else {
        trimmed
    };

    let value: Value = serde_json::from_str(json_str)
        .map_err(|e| CapabilityError::MalformedResponse(format!("{}: {}", e, json_str)))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(CapabilityError::MalformedResponse(format!(
            "expected a JSON object, got: {}",
            json_str
        )))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, CapabilityError> {
        let request = self.build_request(messages, None)?;
        self.send(request).await
    }

    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &ResponseSchema,
    ) -> Result<Value, CapabilityError> {
        let request = match self.structured_mode {
            StructuredMode::JsonSchema => {
                let format = ResponseFormat::JsonSchema {
                    json_schema: ResponseFormatJsonSchema {
                        description: schema.description.clone(),
                        name: schema.name.clone(),
                        schema: Some(schema.schema.clone()),
                        strict: Some(true),
                    },
                };
                self.build_request(messages, Some(format))?
            }
            StructuredMode::JsonObject => {
                let mut full = messages.to_vec();
                full.push(Message::system(format!(
                    "Respond with a single JSON object and nothing else. It must match this JSON schema:\n{}",
                    schema.schema
                )));
                self.build_request(&full, Some(ResponseFormat::JsonObject))?
            }
        };

        let content = self.send(request).await?;
        tracing::debug!(schema = %schema.name, chars = content.len(), "structured completion");
        extract_json_object(&content)
    }
}
