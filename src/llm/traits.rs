//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock / Scripted）实现 LlmClient：
//! complete（自由文本）、complete_structured（按 JSON Schema 返回结构化对象）。

use async_trait::async_trait;
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::CapabilityError;
use crate::llm::Message;

/// 结构化输出的 schema 描述（名称 + JSON Schema）
#[derive(Debug, Clone)]
pub struct ResponseSchema {
    pub name: String,
    pub description: Option<String>,
    pub schema: Value,
}

impl ResponseSchema {
    /// 由 schemars 生成 T 的 schema；子 schema 全部内联，去掉 `$schema`、`title` 与类型自身的文档（顶层 `description`）
    pub fn of<T: JsonSchema>(name: impl Into<String>) -> Self {
        let generator = SchemaSettings::draft07()
            .with(|s| {
                s.inline_subschemas = true;
                s.meta_schema = None;
            })
            .into_generator();
        let root = generator.into_root_schema_for::<T>();
        let mut schema = serde_json::to_value(&root).unwrap_or_else(|_| Value::Object(Default::default()));
        if let Some(obj) = schema.as_object_mut() {
            obj.remove("title");
            obj.remove("description");
        }
        Self {
            name: name.into(),
            description: None,
            schema,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 自由文本补全
    async fn complete(&self, messages: &[Message]) -> Result<String, CapabilityError>;

    /// 结构化补全：返回符合 schema 的 JSON 对象，否则报错
    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &ResponseSchema,
    ) -> Result<Value, CapabilityError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

/// 结构化补全并反序列化为 T；字段不匹配时返回 MalformedResponse
pub async fn complete_typed<T>(
    llm: &dyn LlmClient,
    messages: &[Message],
    schema: &ResponseSchema,
) -> Result<T, CapabilityError>
where
    T: DeserializeOwned + JsonSchema,
{
    let value = llm.complete_structured(messages, schema).await?;
    serde_json::from_value(value)
        .map_err(|e| CapabilityError::MalformedResponse(format!("{}: {}", schema.name, e)))
}
