//! Mock LLM 客户端（无需 API）
//!
//! - `MockLlmClient`：离线演示用，确定性输出；根据 Coordinator 提示中的状态行决定路由
//! - `ScriptedLlmClient`：测试替身，按队列返回预设回复或错误，并统计调用次数

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::CapabilityError;
use crate::llm::{LlmClient, Message, ResponseSchema, Role, TokenUsage};

fn last_user(messages: &[Message]) -> &str {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or("(no input)")
}

fn system_text(messages: &[Message]) -> String {
    messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Mock 客户端：不联网，输出固定模板
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, CapabilityError> {
        let input = last_user(messages);
        if input.contains("Search results:") {
            return Ok([
                "- The search results cover the topic from several sources.",
                "- Each source contributes a short factual summary.",
                "- (Mock) No model was called to extract these facts.",
            ]
            .join("\n"));
        }
        let query = input
            .lines()
            .find_map(|l| l.strip_prefix("User Query:"))
            .map(str::trim)
            .unwrap_or(input);
        Ok(format!(
            "(Mock) This is an offline draft responding to: {}\n\n\
             It was produced without contacting a language model, so it only demonstrates the workflow.",
            query
        ))
    }

    async fn complete_structured(
        &self,
        messages: &[Message],
        _schema: &ResponseSchema,
    ) -> Result<Value, CapabilityError> {
        let system = system_text(messages);
        let decision = if system.contains("Draft Written: Yes") {
            json!({"next_step": "terminate", "reasoning": "(Mock) draft already written", "task_kind": "complete"})
        } else if system.contains("Research Facts Gathered: Yes") {
            json!({"next_step": "writing", "reasoning": "(Mock) facts are available", "task_kind": "combined"})
        } else {
            json!({"next_step": "research", "reasoning": "(Mock) no facts gathered yet", "task_kind": "research"})
        };
        Ok(decision)
    }
}

/// 脚本化客户端：文本 / 结构化回复各一条队列；队列空时使用默认回复，仍无则返回错误
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    texts: Mutex<VecDeque<Result<String, CapabilityError>>>,
    decisions: Mutex<VecDeque<Result<Value, CapabilityError>>>,
    default_text: Option<String>,
    default_decision: Option<Value>,
    text_calls: AtomicUsize,
    structured_calls: AtomicUsize,
    last_messages: Mutex<Vec<Message>>,
    per_call_usage: Option<(u64, u64)>,
    usage: TokenUsage,
}

impl ScriptedLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有调用都失败的客户端
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn push_text(mut self, text: impl Into<String>) -> Self {
        self.texts
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Ok(text.into()));
        self
    }

    pub fn push_text_error(mut self, err: CapabilityError) -> Self {
        self.texts
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Err(err));
        self
    }

    pub fn push_decision(mut self, decision: Value) -> Self {
        self.decisions
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Ok(decision));
        self
    }

    pub fn push_decision_error(mut self, err: CapabilityError) -> Self {
        self.decisions
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Err(err));
        self
    }

    /// 队列耗尽后始终返回该文本
    pub fn always_text(mut self, text: impl Into<String>) -> Self {
        self.default_text = Some(text.into());
        self
    }

    /// 队列耗尽后始终返回该结构化决策
    pub fn always_decide(mut self, decision: Value) -> Self {
        self.default_decision = Some(decision);
        self
    }

    /// 每次调用（无论成败）计入固定的 token 数
    pub fn with_usage_per_call(mut self, prompt: u64, completion: u64) -> Self {
        self.per_call_usage = Some((prompt, completion));
        self
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn structured_calls(&self) -> usize {
        self.structured_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.text_calls() + self.structured_calls()
    }

    /// 最近一次调用收到的消息（用于断言提示内容）
    pub fn last_messages(&self) -> Vec<Message> {
        self.last_messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn remember(&self, messages: &[Message]) {
        *self.last_messages.lock().unwrap_or_else(|e| e.into_inner()) = messages.to_vec();
        if let Some((prompt, completion)) = self.per_call_usage {
            self.usage.add(prompt, completion);
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, CapabilityError> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.remember(messages);
        let next = self
            .texts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match next {
            Some(reply) => reply,
            None => self
                .default_text
                .clone()
                .ok_or_else(|| CapabilityError::Api("no scripted text reply".to_string())),
        }
    }

    async fn complete_structured(
        &self,
        messages: &[Message],
        _schema: &ResponseSchema,
    ) -> Result<Value, CapabilityError> {
        self.structured_calls.fetch_add(1, Ordering::SeqCst);
        self.remember(messages);
        let next = self
            .decisions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match next {
            Some(reply) => reply,
            None => self
                .default_decision
                .clone()
                .ok_or_else(|| CapabilityError::Api("no scripted decision".to_string())),
        }
    }
}
