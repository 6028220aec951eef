//! Coordinator：读取状态，决定下一步
//!
//! 决策顺序：
//! 1. draft 非空 -> Complete + Terminate，不调用模型
//! 2. 调用模型获取结构化 RouteDecision
//! 3. 成功则写入 next_step / task_kind
//! 4. 失败则确定性回退：无 findings -> Research；无 draft -> Writing；否则 Terminate；task_kind = Unknown

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::core::{AgentRole, CapabilityError, CrewState, NextStep, TaskKind};
use crate::crew::prompts::{fill, COORDINATOR_USER};
use crate::crew::Step;
use crate::llm::{complete_typed, LlmClient, Message, ResponseSchema};

/// 模型可选择的下一步
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RouteTarget {
    Research,
    Writing,
    #[serde(alias = "END", alias = "end")]
    Terminate,
}

impl From<RouteTarget> for NextStep {
    fn from(t: RouteTarget) -> Self {
        match t {
            RouteTarget::Research => NextStep::Research,
            RouteTarget::Writing => NextStep::Writing,
            RouteTarget::Terminate => NextStep::Terminate,
        }
    }
}

/// 模型给出的任务分类（不含 unknown，unknown 仅用于回退路径）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RoutedKind {
    Research,
    Writing,
    Combined,
    Complete,
}

impl From<RoutedKind> for TaskKind {
    fn from(k: RoutedKind) -> Self {
        match k {
            RoutedKind::Research => TaskKind::Research,
            RoutedKind::Writing => TaskKind::Writing,
            RoutedKind::Combined => TaskKind::Combined,
            RoutedKind::Complete => TaskKind::Complete,
        }
    }
}

/// 结构化路由决策
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RouteDecision {
    /// The next agent to call: 'research' for gathering information, 'writing' for creating content, or 'terminate' if complete
    pub next_step: RouteTarget,
    /// Brief explanation of why this agent was chosen
    pub reasoning: String,
    /// Classification of the current task
    pub task_kind: RoutedKind,
}

/// 一次协调的结果
#[derive(Debug)]
enum Routing {
    /// draft 已存在，直接结束
    Complete,
    Decided(RouteDecision),
    Fallback {
        next_step: NextStep,
        error: CapabilityError,
    },
}

/// 模型调用失败时的确定性路由
pub fn fallback_route(state: &CrewState) -> NextStep {
    if !state.has_findings() {
        NextStep::Research
    } else if !state.has_draft() {
        NextStep::Writing
    } else {
        NextStep::Terminate
    }
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "Yes"
    } else {
        "No"
    }
}

pub struct Coordinator {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
    schema: ResponseSchema,
}

impl Coordinator {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
            schema: ResponseSchema::of::<RouteDecision>("route_decision")
                .with_description("Supervisor routing decision"),
        }
    }

    fn build_messages(&self, state: &CrewState) -> Vec<Message> {
        let num_facts = state.findings.len().to_string();
        let system = fill(
            &self.system_prompt,
            &[
                ("has_facts", yes_no(state.has_findings())),
                ("has_draft", yes_no(state.has_draft())),
                ("num_facts", &num_facts),
            ],
        );
        let user = fill(COORDINATOR_USER, &[("query", state.query())]);
        vec![Message::system(system), Message::user(user)]
    }

    async fn route(&self, state: &CrewState) -> Routing {
        if state.has_draft() {
            return Routing::Complete;
        }
        let messages = self.build_messages(state);
        match complete_typed::<RouteDecision>(self.llm.as_ref(), &messages, &self.schema).await {
            Ok(decision) => Routing::Decided(decision),
            Err(error) => Routing::Fallback {
                next_step: fallback_route(state),
                error,
            },
        }
    }
}

#[async_trait]
impl Step for Coordinator {
    fn role(&self) -> AgentRole {
        AgentRole::Coordinator
    }

    fn llm(&self) -> Option<&Arc<dyn LlmClient>> {
        Some(&self.llm)
    }

    async fn run(&self, mut state: CrewState) -> CrewState {
        let note = match self.route(&state).await {
            Routing::Complete => {
                tracing::info!("coordinator: work complete, terminating");
                state.task_kind = TaskKind::Complete;
                state.next_step = NextStep::Terminate;
                "Work complete, ending workflow".to_string()
            }
            Routing::Decided(decision) => {
                state.next_step = decision.next_step.into();
                state.task_kind = decision.task_kind.into();
                tracing::info!(
                    next_step = %state.next_step,
                    task_kind = %state.task_kind,
                    reasoning = %decision.reasoning,
                    "coordinator decision"
                );
                format!(
                    "Supervisor routing to {}: {}",
                    state.next_step, decision.reasoning
                )
            }
            Routing::Fallback { next_step, error } => {
                tracing::warn!(error = %error, next_step = %next_step, "coordinator using fallback routing");
                state.next_step = next_step;
                state.task_kind = TaskKind::Unknown;
                format!(
                    "Supervisor using fallback routing to {} ({})",
                    next_step, error
                )
            }
        };
        state.record(AgentRole::Coordinator, note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crew::prompts::COORDINATOR_SYSTEM;
    use crate::llm::ScriptedLlmClient;
    use serde_json::json;

    fn coordinator(llm: Arc<ScriptedLlmClient>) -> Coordinator {
        Coordinator::new(llm, COORDINATOR_SYSTEM)
    }

    #[tokio::test]
    async fn test_draft_short_circuits_without_model_call() {
        let llm = Arc::new(ScriptedLlmClient::failing());
        let mut state = CrewState::new("q");
        state.findings.push("fact".into());
        state.draft = "done".into();

        let out = coordinator(llm.clone()).run(state).await;
        assert_eq!(out.next_step, NextStep::Terminate);
        assert_eq!(out.task_kind, TaskKind::Complete);
        assert_eq!(out.step_count, 1);
        assert_eq!(out.history.len(), 1);
        assert_eq!(llm.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_decision_copied_into_state() {
        let llm = Arc::new(ScriptedLlmClient::new().push_decision(json!({
            "next_step": "research",
            "reasoning": "needs current facts",
            "task_kind": "combined"
        })));
        let out = coordinator(llm.clone()).run(CrewState::new("news today")).await;
        assert_eq!(out.next_step, NextStep::Research);
        assert_eq!(out.task_kind, TaskKind::Combined);
        assert!(out.history[0].content.contains("needs current facts"));
        assert_eq!(llm.structured_calls(), 1);

        let sent = llm.last_messages();
        assert!(sent[0].content.contains("Research Facts Gathered: No"));
        assert!(sent[0].content.contains("Number of Facts: 0"));
        assert!(sent[1].content.contains("news today"));
    }

    #[tokio::test]
    async fn test_end_alias_means_terminate() {
        let llm = Arc::new(ScriptedLlmClient::new().push_decision(json!({
            "next_step": "END",
            "reasoning": "nothing to do",
            "task_kind": "complete"
        })));
        let out = coordinator(llm).run(CrewState::new("q")).await;
        assert_eq!(out.next_step, NextStep::Terminate);
    }

    #[tokio::test]
    async fn test_fallback_grid() {
        // 无 findings -> research
        let out = coordinator(Arc::new(ScriptedLlmClient::failing()))
            .run(CrewState::new("q"))
            .await;
        assert_eq!(out.next_step, NextStep::Research);
        assert_eq!(out.task_kind, TaskKind::Unknown);
        assert!(out.history[0].content.contains("fallback"));

        // 有 findings、无 draft -> writing
        let mut state = CrewState::new("q");
        state.findings.push("fact".into());
        let out = coordinator(Arc::new(ScriptedLlmClient::failing())).run(state).await;
        assert_eq!(out.next_step, NextStep::Writing);
        assert_eq!(out.task_kind, TaskKind::Unknown);
    }

    #[test]
    fn test_fallback_route_both_present_terminates() {
        let mut state = CrewState::new("q");
        state.findings.push("fact".into());
        state.draft = "text".into();
        assert_eq!(fallback_route(&state), NextStep::Terminate);
    }

    #[tokio::test]
    async fn test_malformed_decision_falls_back() {
        let llm = Arc::new(
            ScriptedLlmClient::new()
                .push_decision(json!({"next_step": "coordinator", "reasoning": "?", "task_kind": "research"})),
        );
        let out = coordinator(llm).run(CrewState::new("q")).await;
        assert_eq!(out.next_step, NextStep::Research);
        assert_eq!(out.task_kind, TaskKind::Unknown);
    }

    #[tokio::test]
    async fn test_idempotent_on_unchanged_state() {
        let llm = Arc::new(ScriptedLlmClient::new().always_decide(json!({
            "next_step": "writing",
            "reasoning": "creative task",
            "task_kind": "writing"
        })));
        let c = coordinator(llm);
        let state = CrewState::new("Write a haiku");
        let first = c.run(state.clone()).await;
        let second = c.run(state).await;
        assert_eq!(first.next_step, second.next_step);
        assert_eq!(first.task_kind, second.task_kind);
    }

    #[test]
    fn test_schema_enumerates_targets() {
        let schema = ResponseSchema::of::<RouteDecision>("route_decision");
        let next_step = schema.schema["properties"]["next_step"].to_string();
        assert!(next_step.contains("\"research\""));
        assert!(next_step.contains("\"writing\""));
        assert!(next_step.contains("\"terminate\""));
        assert!(!next_step.contains("coordinator"));
        assert!(schema.schema.get("description").is_none());
        assert_eq!(schema.description.as_deref(), Some("Supervisor routing decision"));
    }

    #[tokio::test]
    async fn test_timeout_falls_back_with_error_in_note() {
        let llm = Arc::new(ScriptedLlmClient::new().push_decision_error(CapabilityError::Timeout));
        let out = coordinator(llm.clone()).run(CrewState::new("q")).await;
        assert_eq!(out.next_step, NextStep::Research);
        assert_eq!(out.task_kind, TaskKind::Unknown);
        assert!(out.history[0].content.contains("Request timed out"));
        assert_eq!(llm.structured_calls(), 1);
    }
}
