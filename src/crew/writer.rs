//! Writer：基于 findings 生成最终内容
//!
//! 总是终止：无论成功失败都写入非空 draft 并设置 next_step = Terminate。

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{AgentRole, CapabilityError, CrewState, NextStep};
use crate::crew::prompts::{fill, WRITING_USER};
use crate::crew::Step;
use crate::llm::{LlmClient, Message};

/// findings 为空时的事实块占位
pub const NO_FACTS_PLACEHOLDER: &str = "No specific research data available.";

/// 将 findings 拼成 "- fact" 列表
pub fn facts_block(findings: &[String]) -> String {
    if findings.is_empty() {
        return NO_FACTS_PLACEHOLDER.to_string();
    }
    findings
        .iter()
        .map(|f| format!("- {}", f))
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct Writer {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl Writer {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
        }
    }

    async fn write(&self, state: &CrewState) -> Result<String, CapabilityError> {
        if !state.has_findings() {
            tracing::info!("writer: no research data available, writing from general knowledge");
        }
        let facts = facts_block(&state.findings);
        let messages = vec![
            Message::system(self.system_prompt.clone()),
            Message::user(fill(WRITING_USER, &[("query", state.query()), ("facts", &facts)])),
        ];
        let draft = self.llm.complete(&messages).await?;
        if draft.trim().is_empty() {
            return Err(CapabilityError::MalformedResponse(
                "the model returned an empty response".to_string(),
            ));
        }
        Ok(draft)
    }
}

#[async_trait]
impl Step for Writer {
    fn role(&self) -> AgentRole {
        AgentRole::Writer
    }

    fn llm(&self) -> Option<&Arc<dyn LlmClient>> {
        Some(&self.llm)
    }

    async fn run(&self, mut state: CrewState) -> CrewState {
        let note = match self.write(&state).await {
            Ok(draft) => {
                tracing::info!(chars = draft.chars().count(), "writer generated content");
                state.draft = draft;
                "Writing completed successfully.".to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "writer error");
                state.draft = format!("Error generating written content: {}", e);
                format!("Writing encountered an error: {}", e)
            }
        };
        state.next_step = NextStep::Terminate;
        state.record(AgentRole::Writer, note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crew::prompts::WRITING_SYSTEM;
    use crate::llm::ScriptedLlmClient;

    #[test]
    fn test_facts_block() {
        assert_eq!(facts_block(&[]), NO_FACTS_PLACEHOLDER);
        let facts = vec!["A".to_string(), "B".to_string()];
        assert_eq!(facts_block(&facts), "- A\n- B");
    }

    #[tokio::test]
    async fn test_empty_findings_still_drafts() {
        let llm = Arc::new(ScriptedLlmClient::new().push_text("Leaves fall softly..."));
        let out = Writer::new(llm.clone(), WRITING_SYSTEM)
            .run(CrewState::new("Write a short poem about autumn"))
            .await;
        assert_eq!(out.draft, "Leaves fall softly...");
        assert_eq!(out.next_step, NextStep::Terminate);
        assert_eq!(out.step_count, 1);
        assert!(llm.last_messages()[1].content.contains(NO_FACTS_PLACEHOLDER));
    }

    #[tokio::test]
    async fn test_failure_yields_error_draft_and_terminates() {
        let llm = Arc::new(ScriptedLlmClient::failing());
        let mut state = CrewState::new("q");
        state.findings.push("fact".into());
        let out = Writer::new(llm, WRITING_SYSTEM).run(state).await;
        assert!(out.draft.starts_with("Error generating written content:"));
        assert_eq!(out.next_step, NextStep::Terminate);
        assert_eq!(out.history.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_reply_is_treated_as_failure() {
        let llm = Arc::new(ScriptedLlmClient::new().push_text("   \n"));
        let out = Writer::new(llm, WRITING_SYSTEM).run(CrewState::new("q")).await;
        assert!(out.has_draft());
        assert!(out.draft.contains("empty response"));
    }
}
