//! 循环驱动：Coordinator -> {Researcher | Writer | 结束} -> Coordinator ...
//!
//! 每轮读取 next_step 分发到对应步骤，用步骤返回的状态替换当前状态；
//! 只在两轮之间检查取消，执行前检查步数上限。

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::core::{CrewState, NextStep, WorkflowError};
use crate::crew::{Coordinator, CrewEvent, Researcher, Step, Writer};

/// 单次运行默认最多执行的步骤数
pub const DEFAULT_MAX_STEPS: usize = 25;

/// 两次累计值之差
pub fn usage_since(before: (u64, u64, u64), after: (u64, u64, u64)) -> (u64, u64, u64) {
    (
        after.0.saturating_sub(before.0),
        after.1.saturating_sub(before.1),
        after.2.saturating_sub(before.2),
    )
}

/// 三个角色与循环参数
pub struct Crew {
    coordinator: Arc<dyn Step>,
    researcher: Arc<dyn Step>,
    writer: Arc<dyn Step>,
    max_steps: usize,
    event_tx: Option<UnboundedSender<CrewEvent>>,
}

impl Crew {
    pub fn new(coordinator: Coordinator, researcher: Researcher, writer: Writer) -> Self {
        Self::from_steps(Arc::new(coordinator), Arc::new(researcher), Arc::new(writer))
    }

    /// 直接传入任意 Step 实现（测试中可替换单个角色）
    pub fn from_steps(
        coordinator: Arc<dyn Step>,
        researcher: Arc<dyn Step>,
        writer: Arc<dyn Step>,
    ) -> Self {
        Self {
            coordinator,
            researcher,
            writer,
            max_steps: DEFAULT_MAX_STEPS,
            event_tx: None,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_event_tx(mut self, tx: UnboundedSender<CrewEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// 各角色 LLM 客户端的累计 token 使用：(prompt, completion, total)；共享的客户端只计一次
    pub fn token_usage(&self) -> (u64, u64, u64) {
        let mut seen: Vec<*const ()> = Vec::new();
        let mut sum = (0, 0, 0);
        for step in [&self.coordinator, &self.researcher, &self.writer] {
            let Some(llm) = step.llm() else {
                continue;
            };
            let ptr = Arc::as_ptr(llm) as *const ();
            if seen.contains(&ptr) {
                continue;
            }
            seen.push(ptr);
            let (prompt, completion, total) = llm.token_usage();
            sum = (sum.0 + prompt, sum.1 + completion, sum.2 + total);
        }
        sum
    }

    /// 当前状态对应的步骤；Terminate 返回 None
    fn dispatch(&self, next: NextStep) -> Option<&Arc<dyn Step>> {
        match next {
            NextStep::Coordinator => Some(&self.coordinator),
            NextStep::Research => Some(&self.researcher),
            NextStep::Writing => Some(&self.writer),
            NextStep::Terminate => None,
        }
    }

    fn send_event(&self, ev: CrewEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(ev);
        }
    }

    /// 执行完整循环并返回终止状态
    pub async fn run(&self, query: &str) -> Result<CrewState, WorkflowError> {
        self.run_with_cancel(query, CancellationToken::new()).await
    }

    pub async fn run_with_cancel(
        &self,
        query: &str,
        cancel_token: CancellationToken,
    ) -> Result<CrewState, WorkflowError> {
        let span = tracing::info_span!("crew_run", run_id = %uuid::Uuid::new_v4());
        self.drive(CrewState::new(query), cancel_token)
            .instrument(span)
            .await
    }

    /// 从给定状态继续驱动，直到 Terminate
    pub async fn drive(
        &self,
        mut state: CrewState,
        cancel_token: CancellationToken,
    ) -> Result<CrewState, WorkflowError> {
        tracing::info!(query = %state.query(), max_steps = self.max_steps, "crew run started");
        let usage_before = self.token_usage();

        while let Some(step) = self.dispatch(state.next_step) {
            if cancel_token.is_cancelled() {
                tracing::warn!(steps = state.step_count, "crew run cancelled");
                return Err(WorkflowError::Cancelled {
                    steps: state.step_count,
                    state: Box::new(state),
                });
            }
            if state.step_count >= self.max_steps {
                tracing::warn!(limit = self.max_steps, "crew step limit reached");
                return Err(WorkflowError::StepLimitExceeded {
                    limit: self.max_steps,
                    state: Box::new(state),
                });
            }

            let role = step.role();
            self.send_event(CrewEvent::StepStarted {
                step: state.step_count + 1,
                max_steps: self.max_steps,
                role,
            });

            state = step.run(state).await;

            self.send_event(CrewEvent::StepFinished {
                step: state.step_count,
                role,
                next_step: state.next_step,
                note: state.last_note().unwrap_or_default().to_string(),
            });
        }

        let usage = usage_since(usage_before, self.token_usage());
        tracing::info!(
            steps = state.step_count,
            task_kind = %state.task_kind,
            findings = state.findings.len(),
            draft_chars = state.draft.chars().count(),
            prompt_tokens = usage.0,
            completion_tokens = usage.1,
            total_tokens = usage.2,
            "crew run complete"
        );
        self.send_event(CrewEvent::Finished {
            steps: state.step_count,
            task_kind: state.task_kind,
            total_tokens: usage.2,
        });
        Ok(state)
    }
}
