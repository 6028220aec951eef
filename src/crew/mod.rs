//! 角色层：Coordinator、Researcher、Writer 与循环驱动
//!
//! 每个角色都是 `Step`：接收当前状态（按值），返回下一状态；能力失败在步骤内部消化。

pub mod coordinator;
pub mod events;
pub mod loop_;
pub mod prompts;
pub mod researcher;
pub mod writer;

use async_trait::async_trait;

use std::sync::Arc;

use crate::core::{AgentRole, CrewState};
use crate::llm::LlmClient;

pub use coordinator::{fallback_route, Coordinator, RouteDecision, RouteTarget, RoutedKind};
pub use events::CrewEvent;
pub use loop_::{usage_since, Crew, DEFAULT_MAX_STEPS};
pub use prompts::PromptSet;
pub use researcher::{normalize_hits, parse_fact_lines, Researcher, NO_RESULTS_FINDING};
pub use writer::{facts_block, Writer, NO_FACTS_PLACEHOLDER};

/// 一个步骤：State -> State，不返回错误
#[async_trait]
pub trait Step: Send + Sync {
    fn role(&self) -> AgentRole;

    /// 步骤使用的 LLM 客户端（用于汇总 token 使用）
    fn llm(&self) -> Option<&Arc<dyn LlmClient>> {
        None
    }

    /// 执行一次；实现必须恰好调用一次 `CrewState::record`
    async fn run(&self, state: CrewState) -> CrewState;
}
