//! 共享状态：在各步骤之间传递的唯一记录
//!
//! 每次运行创建一个 CrewState，按值移入步骤、由步骤返回下一个值；不做跨运行持久化。
//! `record` 是唯一追加历史的入口，同时递增 step_count，保证 `history.len() == step_count`。

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 任务分类（仅由 Coordinator 写入）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    #[default]
    Unknown,
    Research,
    Writing,
    Combined,
    Complete,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Unknown => "unknown",
            TaskKind::Research => "research",
            TaskKind::Writing => "writing",
            TaskKind::Combined => "combined",
            TaskKind::Complete => "complete",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 下一步：循环驱动据此分发
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NextStep {
    #[default]
    Coordinator,
    Research,
    Writing,
    Terminate,
}

impl std::fmt::Display for NextStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NextStep::Coordinator => "coordinator",
            NextStep::Research => "research",
            NextStep::Writing => "writing",
            NextStep::Terminate => "terminate",
        };
        f.write_str(s)
    }
}

/// 产生历史条目的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Coordinator,
    Researcher,
    Writer,
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentRole::Coordinator => "coordinator",
            AgentRole::Researcher => "researcher",
            AgentRole::Writer => "writer",
        };
        f.write_str(s)
    }
}

/// 审计历史中的一条记录
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub role: AgentRole,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// 一次运行的完整状态
#[derive(Debug, Clone, Serialize)]
pub struct CrewState {
    query: String,
    pub task_kind: TaskKind,
    /// 研究发现，插入顺序即发现顺序；运行中只追加不清空
    pub findings: Vec<String>,
    /// 最终内容；非空即表示工作完成
    pub draft: String,
    pub next_step: NextStep,
    pub history: Vec<HistoryEntry>,
    pub step_count: usize,
}

impl CrewState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            task_kind: TaskKind::Unknown,
            findings: Vec::new(),
            draft: String::new(),
            next_step: NextStep::Coordinator,
            history: Vec::new(),
            step_count: 0,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn has_findings(&self) -> bool {
        !self.findings.is_empty()
    }

    pub fn has_draft(&self) -> bool {
        !self.draft.is_empty()
    }

    /// 记录一次步骤调用：追加一条历史并递增 step_count
    pub fn record(mut self, role: AgentRole, content: impl Into<String>) -> Self {
        self.history.push(HistoryEntry {
            role,
            content: content.into(),
            at: Utc::now(),
        });
        self.step_count += 1;
        self
    }

    /// 最近一条历史（用于进度事件）
    pub fn last_note(&self) -> Option<&str> {
        self.history.last().map(|h| h.content.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = CrewState::new("Write a poem");
        assert_eq!(state.query(), "Write a poem");
        assert_eq!(state.task_kind, TaskKind::Unknown);
        assert!(state.findings.is_empty());
        assert!(state.draft.is_empty());
        assert_eq!(state.next_step, NextStep::Coordinator);
        assert!(state.history.is_empty());
        assert_eq!(state.step_count, 0);
    }

    #[test]
    fn test_record_keeps_history_and_count_in_step() {
        let state = CrewState::new("q")
            .record(AgentRole::Coordinator, "route")
            .record(AgentRole::Researcher, "found");
        assert_eq!(state.step_count, 2);
        assert_eq!(state.history.len(), 2);
        assert_eq!(state.history[1].role, AgentRole::Researcher);
        assert_eq!(state.last_note(), Some("found"));
    }

    #[test]
    fn test_serialize_snake_case_tags() {
        let mut state = CrewState::new("q");
        state.task_kind = TaskKind::Combined;
        state.next_step = NextStep::Terminate;
        let v = serde_json::to_value(&state).unwrap();
        assert_eq!(v["task_kind"], "combined");
        assert_eq!(v["next_step"], "terminate");
        assert_eq!(v["query"], "q");
    }
}
