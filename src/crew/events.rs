//! Crew 过程事件：用于命令行进度展示

use serde::Serialize;

use crate::core::{AgentRole, NextStep, TaskKind};

/// 单步过程事件（可序列化为 JSON）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrewEvent {
    /// 即将执行第 step 步
    StepStarted {
        step: usize,
        max_steps: usize,
        role: AgentRole,
    },
    /// 步骤结束；note 为该步写入的历史内容
    StepFinished {
        step: usize,
        role: AgentRole,
        next_step: NextStep,
        note: String,
    },
    /// 运行结束；total_tokens 为本次运行消耗的 token 数
    Finished {
        steps: usize,
        task_kind: TaskKind,
        total_tokens: u64,
    },
}
