//! 终端输出渲染
//!
//! 运行摘要：任务类型、步数、研究发现（每条折叠到 200 字，去掉 "Source N:" 前缀）、最终内容。
//! 进度行：由 CrewEvent 生成，仅在非 quiet 模式下打印。

use crate::core::{CrewState, NextStep};
use crate::crew::CrewEvent;

/// 摘要中单条事实显示的最大字符数
const MAX_FACT_CHARS: usize = 200;
/// 进度行中历史内容的显示上限
const MAX_NOTE_CHARS: usize = 120;

const RULE: &str = "============================================================";

/// 按字符数截断（不在 UTF-8 中间截断），超出时追加 "..."
fn truncate_chars(s: &str, limit: usize) -> String {
    let mut chars = s.chars();
    let head: String = chars.by_ref().take(limit).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// 去掉 "Source N:" 前缀，仅用于显示
pub fn strip_source_prefix(fact: &str) -> &str {
    let Some(rest) = fact.strip_prefix("Source ") else {
        return fact;
    };
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return fact;
    }
    match rest[digits..].strip_prefix(':') {
        Some(tail) => tail.trim_start(),
        None => fact,
    }
}

/// 展开为逐行事实：多行的 finding（模型输出的事实列表）按行拆开
fn fact_lines(state: &CrewState) -> Vec<&str> {
    state
        .findings
        .iter()
        .flat_map(|f| f.lines())
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

/// 完整运行摘要
pub fn render_summary(state: &CrewState) -> String {
    let mut out = String::new();
    out.push_str(RULE);
    out.push_str("\nWORKFLOW SUMMARY\n");
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!("Query: {}\n", state.query()));
    out.push_str(&format!("Task type: {}\n", state.task_kind));
    out.push_str(&format!("Steps: {}\n", state.step_count));

    let facts = fact_lines(state);
    if !facts.is_empty() {
        out.push_str(&format!("\nResearch findings ({}):\n", facts.len()));
        for (i, fact) in facts.iter().enumerate() {
            out.push_str(&format!(
                "  {}. {}\n",
                i + 1,
                truncate_chars(strip_source_prefix(fact), MAX_FACT_CHARS)
            ));
        }
    }

    out.push_str("\nFinal output:\n");
    if state.has_draft() {
        out.push_str(&state.draft);
    } else {
        out.push_str("(no content was written)");
    }
    out.push('\n');
    out.push_str(RULE);
    out
}

/// token 使用行；没有消耗（如 Mock 后端）时返回 None
pub fn render_usage(usage: (u64, u64, u64)) -> Option<String> {
    let (prompt, completion, total) = usage;
    (total > 0).then(|| {
        format!(
            "Tokens used: {} (prompt {}, completion {})",
            total, prompt, completion
        )
    })
}

fn describe_next(next: NextStep) -> &'static str {
    match next {
        NextStep::Coordinator => "back to coordinator",
        NextStep::Research => "research",
        NextStep::Writing => "writing",
        NextStep::Terminate => "end",
    }
}

/// 单个事件的进度行
pub fn render_event(ev: &CrewEvent) -> String {
    match ev {
        CrewEvent::StepStarted {
            step,
            max_steps,
            role,
        } => format!("[{}/{}] {} ...", step, max_steps, role),
        CrewEvent::StepFinished {
            step,
            role,
            next_step,
            note,
        } => format!(
            "[{}] {} -> {}: {}",
            step,
            role,
            describe_next(*next_step),
            truncate_chars(note, MAX_NOTE_CHARS)
        ),
        CrewEvent::Finished {
            steps,
            task_kind,
            total_tokens,
        } => format!(
            "workflow finished after {} steps ({}, {} tokens)",
            steps, task_kind, total_tokens
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AgentRole, TaskKind};

    #[test]
    fn test_strip_source_prefix() {
        assert_eq!(strip_source_prefix("Source 12: fact here"), "fact here");
        assert_eq!(strip_source_prefix("Source: nothing"), "Source: nothing");
        assert_eq!(strip_source_prefix("Sourceless"), "Sourceless");
        assert_eq!(strip_source_prefix("- plain fact"), "- plain fact");
    }

    #[test]
    fn test_truncate_chars_utf8() {
        assert_eq!(truncate_chars("短文本", 10), "短文本");
        assert_eq!(truncate_chars("秋天的落叶", 2), "秋天...");
    }

    #[test]
    fn test_summary_lists_truncated_facts() {
        let mut state = CrewState::new("news today");
        state.task_kind = TaskKind::Combined;
        state.findings.push(format!("Source 1: {}", "x".repeat(300)));
        state.findings.push("- A\n- B".to_string());
        state.draft = "Final text.".to_string();

        let out = render_summary(&state);
        assert!(out.contains("Task type: combined"));
        assert!(out.contains("Research findings (3):"));
        assert!(out.contains(&format!("  1. {}...", "x".repeat(200))));
        assert!(!out.contains(&"x".repeat(201)));
        assert!(out.contains("  3. - B"));
        assert!(out.contains("Final output:\nFinal text."));
    }

    #[test]
    fn test_summary_without_draft() {
        let out = render_summary(&CrewState::new("q"));
        assert!(!out.contains("Research findings"));
        assert!(out.contains("(no content was written)"));
    }

    #[test]
    fn test_render_event_lines() {
        let started = CrewEvent::StepStarted {
            step: 1,
            max_steps: 25,
            role: AgentRole::Coordinator,
        };
        assert_eq!(render_event(&started), "[1/25] coordinator ...");

        let finished = CrewEvent::StepFinished {
            step: 2,
            role: AgentRole::Writer,
            next_step: NextStep::Terminate,
            note: "Writing complete".to_string(),
        };
        assert_eq!(render_event(&finished), "[2] writer -> end: Writing complete");

        let done = CrewEvent::Finished {
            steps: 2,
            task_kind: TaskKind::Writing,
            total_tokens: 42,
        };
        assert_eq!(
            render_event(&done),
            "workflow finished after 2 steps (writing, 42 tokens)"
        );
    }

    #[test]
    fn test_render_usage() {
        assert_eq!(render_usage((0, 0, 0)), None);
        assert_eq!(
            render_usage((20, 10, 30)).as_deref(),
            Some("Tokens used: 30 (prompt 20, completion 10)")
        );
    }
}
