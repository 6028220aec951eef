//! 各角色提示词
//!
//! system 提示词可从 `<prompts_dir>/{coordinator,research,writing}.txt` 覆盖，读不到时使用内置默认值。
//! 占位符 `{query}` `{has_facts}` `{has_draft}` `{num_facts}` `{results}` `{facts}` 按字符串替换。

use std::path::{Path, PathBuf};

pub const COORDINATOR_SYSTEM: &str = "You are a supervisor coordinating a team of specialized agents.
Your team consists of:
1. Research Agent - Gathers information from web searches
2. Writing Agent - Creates written content based on research or general knowledge

Analyze the user's query and current workflow state to decide the next step.

Decision Guidelines:
- If the query requires factual information or recent data and no facts have been gathered yet -> route to 'research' first
- If research has been completed (facts gathered) -> route to 'writing'
- If the query is a simple creative/writing task without need for research -> route directly to 'writing'
- Only route to 'terminate' once writing is complete

Current State:
- Research Facts Gathered: {has_facts}
- Draft Written: {has_draft}
- Number of Facts: {num_facts}
";

pub const COORDINATOR_USER: &str = "User Query: {query}\n\nWhat should be the next agent to call?";

pub const RESEARCH_SYSTEM: &str = "You are a research assistant. Extract and list the most important facts from the search results. Be concise and factual. List 3-5 key facts.";

pub const RESEARCH_USER: &str = "Search query: {query}\n\nSearch results:\n{results}\n\nExtract key facts:";

pub const WRITING_SYSTEM: &str = "You are an expert writer and content creator.
Your task is to synthesize the provided research facts into a well-structured,
coherent piece of writing that addresses the user's query.

Guidelines:
- Write in a clear, professional, and engaging style
- Structure your content with proper paragraphs
- Include an introduction and conclusion when appropriate
- Base your writing on the provided facts, but feel free to add context and connections
- Aim for 3-5 paragraphs depending on the complexity of the topic
- If no research facts are available, write from general knowledge while being transparent about limitations
";

pub const WRITING_USER: &str = "User Query: {query}

Research Facts:
{facts}

Please write a comprehensive response that addresses the user's query based on the research facts above.";

/// 三个角色的 system 提示词（user 模板固定）
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub coordinator: String,
    pub research: String,
    pub writing: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            coordinator: COORDINATOR_SYSTEM.to_string(),
            research: RESEARCH_SYSTEM.to_string(),
            writing: WRITING_SYSTEM.to_string(),
        }
    }
}

impl PromptSet {
    /// 从指定目录加载；dir 为 None 时依次尝试 config/prompts、../config/prompts
    pub fn load(dir: Option<&Path>) -> Self {
        let dirs: Vec<PathBuf> = match dir {
            Some(d) => vec![d.to_path_buf()],
            None => vec![
                PathBuf::from("config/prompts"),
                PathBuf::from("../config/prompts"),
            ],
        };
        let read = |file: &str, fallback: &str| -> String {
            dirs.iter()
                .find_map(|d| std::fs::read_to_string(d.join(file)).ok())
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string())
        };
        Self {
            coordinator: read("coordinator.txt", COORDINATOR_SYSTEM),
            research: read("research.txt", RESEARCH_SYSTEM),
            writing: read("writing.txt", WRITING_SYSTEM),
        }
    }
}

/// 将模板中的 `{key}` 替换为对应值
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{}}}", key), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_replaces_all_occurrences() {
        let out = fill("{a} and {a} with {b}", &[("a", "x"), ("b", "y")]);
        assert_eq!(out, "x and x with y");
    }

    #[test]
    fn test_fill_leaves_unknown_placeholders() {
        assert_eq!(fill("{query} {other}", &[("query", "q")]), "q {other}");
    }

    #[test]
    fn test_load_from_dir_with_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("writing.txt"), "Custom writer prompt").unwrap();
        let prompts = PromptSet::load(Some(dir.path()));
        assert_eq!(prompts.writing, "Custom writer prompt");
        assert_eq!(prompts.research, RESEARCH_SYSTEM);
        assert_eq!(prompts.coordinator, COORDINATOR_SYSTEM);
    }
}
