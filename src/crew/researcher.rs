//! Researcher：搜索 + 事实提炼
//!
//! 搜索 -> 规范化为 "Source N: content (URL: url)" -> 调用模型提炼 3-5 条事实 -> 追加到 findings。
//! 任何能力失败都在本步骤内转为哨兵 finding，步骤总是把控制权交回 Coordinator。

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{AgentRole, CapabilityError, CrewState, NextStep};
use crate::crew::prompts::{fill, RESEARCH_USER};
use crate::crew::Step;
use crate::llm::{LlmClient, Message};
use crate::search::{SearchDepth, SearchHit, SearchProvider, SearchRequest};

/// 搜索无结果时的哨兵 finding
pub const NO_RESULTS_FINDING: &str = "No relevant information found for this query.";

/// 研究结果
#[derive(Debug)]
enum ResearchOutcome {
    /// 模型提炼出的事实
    Synthesized(Vec<String>),
    /// 模型回复中没有可用行，退回规范化后的原始记录
    Raw(Vec<String>),
    NoResults,
}

/// 规范化搜索结果：只跳过空字符串内容，内容原样保留；N 为结果在列表中的位置（从 1 开始）
pub fn normalize_hits(hits: &[SearchHit]) -> Vec<String> {
    hits.iter()
        .enumerate()
        .filter(|(_, hit)| !hit.content.is_empty())
        .map(|(idx, hit)| {
            let mut record = format!("Source {}: {}", idx + 1, hit.content);
            if !hit.url.is_empty() {
                record.push_str(&format!(" (URL: {})", hit.url));
            }
            record
        })
        .collect()
}

/// 按行拆分模型回复：去空白、丢弃空行与 `#` 标题行
pub fn parse_fact_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

pub struct Researcher {
    llm: Arc<dyn LlmClient>,
    search: Arc<dyn SearchProvider>,
    system_prompt: String,
    max_results: usize,
    depth: SearchDepth,
    include_answer: bool,
    include_raw_content: bool,
}

impl Researcher {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        search: Arc<dyn SearchProvider>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            search,
            system_prompt: system_prompt.into(),
            max_results: 5,
            depth: SearchDepth::Advanced,
            include_answer: true,
            include_raw_content: false,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_depth(mut self, depth: SearchDepth) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_answer(mut self, include_answer: bool) -> Self {
        self.include_answer = include_answer;
        self
    }

    pub fn with_raw_content(mut self, include_raw_content: bool) -> Self {
        self.include_raw_content = include_raw_content;
        self
    }

    fn request(&self, query: &str) -> SearchRequest {
        SearchRequest::new(query)
            .with_max_results(self.max_results)
            .with_depth(self.depth)
            .with_answer(self.include_answer)
            .with_raw_content(self.include_raw_content)
    }

    async fn gather(&self, query: &str) -> Result<ResearchOutcome, CapabilityError> {
        tracing::info!(provider = self.search.name(), query = %query, "researcher searching");
        let hits = self.search.search(&self.request(query)).await?;
        let records = normalize_hits(&hits);
        if records.is_empty() {
            return Ok(ResearchOutcome::NoResults);
        }

        let results = records.join("\n\n");
        tracing::debug!(records = records.len(), chars = results.len(), "synthesizing facts");
        let messages = vec![
            Message::system(self.system_prompt.clone()),
            Message::user(fill(RESEARCH_USER, &[("query", query), ("results", &results)])),
        ];
        let reply = self.llm.complete(&messages).await?;
        let facts = parse_fact_lines(&reply);
        if facts.is_empty() {
            Ok(ResearchOutcome::Raw(records))
        } else {
            Ok(ResearchOutcome::Synthesized(facts))
        }
    }
}

#[async_trait]
impl Step for Researcher {
    fn role(&self) -> AgentRole {
        AgentRole::Researcher
    }

    fn llm(&self) -> Option<&Arc<dyn LlmClient>> {
        Some(&self.llm)
    }

    async fn run(&self, mut state: CrewState) -> CrewState {
        let note = match self.gather(state.query()).await {
            Ok(ResearchOutcome::Synthesized(facts)) => {
                tracing::info!(facts = facts.len(), "researcher found key facts");
                let note = format!("Research completed. Found {} key facts.", facts.len());
                state.findings.extend(facts);
                note
            }
            Ok(ResearchOutcome::Raw(records)) => {
                tracing::info!(records = records.len(), "researcher kept raw search records");
                let note = format!(
                    "Research completed. Kept {} raw search results.",
                    records.len()
                );
                state.findings.extend(records);
                note
            }
            Ok(ResearchOutcome::NoResults) => {
                tracing::info!("researcher: no results found");
                state.findings.push(NO_RESULTS_FINDING.to_string());
                "Research completed but no relevant results found.".to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "researcher error");
                state.findings.push(format!("Research error: {}", e));
                format!("Research encountered an error: {}", e)
            }
        };
        state.next_step = NextStep::Coordinator;
        state.record(AgentRole::Researcher, note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TaskKind;
    use crate::crew::prompts::RESEARCH_SYSTEM;
    use crate::llm::ScriptedLlmClient;
    use crate::search::StaticSearch;

    fn researcher(llm: Arc<ScriptedLlmClient>, search: Arc<StaticSearch>) -> Researcher {
        Researcher::new(llm, search, RESEARCH_SYSTEM)
    }

    fn hits() -> Vec<SearchHit> {
        vec![
            SearchHit::new("Quantum chips reached 1000 qubits.", "https://a.example"),
            SearchHit::new("", "https://empty.example"),
            SearchHit::new("Error correction improved.", ""),
        ]
    }

    #[test]
    fn test_normalize_skips_empty_and_keeps_position() {
        let records = normalize_hits(&hits());
        assert_eq!(
            records,
            vec![
                "Source 1: Quantum chips reached 1000 qubits. (URL: https://a.example)".to_string(),
                "Source 3: Error correction improved.".to_string(),
            ]
        );
    }

    #[test]
    fn test_normalize_keeps_whitespace_only_content() {
        let records = normalize_hits(&[
            SearchHit::new("", ""),
            SearchHit::new("   ", "https://blank.example"),
        ]);
        assert_eq!(
            records,
            vec!["Source 2:     (URL: https://blank.example)".to_string()]
        );
    }

    #[test]
    fn test_parse_fact_lines_drops_headings_and_blanks() {
        let text = "# Key Facts\n\n  1. First fact  \n- Second fact\n   \n## More\nThird";
        assert_eq!(
            parse_fact_lines(text),
            vec!["1. First fact", "- Second fact", "Third"]
        );
    }

    #[tokio::test]
    async fn test_synthesized_facts_populate_findings() {
        let llm = Arc::new(ScriptedLlmClient::new().push_text("# Facts\n1. A\n2. B\n3. C"));
        let search = Arc::new(StaticSearch::new(hits()));
        let mut state = CrewState::new("quantum computing");
        state.task_kind = TaskKind::Research;

        let out = researcher(llm.clone(), search.clone()).run(state).await;
        assert_eq!(out.findings, vec!["1. A", "2. B", "3. C"]);
        assert_eq!(out.next_step, NextStep::Coordinator);
        assert_eq!(out.task_kind, TaskKind::Research);
        assert_eq!(out.step_count, 1);
        assert_eq!(out.history.len(), 1);
        assert_eq!(search.calls(), 1);

        let prompt = &llm.last_messages()[1].content;
        assert!(prompt.contains("Source 1: Quantum chips"));
        assert!(prompt.contains("Search query: quantum computing"));
    }

    #[tokio::test]
    async fn test_blank_synthesis_falls_back_to_raw_records() {
        let llm = Arc::new(ScriptedLlmClient::new().push_text("\n# Only a heading\n   \n"));
        let search = Arc::new(StaticSearch::new(hits()));
        let out = researcher(llm, search).run(CrewState::new("q")).await;
        assert_eq!(out.findings.len(), 2);
        assert!(out.findings[0].starts_with("Source 1:"));
    }

    #[tokio::test]
    async fn test_zero_results_yields_sentinel() {
        let llm = Arc::new(ScriptedLlmClient::failing());
        let search = Arc::new(StaticSearch::empty());
        let out = researcher(llm.clone(), search).run(CrewState::new("q")).await;
        assert_eq!(out.findings, vec![NO_RESULTS_FINDING.to_string()]);
        assert_eq!(out.next_step, NextStep::Coordinator);
        assert_eq!(llm.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_failing_search_is_contained() {
        let llm = Arc::new(ScriptedLlmClient::failing());
        let search = Arc::new(StaticSearch::failing("connection refused"));
        let out = researcher(llm, search).run(CrewState::new("q")).await;
        assert_eq!(out.findings.len(), 1);
        assert!(out.findings[0].starts_with("Research error:"));
        assert!(out.findings[0].contains("connection refused"));
        assert_eq!(out.next_step, NextStep::Coordinator);
        assert_eq!(out.step_count, 1);
    }

    #[tokio::test]
    async fn test_failing_completion_is_contained() {
        let llm = Arc::new(
            ScriptedLlmClient::new().push_text_error(CapabilityError::Auth("invalid key".into())),
        );
        let search = Arc::new(StaticSearch::new(hits()));
        let out = researcher(llm, search).run(CrewState::new("q")).await;
        assert_eq!(out.findings.len(), 1);
        assert!(out.findings[0].contains("invalid key"));
        assert_eq!(out.next_step, NextStep::Coordinator);
    }

    #[tokio::test]
    async fn test_findings_are_appended_not_replaced() {
        let llm = Arc::new(ScriptedLlmClient::new().push_text("New fact"));
        let search = Arc::new(StaticSearch::new(hits()));
        let mut state = CrewState::new("q");
        state.findings.push("Earlier fact".into());
        let out = researcher(llm, search).run(state).await;
        assert_eq!(out.findings, vec!["Earlier fact", "New fact"]);
    }
}
