//! 固定结果的搜索提供方（离线运行与测试）

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::core::CapabilityError;
use crate::search::{SearchHit, SearchProvider, SearchRequest};

/// 返回固定命中、空列表或固定错误；记录调用次数
#[derive(Debug)]
pub struct StaticSearch {
    outcome: Result<Vec<SearchHit>, String>,
    calls: AtomicUsize,
}

impl StaticSearch {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self {
            outcome: Ok(hits),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// 每次调用都返回 CapabilityError::Network(message)
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// 离线演示用的两条示例结果
    pub fn sample() -> Self {
        Self::new(vec![
            SearchHit::new(
                "(Mock) Offline search result summarising the topic.",
                "https://example.com/overview",
            ),
            SearchHit::new(
                "(Mock) A second offline source with supporting detail.",
                "https://example.com/detail",
            ),
        ])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    fn name(&self) -> &str {
        "static"
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Ok(hits) => Ok(hits.iter().take(request.max_results).cloned().collect()),
            Err(message) => Err(CapabilityError::Network(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_search_caps_results() {
        let hits = (0..8)
            .map(|i| SearchHit::new(format!("c{i}"), format!("https://x/{i}")))
            .collect();
        let search = StaticSearch::new(hits);
        let out = search.search(&SearchRequest::new("q")).await.unwrap();
        assert_eq!(out.len(), 5);
        assert_eq!(search.calls(), 1);
    }

    #[tokio::test]
    async fn test_static_search_failing() {
        let search = StaticSearch::failing("offline");
        let err = search.search(&SearchRequest::new("q")).await.unwrap_err();
        assert!(err.to_string().contains("offline"));
    }
}
