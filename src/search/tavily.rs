//! Tavily 搜索客户端
//!
//! POST https://api.tavily.com/search，Bearer 鉴权；请求体携带结果数、深度、是否要直接回答。
//! 401/403 视为鉴权失败，其它非 2xx 视为 API 错误；超时由 reqwest Client 的 timeout 控制。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::core::CapabilityError;
use crate::search::{SearchDepth, SearchHit, SearchProvider, SearchRequest};

pub const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

/// 错误信息中保留的响应体最大字符数
const ERROR_BODY_PREVIEW_CHARS: usize = 300;

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: SearchDepth,
    include_answer: bool,
    include_raw_content: bool,
}

impl<'a> From<&'a SearchRequest> for TavilyRequest<'a> {
    fn from(req: &'a SearchRequest) -> Self {
        Self {
            query: &req.query,
            max_results: req.max_results,
            search_depth: req.depth,
            include_answer: req.include_answer,
            include_raw_content: req.include_raw_content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl TavilyResponse {
    fn into_hits(self, limit: usize) -> Vec<SearchHit> {
        self.results
            .into_iter()
            .take(limit)
            .map(|r| SearchHit {
                content: r.content,
                url: r.url,
            })
            .collect()
    }
}

/// Tavily 客户端：api_key 由调用方注入
pub struct TavilySearch {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl TavilySearch {
    pub fn new(api_key: impl Into<String>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("hive/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key: api_key.into(),
            endpoint: TAVILY_SEARCH_URL.to_string(),
        }
    }

    /// 替换端点（自建代理或测试）
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

fn status_error(status: StatusCode, body: &str) -> CapabilityError {
    let preview: String = body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            CapabilityError::Auth(format!("HTTP {}: {}", status, preview))
        }
        _ => CapabilityError::Api(format!("HTTP {}: {}", status, preview)),
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, CapabilityError> {
        tracing::info!(query = %request.query, max_results = request.max_results, "tavily search");
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&TavilyRequest::from(request))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let parsed: TavilyResponse = serde_json::from_str(&body)
            .map_err(|e| CapabilityError::MalformedResponse(format!("tavily: {}", e)))?;
        if let Some(answer) = &parsed.answer {
            tracing::debug!(answer = %answer, "tavily inline answer");
        }
        Ok(parsed.into_hits(request.max_results))
    }
}
