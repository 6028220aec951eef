//! Web 搜索能力抽象
//!
//! 输入查询字符串与结果数上限，输出有序的 (content, url) 列表；无结果返回空列表而非错误。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::CapabilityError;

/// 搜索深度提示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    Basic,
    #[default]
    Advanced,
}

/// 一次搜索请求
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: usize,
    pub depth: SearchDepth,
    /// 支持时请求服务端合成的直接回答
    pub include_answer: bool,
    pub include_raw_content: bool,
}

impl SearchRequest {
    /// 默认：5 条结果、advanced 深度、请求直接回答、不要原始全文
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
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
}

/// 单条搜索结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub content: String,
    pub url: String,
}

impl SearchHit {
    pub fn new(content: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            url: url.into(),
        }
    }
}

/// 搜索提供方 trait
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// 提供方名称（日志用）
    fn name(&self) -> &str;

    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, CapabilityError>;
}
