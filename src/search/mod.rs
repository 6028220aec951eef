//! 搜索层：Web 搜索抽象与实现（Tavily / 固定结果）

pub mod mock;
pub mod tavily;
pub mod traits;

pub use mock::StaticSearch;
pub use tavily::{TavilySearch, TAVILY_SEARCH_URL};
pub use traits::{SearchDepth, SearchHit, SearchProvider, SearchRequest};
