//! Crew 构建器：按配置组装 LLM、搜索与三个角色
//!
//! 凭证在这里一次性解析并注入客户端构造函数，步骤逻辑从不读取环境变量。

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::config::AppConfig;
use crate::core::SetupError;
use crate::crew::{Coordinator, Crew, CrewEvent, PromptSet, Researcher, Writer};
use crate::llm::{create_deepseek_client, LlmClient, MockLlmClient, OpenAiClient};
use crate::search::{SearchProvider, StaticSearch, TavilySearch};

/// 外部服务凭证
#[derive(Clone, Default)]
pub struct Credentials {
    pub llm_api_key: Option<String>,
    pub search_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("llm_api_key", &self.llm_api_key.as_ref().map(|_| "***"))
            .field("search_api_key", &self.search_api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// LLM 后端对应的 API Key 环境变量
fn llm_key_var(provider: &str) -> &'static str {
    if provider.eq_ignore_ascii_case("deepseek") {
        "DEEPSEEK_API_KEY"
    } else {
        "OPENAI_API_KEY"
    }
}

const SEARCH_KEY_VAR: &str = "TAVILY_API_KEY";

fn is_mock(provider: &str) -> bool {
    provider.eq_ignore_ascii_case("mock")
}

impl Credentials {
    /// 配置中的 api_key 优先，其次读取对应后端的环境变量
    pub fn resolve(cfg: &AppConfig) -> Self {
        let env = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            llm_api_key: cfg
                .llm
                .api_key
                .clone()
                .or_else(|| env(llm_key_var(&cfg.llm.provider))),
            search_api_key: cfg.search.api_key.clone().or_else(|| env(SEARCH_KEY_VAR)),
        }
    }

    /// 按配置列出缺失的凭证（mock 后端不需要凭证）
    pub fn missing(&self, cfg: &AppConfig) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !is_mock(&cfg.llm.provider) && self.llm_api_key.is_none() {
            missing.push(llm_key_var(&cfg.llm.provider));
        }
        if !is_mock(&cfg.search.provider) && self.search_api_key.is_none() {
            missing.push(SEARCH_KEY_VAR);
        }
        missing
    }
}

/// Crew 构建器
pub struct CrewBuilder {
    config: AppConfig,
    credentials: Credentials,
    prompts: Option<PromptSet>,
    llm: Option<Arc<dyn LlmClient>>,
    search: Option<Arc<dyn SearchProvider>>,
    event_tx: Option<UnboundedSender<CrewEvent>>,
    offline: bool,
}

impl CrewBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            credentials: Credentials::default(),
            prompts: None,
            llm: None,
            search: None,
            event_tx: None,
            offline: false,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = Some(prompts);
        self
    }

    /// 所有角色共用同一个 LLM 客户端（覆盖配置）
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_search(mut self, search: Arc<dyn SearchProvider>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_event_tx(mut self, tx: UnboundedSender<CrewEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// 离线模式：未显式提供的能力一律使用 Mock
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// 按角色温度创建 LLM 客户端
    fn role_llm(&self, temperature: f32) -> Result<Arc<dyn LlmClient>, SetupError> {
        if let Some(llm) = &self.llm {
            return Ok(llm.clone());
        }
        if self.offline || is_mock(&self.config.llm.provider) {
            return Ok(Arc::new(MockLlmClient));
        }
        Ok(Arc::new(self.remote_llm(temperature)?))
    }

    /// OpenAI 兼容后端；deepseek 未配置 base_url 时使用官方地址
    fn remote_llm(&self, temperature: f32) -> Result<OpenAiClient, SetupError> {
        let llm = &self.config.llm;
        let key = self
            .credentials
            .llm_api_key
            .as_deref()
            .ok_or(SetupError::MissingCredential(llm_key_var(&llm.provider)))?;
        let base_url = llm.base_url.as_deref();
        let client = match llm.provider.to_lowercase().as_str() {
            "openai" => OpenAiClient::new(base_url, llm.model_name(), key),
            "deepseek" => create_deepseek_client(base_url, Some(llm.model_name()), key),
            other => return Err(SetupError::UnknownProvider(other.to_string())),
        };
        Ok(client.with_temperature(temperature))
    }

    fn search_provider(&self) -> Result<Arc<dyn SearchProvider>, SetupError> {
        if let Some(search) = &self.search {
            return Ok(search.clone());
        }
        let cfg = &self.config.search;
        if self.offline || is_mock(&cfg.provider) {
            return Ok(Arc::new(StaticSearch::sample()));
        }
        match cfg.provider.to_lowercase().as_str() {
            "tavily" => {
                let key = self
                    .credentials
                    .search_api_key
                    .as_deref()
                    .ok_or(SetupError::MissingCredential(SEARCH_KEY_VAR))?;
                Ok(Arc::new(TavilySearch::new(key, cfg.timeout_secs)))
            }
            other => Err(SetupError::UnknownProvider(other.to_string())),
        }
    }

    pub fn build(self) -> Result<Crew, SetupError> {
        let temps = &self.config.llm.temperature;
        let coordinator_llm = self.role_llm(temps.coordinator)?;
        let research_llm = self.role_llm(temps.research)?;
        let writing_llm = self.role_llm(temps.writing)?;
        let search = self.search_provider()?;

        let prompts = self
            .prompts
            .clone()
            .unwrap_or_else(|| PromptSet::load(self.config.workflow.prompts_dir.as_deref()));
        let search_cfg = &self.config.search;

        tracing::info!(
            llm_provider = %self.config.llm.provider,
            model = %self.config.llm.model_name(),
            search_provider = search.name(),
            offline = self.offline,
            max_steps = self.config.workflow.max_steps,
            "crew assembled"
        );

        let crew = Crew::new(
            Coordinator::new(coordinator_llm, prompts.coordinator),
            Researcher::new(research_llm, search, prompts.research)
                .with_max_results(search_cfg.max_results)
                .with_depth(search_cfg.depth)
                .with_answer(search_cfg.include_answer)
                .with_raw_content(search_cfg.include_raw_content),
            Writer::new(writing_llm, prompts.writing),
        )
        .with_max_steps(self.config.workflow.max_steps);

        Ok(match self.event_tx {
            Some(tx) => crew.with_event_tx(tx),
            None => crew,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials_listed_together() {
        let cfg = AppConfig::default();
        let missing = Credentials::default().missing(&cfg);
        assert_eq!(missing, vec!["OPENAI_API_KEY", "TAVILY_API_KEY"]);
    }

    #[test]
    fn test_mock_providers_need_no_credentials() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "mock".to_string();
        cfg.search.provider = "mock".to_string();
        assert!(Credentials::default().missing(&cfg).is_empty());
    }

    #[test]
    fn test_config_key_takes_precedence() {
        let mut cfg = AppConfig::default();
        cfg.llm.api_key = Some("from-config".to_string());
        cfg.search.api_key = Some("search-config".to_string());
        let creds = Credentials::resolve(&cfg);
        assert_eq!(creds.llm_api_key.as_deref(), Some("from-config"));
        assert_eq!(creds.search_api_key.as_deref(), Some("search-config"));
        assert!(!format!("{:?}", creds).contains("from-config"));
    }

    #[test]
    fn test_build_requires_credentials() {
        let err = CrewBuilder::new(AppConfig::default()).build().err().unwrap();
        assert!(matches!(err, SetupError::MissingCredential("OPENAI_API_KEY")));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "acme".to_string();
        let err = CrewBuilder::new(cfg)
            .with_credentials(Credentials {
                llm_api_key: Some("k".to_string()),
                search_api_key: Some("k".to_string()),
            })
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SetupError::UnknownProvider(_)));
    }

    #[test]
    fn test_deepseek_honours_base_url() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "deepseek".to_string();
        let creds = Credentials {
            llm_api_key: Some("k".to_string()),
            search_api_key: None,
        };

        let builder = CrewBuilder::new(cfg.clone()).with_credentials(creds.clone());
        let client = builder.remote_llm(0.1).unwrap();
        assert_eq!(client.base_url(), Some(crate::llm::DEEPSEEK_BASE_URL));
        assert_eq!(client.model(), crate::llm::DEEPSEEK_CHAT);

        cfg.llm.base_url = Some("https://proxy.example/v1".to_string());
        let client = CrewBuilder::new(cfg)
            .with_credentials(creds)
            .remote_llm(0.1)
            .unwrap();
        assert_eq!(client.base_url(), Some("https://proxy.example/v1"));
    }

    #[tokio::test]
    async fn test_offline_crew_runs_end_to_end() {
        let crew = CrewBuilder::new(AppConfig::default())
            .with_prompts(PromptSet::default())
            .offline(true)
            .build()
            .unwrap();
        let state = crew.run("What are the latest developments in quantum computing?").await.unwrap();
        assert!(state.has_findings());
        assert!(state.has_draft());
        assert_eq!(state.step_count, 4);
        assert_eq!(state.history.len(), 4);
    }
}
