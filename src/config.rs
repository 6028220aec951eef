//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HIVE__*` 覆盖（双下划线表示嵌套，如 `HIVE__LLM__PROVIDER=deepseek`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::core::SetupError;
use crate::search::SearchDepth;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub search: SearchSection,
    #[serde(default)]
    pub workflow: WorkflowSection,
}

/// [llm] 段：后端选择、模型、各角色温度
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：openai / deepseek / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    /// 未设置时按后端取默认模型（openai: gpt-4o-mini，deepseek: deepseek-chat）
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// 未设置时读取 OPENAI_API_KEY（deepseek 为 DEEPSEEK_API_KEY）
    pub api_key: Option<String>,
    #[serde(default)]
    pub temperature: TemperatureSection,
}

fn default_provider() -> String {
    "openai".to_string()
}

impl LlmSection {
    /// 实际使用的模型名
    pub fn model_name(&self) -> &str {
        match self.model.as_deref() {
            Some(m) => m,
            None if self.provider.eq_ignore_ascii_case("deepseek") => crate::llm::DEEPSEEK_CHAT,
            None => "gpt-4o-mini",
        }
    }
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: None,
            api_key: None,
            temperature: TemperatureSection::default(),
        }
    }
}

/// [llm.temperature] 段：路由求稳，写作求变化
#[derive(Debug, Clone, Deserialize)]
pub struct TemperatureSection {
    #[serde(default = "default_coordinator_temperature")]
    pub coordinator: f32,
    #[serde(default = "default_research_temperature")]
    pub research: f32,
    #[serde(default = "default_writing_temperature")]
    pub writing: f32,
}

fn default_coordinator_temperature() -> f32 {
    0.1
}

fn default_research_temperature() -> f32 {
    0.3
}

fn default_writing_temperature() -> f32 {
    0.7
}

impl Default for TemperatureSection {
    fn default() -> Self {
        Self {
            coordinator: default_coordinator_temperature(),
            research: default_research_temperature(),
            writing: default_writing_temperature(),
        }
    }
}

/// [search] 段：提供方、结果数、深度、超时
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSection {
    /// tavily / mock
    #[serde(default = "default_search_provider")]
    pub provider: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub depth: SearchDepth,
    #[serde(default = "default_true")]
    pub include_answer: bool,
    #[serde(default)]
    pub include_raw_content: bool,
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
    /// 未设置时读取 TAVILY_API_KEY
    pub api_key: Option<String>,
}

fn default_search_provider() -> String {
    "tavily".to_string()
}

fn default_max_results() -> usize {
    5
}

fn default_true() -> bool {
    true
}

fn default_search_timeout_secs() -> u64 {
    15
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            provider: default_search_provider(),
            max_results: default_max_results(),
            depth: SearchDepth::default(),
            include_answer: true,
            include_raw_content: false,
            timeout_secs: default_search_timeout_secs(),
            api_key: None,
        }
    }
}

/// [workflow] 段：步数上限、提示词目录
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowSection {
    /// 单次运行最多执行的步骤数（协调者 + 工作者），防止死循环
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// 提示词目录，未设置时依次查找 config/prompts、../config/prompts
    pub prompts_dir: Option<PathBuf>,
}

fn default_max_steps() -> usize {
    25
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            prompts_dir: None,
        }
    }
}

/// 从 config 目录加载配置，环境变量 HIVE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 HIVE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, SetupError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HIVE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    Ok(c.try_deserialize()?)
}
