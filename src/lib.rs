//! Hive - Rust 多角色研究写作智能体
//!
//! 协调者（Coordinator）决定下一步，研究员（Researcher）搜索并提炼事实，写作者（Writer）生成最终内容；
//! 循环驱动按共享状态中的 next_step 分发，直到结束或达到步数上限。
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 共享状态、错误类型、Crew 组装
//! - **crew**: 三个角色、提示词与循环驱动
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **search**: 网页搜索抽象与实现（Tavily / 静态结果）
//! - **observability**: 日志初始化
//! - **ui**: 命令行输出与交互会话

pub mod config;
pub mod core;
pub mod crew;
pub mod llm;
pub mod observability;
pub mod search;
pub mod ui;

pub use crate::core::{CrewBuilder, CrewState, NextStep, TaskKind, WorkflowError};
pub use crate::crew::Crew;
