//! 错误类型
//!
//! - `CapabilityError`：外部能力（LLM 补全 / Web 搜索）失败，步骤内部捕获并转为哨兵值，永不向外传播
//! - `WorkflowError`：循环驱动层的终止原因（步数上限、取消），携带部分状态供调用方展示
//! - `SetupError`：组装能力时的配置 / 凭证错误，发生在任何运行之前

use thiserror::Error;

use crate::core::CrewState;

/// 外部能力调用失败（网络、鉴权、模型返回格式不符等）
#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("API error: {0}")]
    Api(String),

    /// 结构化输出不符合 schema，或返回体无法解析
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request timed out")]
    Timeout,
}

impl From<reqwest::Error> for CapabilityError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CapabilityError::Timeout
        } else if e.is_decode() {
            CapabilityError::MalformedResponse(e.to_string())
        } else {
            CapabilityError::Network(e.to_string())
        }
    }
}

/// 循环驱动提前结束的原因；两种情况都保留已完成部分的状态
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Step limit exceeded: stopped after {limit} steps")]
    StepLimitExceeded { limit: usize, state: Box<CrewState> },

    #[error("Run cancelled after {steps} steps")]
    Cancelled { steps: usize, state: Box<CrewState> },
}

impl WorkflowError {
    /// 取出中断时的状态（用于展示部分结果）
    pub fn into_state(self) -> CrewState {
        match self {
            WorkflowError::StepLimitExceeded { state, .. } => *state,
            WorkflowError::Cancelled { state, .. } => *state,
        }
    }

    pub fn state(&self) -> &CrewState {
        match self {
            WorkflowError::StepLimitExceeded { state, .. } => state,
            WorkflowError::Cancelled { state, .. } => state,
        }
    }
}

/// 组装 Crew 时的错误
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_error_keeps_partial_state() {
        let mut state = CrewState::new("q");
        state.findings.push("fact".to_string());
        let err = WorkflowError::StepLimitExceeded {
            limit: 3,
            state: Box::new(state),
        };
        assert!(err.to_string().contains("3"));
        assert_eq!(err.state().findings.len(), 1);
        let state = err.into_state();
        assert_eq!(state.query(), "q");
    }

    #[test]
    fn test_capability_error_display() {
        let err = CapabilityError::Auth("bad key".to_string());
        assert_eq!(err.to_string(), "Authentication failed: bad key");
        assert_eq!(CapabilityError::Timeout.to_string(), "Request timed out");
    }
}
