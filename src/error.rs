//! 编排引擎统一错误类型

use thiserror::Error;

/// 编排过程中可能出现的错误
///
/// 节点包装器根据 [`OrchestratorError::is_retryable`] 决定是否继续重试：
/// 外部依赖类错误（工具、超时、数据库、LLM、网络）可重试，
/// 输入结构类错误与补丁错误属于致命错误，重试不会改变结果。
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("tool `{tool}` failed: {message}")]
    Tool { tool: String, message: String },

    #[error("tool `{tool}` timed out after {timeout_ms}ms")]
    Timeout { tool: String, timeout_ms: u64 },

    #[error("spatial store error: {0}")]
    Store(String),

    #[error("language model error: {0}")]
    Llm(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("patch rejected: {0}")]
    Patch(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OrchestratorError {
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// 是否值得重试
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::InvalidInput(_) | Self::Patch(_) | Self::Serialization(_)
        )
    }
}

impl From<sqlx::Error> for OrchestratorError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(err.to_string())
    }
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
