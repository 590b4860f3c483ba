//! LLM客户端 - 提供统一的语言模型调用接口

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::LLMConfig;
use crate::error::{OrchestratorError, OrchestratorResult};

mod providers;

use providers::ProviderClient;

const PLANNER_PREAMBLE: &str = "You are an urban planning analyst. You receive the outputs of \
infrastructure and inequality models for a set of city zones and turn them into concrete, \
prioritized interventions for a planning team.";

/// 语言模型返回的异构响应
#[derive(Debug, Clone, PartialEq)]
pub enum LlmResponse {
    /// 结构化消息（带 content 字段）
    Message { content: String },
    /// 键值映射，通常包含 `text`
    Mapping(Map<String, Value>),
    /// 纯文本
    Text(String),
}

impl LlmResponse {
    /// 按优先级提取纯文本：消息内容 → 映射中的 `text` → 字符串化
    pub fn into_text(self) -> String {
        match self {
            LlmResponse::Message { content } => content,
            LlmResponse::Mapping(map) => {
                let text = match map.get("text") {
                    Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
                    Some(value) if is_truthy(value) => Some(value.to_string()),
                    _ => None,
                };
                text.unwrap_or_else(|| Value::Object(map).to_string())
            }
            LlmResponse::Text(text) => text,
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// 语言模型能力：`invoke(prompt) -> response`
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn invoke(&self, prompt: &str) -> OrchestratorResult<LlmResponse>;
}

/// LLM客户端 - 基于 rig 的多 provider 实现
#[derive(Clone)]
pub struct LLMClient {
    config: LLMConfig,
    client: ProviderClient,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(config: LLMConfig) -> anyhow::Result<Self> {
        let client = ProviderClient::new(&config)?;
        Ok(Self { client, config })
    }

}

/// 通用重试逻辑，用于处理异步操作的重试机制
///
/// 不可重试的错误立即返回；`max_attempts` 为 0 时按 1 处理。
async fn retry_with_backoff<T, F, Fut>(
    max_attempts: u32,
    delay: Duration,
    operation: F,
) -> OrchestratorResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = OrchestratorResult<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempts = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) => {
                attempts += 1;
                warn!(
                    attempt = attempts,
                    max_attempts,
                    error = %err,
                    "language model call failed"
                );
                if attempts >= max_attempts || !err.is_retryable() {
                    return Err(err);
                }
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[async_trait]
impl LanguageModel for LLMClient {
    async fn invoke(&self, prompt: &str) -> OrchestratorResult<LlmResponse> {
        let agent = self
            .client
            .create_agent(PLANNER_PREAMBLE, &self.config)
            .map_err(|e| OrchestratorError::Llm(e.to_string()))?;
        let timeout = Duration::from_secs(self.config.timeout_seconds);

        let delay = Duration::from_millis(self.config.retry_delay_ms);

        let content = retry_with_backoff(self.config.retry_attempts, delay, || async {
            match tokio::time::timeout(timeout, agent.prompt(prompt)).await {
                Ok(Ok(text)) => Ok(text),
                Ok(Err(e)) => Err(OrchestratorError::Llm(e.to_string())),
                Err(_) => Err(OrchestratorError::Timeout {
                    tool: self.config.model.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                }),
            }
        })
        .await?;

        Ok(LlmResponse::Message { content })
    }
}
