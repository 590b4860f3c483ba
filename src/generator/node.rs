//! 图节点与重试包装器

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::error::OrchestratorResult;
use crate::generator::context::OrchestratorContext;
use crate::generator::events::Event;
use crate::generator::state::{ErrorRecord, RunState};

/// 图中的一个步骤
#[async_trait]
pub trait Node: Send + Sync {
    /// 节点名，用于事件与错误记录
    fn name(&self) -> &'static str;

    /// 基于当前状态生成新状态
    async fn run(&self, state: RunState, ctx: &OrchestratorContext) -> OrchestratorResult<RunState>;
}

/// 包装器的执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// 某次尝试成功；之前失败的尝试仍留有错误记录
    Succeeded,
    /// 尝试次数耗尽，或遇到不可重试的错误
    Exhausted,
}

/// 节点执行包装器：有限次重试 + 错误累积，永不向上抛错
///
/// 每次失败都会追加一条 [`ErrorRecord`] 并发出 `error` 事件；
/// 下一次尝试从失败前的状态开始，失败尝试的部分修改全部丢弃。
/// 遇到不可重试的错误立即停止。
#[derive(Clone)]
pub struct RetryingNode {
    inner: Arc<dyn Node>,
    policy: RetryPolicy,
}

impl RetryingNode {
    pub fn new(inner: Arc<dyn Node>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name()
    }

    pub async fn execute(
        &self,
        state: RunState,
        ctx: &OrchestratorContext,
    ) -> (RunState, NodeStatus) {
        let name = self.inner.name();
        let max_attempts = self.policy.max_attempts.max(1);
        let mut state = state;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.inner.run(state.clone(), ctx).await {
                Ok(next) => {
                    debug!(node = name, attempt, "node finished");
                    return (next, NodeStatus::Succeeded);
                }
                Err(err) => {
                    let will_retry = err.is_retryable() && attempt < max_attempts;
                    let message = err.to_string();
                    warn!(
                        node = name,
                        attempt,
                        max_attempts,
                        will_retry,
                        error = %message,
                        "node attempt failed"
                    );

                    state = state.with_error(
                        ErrorRecord::new(name, message.clone())
                            .with_context(format!("attempt {}/{}", attempt, max_attempts)),
                    );
                    ctx.events
                        .emit(Event::error(name, attempt, &message, will_retry))
                        .await;

                    if !will_retry {
                        return (state, NodeStatus::Exhausted);
                    }
                    if self.policy.backoff_ms > 0 {
                        tokio::time::sleep(self.policy.backoff()).await;
                    }
                }
            }
        }
    }
}
