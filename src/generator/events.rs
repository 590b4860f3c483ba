//! 编排过程中的进度事件

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::types::patch::PatchOperation;

/// 事件通道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventChannel {
    /// 节点开始执行
    Step,
    /// 节点中间结果
    Partial,
    /// 输出文档的补丁批次
    MapPatch,
    /// 节点某次尝试失败
    Error,
}

impl EventChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventChannel::Step => "step",
            EventChannel::Partial => "partial",
            EventChannel::MapPatch => "map_patch",
            EventChannel::Error => "error",
        }
    }
}

impl std::fmt::Display for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub channel: EventChannel,
    pub payload: Value,
}

impl Event {
    pub fn new(channel: EventChannel, payload: Value) -> Self {
        Self { channel, payload }
    }

    pub fn step(node: &str, iteration: u32) -> Self {
        Self::new(
            EventChannel::Step,
            json!({"node": node, "iteration": iteration}),
        )
    }

    pub fn partial(payload: Value) -> Self {
        Self::new(EventChannel::Partial, payload)
    }

    pub fn map_patch(patches: &[PatchOperation]) -> Self {
        Self::new(EventChannel::MapPatch, json!({"patch": patches}))
    }

    pub fn error(node: &str, attempt: u32, message: &str, will_retry: bool) -> Self {
        Self::new(
            EventChannel::Error,
            json!({
                "node": node,
                "attempt": attempt,
                "message": message,
                "will_retry": will_retry,
            }),
        )
    }

    /// 事件负载中的节点名（若有）
    pub fn node(&self) -> Option<&str> {
        self.payload.get("node").and_then(Value::as_str)
    }
}

/// 事件接收端
///
/// 实现不得无限期阻塞编排；慢消费者的背压应由传输层处理。
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: Event);
}

/// 基于无界 channel 的事件接收端
#[derive(Clone)]
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelEventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn emit(&self, event: Event) {
        // 接收端已关闭时丢弃事件，编排继续
        let _ = self.tx.send(event);
    }
}

/// 丢弃所有事件
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

#[async_trait]
impl EventSink for NullEventSink {
    async fn emit(&self, _event: Event) {}
}
