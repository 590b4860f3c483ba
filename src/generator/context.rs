use std::sync::Arc;

use crate::config::Config;
use crate::generator::context_builder::ContextPayloadBuilder;
use crate::generator::events::EventSink;
use crate::llm::client::LanguageModel;
use crate::llm::tools::CapabilityClient;
use crate::store::SpatialStore;

/// 编排上下文：配置与外部依赖句柄，显式传给每个节点
#[derive(Clone)]
pub struct OrchestratorContext {
    /// 配置
    pub config: Arc<Config>,
    /// 外部模型工具
    pub tools: Arc<dyn CapabilityClient>,
    /// 语言模型，用于生成规划摘要
    pub llm: Arc<dyn LanguageModel>,
    /// 区域上下文载荷构建器
    pub payload_builder: ContextPayloadBuilder,
    /// 进度事件接收端
    pub events: Arc<dyn EventSink>,
}

impl OrchestratorContext {
    pub fn new(
        config: Config,
        store: Arc<dyn SpatialStore>,
        tools: Arc<dyn CapabilityClient>,
        llm: Arc<dyn LanguageModel>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            tools,
            llm,
            payload_builder: ContextPayloadBuilder::new(store),
            events,
        }
    }
}
