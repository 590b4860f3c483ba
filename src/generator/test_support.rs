//! 单元测试用的内存替身：空间存储、外部工具、语言模型

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::{Config, RetryPolicy};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::generator::context::OrchestratorContext;
use crate::generator::events::{ChannelEventSink, Event};
use crate::llm::client::{LanguageModel, LlmResponse};
use crate::llm::tools::{CapabilityClient, ExternalResponse};
use crate::store::{InequalityRow, PopulationRow, SpatialStore};
use crate::types::zone::{Zone, ZoneInput};

pub const INFRA: &str = "City Infrastructure Model";
pub const INEQUALITY: &str = "Population Inequality Model";

/// 没有任何匹配行的存储
pub struct EmptyStore;

#[async_trait]
impl SpatialStore for EmptyStore {
    async fn population_features(
        &self,
        _lon: f64,
        _lat: f64,
    ) -> OrchestratorResult<Option<PopulationRow>> {
        Ok(None)
    }

    async fn inequality_indicators(
        &self,
        _lon: f64,
        _lat: f64,
    ) -> OrchestratorResult<Option<InequalityRow>> {
        Ok(None)
    }
}

/// 按工具名返回预设响应；`None` 表示该工具每次都失败
#[derive(Default)]
pub struct ScriptedTools {
    responses: HashMap<String, Option<Value>>,
    failures_left: Mutex<HashMap<String, u32>>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedTools {
    pub fn respond(mut self, tool: &str, value: Value) -> Self {
        self.responses.insert(tool.to_string(), Some(value));
        self
    }

    pub fn fail(mut self, tool: &str) -> Self {
        self.responses.insert(tool.to_string(), None);
        self
    }

    /// 前 `times` 次调用失败，之后按预设响应
    pub fn fail_first(self, tool: &str, times: u32) -> Self {
        if let Ok(mut failures) = self.failures_left.lock() {
            failures.insert(tool.to_string(), times);
        }
        self
    }

    pub fn call_log(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CapabilityClient for ScriptedTools {
    async fn call_tool(&self, name: &str, _payload: Value) -> OrchestratorResult<ExternalResponse> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(name.to_string());
        }
        let fail_now = match self.failures_left.lock() {
            Ok(mut failures) => match failures.get_mut(name) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    true
                }
                _ => false,
            },
            Err(_) => false,
        };
        if fail_now {
            return Err(OrchestratorError::tool(name, "temporarily unavailable"));
        }
        match self.responses.get(name) {
            Some(Some(value)) => Ok(ExternalResponse::Raw(value.clone())),
            Some(None) => Err(OrchestratorError::tool(name, "service unavailable")),
            None => Ok(ExternalResponse::Raw(Value::Null)),
        }
    }
}

/// 返回固定响应的语言模型
pub struct CannedLlm(pub LlmResponse);

#[async_trait]
impl LanguageModel for CannedLlm {
    async fn invoke(&self, _prompt: &str) -> OrchestratorResult<LlmResponse> {
        Ok(self.0.clone())
    }
}

/// 所有重试间隔为 0 的配置
pub fn fast_config() -> Config {
    let mut config = Config::default();
    let graph = &mut config.graph;
    graph.fetch_data = RetryPolicy::new(3, 0);
    graph.preprocess = RetryPolicy::new(2, 0);
    graph.run_models = RetryPolicy::new(3, 0);
    graph.analyze_results = RetryPolicy::new(2, 0);
    graph.finalize = RetryPolicy::new(1, 0);
    config
}

pub fn context_with(
    config: Config,
    tools: Arc<dyn CapabilityClient>,
) -> (OrchestratorContext, UnboundedReceiver<Event>) {
    let (sink, rx) = ChannelEventSink::channel();
    let ctx = OrchestratorContext::new(
        config,
        Arc::new(EmptyStore),
        tools,
        Arc::new(CannedLlm(LlmResponse::Text("resumen".to_string()))),
        Arc::new(sink),
    );
    (ctx, rx)
}

pub fn point_zone(id: &str, lat: f64, lon: f64) -> Zone {
    let input: ZoneInput = serde_json::from_value(json!({
        "id": id,
        "lat": lat,
        "lon": lon,
        "geometry": {"type": "Point", "coordinates": [lon, lat]}
    }))
    .unwrap();
    input.prepare().unwrap()
}

pub fn drain(rx: &mut UnboundedReceiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
