use std::sync::Arc;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::config::Config;
use crate::error::OrchestratorResult;
use crate::generator::context::OrchestratorContext;
use crate::generator::events::EventSink;
use crate::generator::graph::{OrchestrationGraph, TerminationReason};
use crate::generator::state::{ErrorRecord, PlanningContext, RunState, ZoneOutput};
use crate::llm::client::LLMClient;
use crate::llm::tools::McpToolClient;
use crate::store::PgSpatialStore;
use crate::types::geojson::FeatureCollection;
use crate::types::zone::PlanRequest;

/// 一次编排的最终结果
///
/// 运行总会完成；调用方需检查 `errors` 判断是否有区域数据不完整。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationResult {
    pub run_id: Uuid,
    pub summary: Option<String>,
    pub map_json: FeatureCollection,
    pub model_outputs: IndexMap<String, ZoneOutput>,
    pub errors: Vec<ErrorRecord>,
    pub iterations: u32,
    pub termination: TerminationReason,
}

/// 编排入口：准备区域、执行图并返回结果
///
/// 只有结构性输入错误（缺少 id、重复 id、无法求质心的几何体）会直接返回错误。
pub async fn run_orchestration(
    ctx: &OrchestratorContext,
    request: PlanRequest,
) -> OrchestratorResult<OrchestrationResult> {
    let zones = request.prepare_zones()?;
    let run_id = Uuid::new_v4();
    let span = info_span!("orchestration", %run_id);

    async move {
        info!(zones = zones.len(), "orchestration started");
        let state = RunState::new(
            zones,
            PlanningContext {
                filters: request.filters,
                objectives: request.objectives,
            },
        );

        let graph = OrchestrationGraph::new(&ctx.config.graph);
        let outcome = graph.run(state, ctx).await;
        let state = outcome.state;

        info!(
            iterations = outcome.iterations,
            termination = ?outcome.termination,
            errors = state.errors.len(),
            features = state.map_json.len(),
            "orchestration finished"
        );

        Ok(OrchestrationResult {
            run_id,
            summary: state.summary,
            map_json: state.map_json,
            model_outputs: state.model_outputs,
            errors: state.errors,
            iterations: outcome.iterations,
            termination: outcome.termination,
        })
    }
    .instrument(span)
    .await
}

/// 用真实依赖（PostGIS、MCP、LLM）启动一次编排
pub async fn launch(
    config: Config,
    request: PlanRequest,
    events: Arc<dyn EventSink>,
) -> Result<OrchestrationResult> {
    let store = PgSpatialStore::connect_lazy(&config.database)
        .context("Failed to configure spatial store")?;
    let tools = McpToolClient::new(&config.tools).context("Failed to create MCP client")?;
    let llm = LLMClient::new(config.llm.clone())?;

    let ctx = OrchestratorContext::new(
        config,
        Arc::new(store),
        Arc::new(tools),
        Arc::new(llm),
        events,
    );

    let result = run_orchestration(&ctx, request)
        .await
        .context("Invalid planning request")?;
    Ok(result)
}

// Include tests
#[cfg(test)]
mod tests;
