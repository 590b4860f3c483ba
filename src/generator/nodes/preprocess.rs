use async_trait::async_trait;
use tracing::debug;

use super::PREPROCESS;
use crate::error::OrchestratorResult;
use crate::generator::context::OrchestratorContext;
use crate::generator::node::Node;
use crate::generator::state::RunState;

/// 构建每个区域的两份请求载荷
pub struct PreprocessNode;

#[async_trait]
impl Node for PreprocessNode {
    fn name(&self) -> &'static str {
        PREPROCESS
    }

    async fn run(&self, state: RunState, ctx: &OrchestratorContext) -> OrchestratorResult<RunState> {
        let zones = state.zones.clone();
        let mut state = state;
        for zone in &zones {
            let zone_context = ctx.payload_builder.build(zone).await;
            state = state.with_zone_context(zone.id.clone(), zone_context);
        }
        debug!(zones = zones.len(), "payloads built");
        Ok(state)
    }
}
