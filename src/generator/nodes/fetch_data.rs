use async_trait::async_trait;
use tracing::debug;

use super::FETCH_DATA;
use crate::error::OrchestratorResult;
use crate::generator::context::OrchestratorContext;
use crate::generator::node::Node;
use crate::generator::state::RunState;

/// 为每个区域预留模型输出槽位
///
/// 即使后续模型调用全部失败，`model_outputs` 中也保留该区域的键（值为空映射）。
pub struct FetchDataNode;

#[async_trait]
impl Node for FetchDataNode {
    fn name(&self) -> &'static str {
        FETCH_DATA
    }

    async fn run(&self, state: RunState, _ctx: &OrchestratorContext) -> OrchestratorResult<RunState> {
        let mut state = state;
        for zone in &state.zones {
            state.model_outputs.entry(zone.id.clone()).or_default();
        }
        debug!(zones = state.zones.len(), "model output slots ready");
        Ok(state)
    }
}
