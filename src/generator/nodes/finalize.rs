use async_trait::async_trait;
use tracing::info;

use super::FINALIZE;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::generator::context::OrchestratorContext;
use crate::generator::node::Node;
use crate::generator::state::RunState;
use crate::types::geojson::FeatureCollection;

/// 收尾：校验输出文档与补丁日志一致
pub struct FinalizeNode;

#[async_trait]
impl Node for FinalizeNode {
    fn name(&self) -> &'static str {
        FINALIZE
    }

    async fn run(&self, state: RunState, _ctx: &OrchestratorContext) -> OrchestratorResult<RunState> {
        let replayed = FeatureCollection::replay(&state.patch_log)?;
        if replayed != state.map_json {
            return Err(OrchestratorError::Patch(format!(
                "document has {} features but the patch log rebuilds {}",
                state.map_json.len(),
                replayed.len()
            )));
        }
        info!(
            features = state.map_json.len(),
            zones = state.model_outputs.len(),
            errors = state.errors.len(),
            "run finalized"
        );
        Ok(state)
    }
}
