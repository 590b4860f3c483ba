use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use super::RUN_MODELS;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::generator::context::OrchestratorContext;
use crate::generator::events::Event;
use crate::generator::node::Node;
use crate::generator::state::{RunState, ZoneOutput};
use crate::types::geojson::Feature;
use crate::types::patch::PatchOperation;
use crate::utils::geometry::square_from_point;

/// 依次对每个区域调用两个外部模型，并把得到的要素以补丁形式追加到输出文档
///
/// 区域按输入顺序串行处理；同一区域内先调用基础设施模型，再调用不平等模型。
/// 任一工具调用失败都会使整个步骤失败，由重试包装器从头重跑。
pub struct RunModelsNode;

#[async_trait]
impl Node for RunModelsNode {
    fn name(&self) -> &'static str {
        RUN_MODELS
    }

    async fn run(&self, state: RunState, ctx: &OrchestratorContext) -> OrchestratorResult<RunState> {
        let tools = &ctx.config.tools;
        let graph = &ctx.config.graph;
        let zones = state.zones.clone();
        let mut state = state;

        for zone in &zones {
            let zone_context = match state.zone_contexts.get(&zone.id) {
                Some(zone_context) => zone_context.clone(),
                None => ctx.payload_builder.build(zone).await,
            };

            let infra = call_tool(
                ctx,
                &tools.infrastructure_tool,
                serde_json::to_value(&zone_context.population)?,
            )
            .await?;
            let inequality = call_tool(
                ctx,
                &tools.inequality_tool,
                serde_json::to_value(&zone_context.inequality)?,
            )
            .await?;

            let output = ZoneOutput { infra, inequality };
            ctx.events
                .emit(Event::partial(json!({
                    "zone": zone.id,
                    "infra": output.infra,
                    "inequality": output.inequality,
                })))
                .await;

            let patches = derive_patches(
                &zone.id,
                &output,
                graph.construction_square_meters,
                &tools.inequality_tool,
            );
            state = state.with_model_output(zone.id.clone(), output);

            if !patches.is_empty() {
                debug!(zone = %zone.id, patches = patches.len(), "applying map patches");
                ctx.events.emit(Event::map_patch(&patches)).await;
                state = state.with_patches(patches)?;
            }
        }

        Ok(state)
    }
}

/// 带超时的工具调用，响应归一化为映射
async fn call_tool(
    ctx: &OrchestratorContext,
    name: &str,
    payload: Value,
) -> OrchestratorResult<Map<String, Value>> {
    let timeout = ctx.config.tools.timeout();
    match tokio::time::timeout(timeout, ctx.tools.call_tool(name, payload)).await {
        Ok(response) => Ok(response?.normalize()),
        Err(_) => Err(OrchestratorError::Timeout {
            tool: name.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

/// 由一个区域的模型输出推导补丁
///
/// 顺序：先是不平等模型给出的建设点位（生成正方形面），再是基础设施模型
/// `suggestions` 中格式正确的要素。坐标无法转换时跳过该点位，不算失败。
pub fn derive_patches(
    zone_id: &str,
    output: &ZoneOutput,
    square_meters: f64,
    source: &str,
) -> Vec<PatchOperation> {
    let mut patches = Vec::new();

    let ineq = &output.inequality;
    if let (Some(lat), Some(lon), Some(construction)) =
        (ineq.get("lat"), ineq.get("lon"), ineq.get("construction"))
    {
        match (coerce_f64(lat), coerce_f64(lon)) {
            (Some(lat), Some(lon)) => {
                let mut properties = Map::new();
                properties.insert("use".to_string(), json!(construction_label(construction)));
                properties.insert("source".to_string(), json!(source));
                properties.insert("zone_id".to_string(), json!(zone_id));
                let geometry = square_from_point(lat, lon, square_meters);
                patches.push(PatchOperation::append_feature(Feature::new(
                    &geometry, properties,
                )));
            }
            _ => warn!(
                zone = zone_id,
                lat = %lat,
                lon = %lon,
                "skipping construction point with non-numeric coordinates"
            ),
        }
    }

    match output.infra.get("suggestions") {
        Some(Value::Array(items)) => {
            for item in items {
                match Feature::from_value(item) {
                    Some(feature) => patches.push(PatchOperation::append_feature(feature)),
                    None => debug!(zone = zone_id, "ignoring suggestion that is not a feature"),
                }
            }
        }
        Some(Value::Null) | None => {}
        Some(other) => warn!(zone = zone_id, suggestions = %other, "suggestions is not a list"),
    }

    patches
}

fn coerce_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn construction_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_lowercase(),
        other => other.to_string().to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::events::EventChannel;
    use crate::generator::state::PlanningContext;
    use crate::generator::test_support::{
        INEQUALITY, INFRA, ScriptedTools, context_with, drain, fast_config, point_zone,
    };
    use crate::utils::geometry::METERS_PER_DEGREE;
    use std::sync::Arc;
    use std::time::Duration;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn suggestion(name: &str) -> Value {
        json!({
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [-99.1, 19.4]},
            "properties": {"name": name}
        })
    }

    #[test]
    fn test_construction_square_then_suggestions() {
        let output = ZoneOutput {
            infra: object(json!({"suggestions": [suggestion("ciclovia")]})),
            inequality: object(json!({"lat": 19.4, "lon": -99.1, "construction": "Park"})),
        };

        let patches = derive_patches("z1", &output, 80.0, INEQUALITY);
        assert_eq!(patches.len(), 2);

        let PatchOperation::Add { value: square, .. } = &patches[0];
        assert_eq!(square.property_str("use"), Some("park"));
        assert_eq!(square.property_str("source"), Some(INEQUALITY));
        assert_eq!(square.property_str("zone_id"), Some("z1"));
        let ring = square.geometry["coordinates"][0].as_array().unwrap();
        assert_eq!(ring.len(), 5);
        let max_lat = ring[2][1].as_f64().unwrap();
        assert!((max_lat - 19.4 - 80.0 / METERS_PER_DEGREE).abs() < 1e-9);

        let PatchOperation::Add { value: suggested, .. } = &patches[1];
        assert_eq!(suggested.property_str("name"), Some("ciclovia"));
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let output = ZoneOutput {
            inequality: object(json!({"lat": "19.4", "lon": " -99.1 ", "construction": "SCHOOL"})),
            ..Default::default()
        };
        let patches = derive_patches("z1", &output, 80.0, INEQUALITY);
        assert_eq!(patches.len(), 1);
        let PatchOperation::Add { value, .. } = &patches[0];
        assert_eq!(value.property_str("use"), Some("school"));
    }

    #[test]
    fn test_malformed_point_is_skipped() {
        let output = ZoneOutput {
            infra: object(json!({"suggestions": [suggestion("a"), {"type": "Point"}, 3]})),
            inequality: object(json!({"lat": "north", "lon": -99.1, "construction": "Park"})),
        };
        let patches = derive_patches("z1", &output, 80.0, INEQUALITY);
        assert_eq!(patches.len(), 1);
    }

    #[test]
    fn test_suggestions_are_appended_verbatim() {
        let mut item = suggestion("parque");
        item["bbox"] = json!([-99.11, 19.39, -99.09, 19.41]);
        let output = ZoneOutput {
            infra: object(json!({"suggestions": [item.clone()]})),
            ..Default::default()
        };

        let patches = derive_patches("z1", &output, 80.0, INEQUALITY);
        let PatchOperation::Add { value, .. } = &patches[0];
        assert_eq!(serde_json::to_value(value).unwrap(), item);
    }

    #[test]
    fn test_missing_construction_key_yields_no_square() {
        let output = ZoneOutput {
            inequality: object(json!({"lat": 19.4, "lon": -99.1})),
            ..Default::default()
        };
        assert!(derive_patches("z1", &output, 80.0, INEQUALITY).is_empty());
    }

    #[tokio::test]
    async fn test_run_emits_partial_then_patch_per_zone() {
        let tools = ScriptedTools::default()
            .respond(INFRA, json!({"suggestions": [suggestion("s")]}))
            .respond(INEQUALITY, json!({"score": 0.3}));
        let tools = Arc::new(tools);
        let (ctx, mut rx) = context_with(fast_config(), tools.clone());
        let state = RunState::new(
            vec![point_zone("z1", 19.4, -99.1), point_zone("z2", 19.5, -99.2)],
            PlanningContext::default(),
        );

        let state = RunModelsNode.run(state, &ctx).await.unwrap();

        assert_eq!(state.map_json.len(), 2);
        assert_eq!(state.patch_log.len(), 2);
        assert_eq!(state.model_outputs["z2"].inequality["score"], 0.3);
        assert_eq!(tools.call_log(), vec![INFRA, INEQUALITY, INFRA, INEQUALITY]);

        let events = drain(&mut rx);
        let channels: Vec<EventChannel> = events.iter().map(|e| e.channel).collect();
        assert_eq!(
            channels,
            vec![
                EventChannel::Partial,
                EventChannel::MapPatch,
                EventChannel::Partial,
                EventChannel::MapPatch
            ]
        );
        assert_eq!(events[2].payload["zone"], "z2");
        assert_eq!(events[1].payload["patch"][0]["op"], "add");
        assert_eq!(events[1].payload["patch"][0]["path"], "/features/-");
    }

    #[tokio::test]
    async fn test_tool_failure_fails_the_step() {
        let tools = ScriptedTools::default()
            .respond(INFRA, json!({}))
            .fail(INEQUALITY);
        let (ctx, _rx) = context_with(fast_config(), Arc::new(tools));
        let state = RunState::new(vec![point_zone("z1", 19.4, -99.1)], PlanningContext::default());

        let err = RunModelsNode.run(state, &ctx).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains(INEQUALITY));
    }

    struct SlowTools;

    #[async_trait]
    impl crate::llm::tools::CapabilityClient for SlowTools {
        async fn call_tool(
            &self,
            _name: &str,
            _payload: Value,
        ) -> OrchestratorResult<crate::llm::tools::ExternalResponse> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(crate::llm::tools::ExternalResponse::Raw(Value::Null))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_tool_times_out_as_retryable() {
        let (ctx, _rx) = context_with(fast_config(), Arc::new(SlowTools));
        let state = RunState::new(vec![point_zone("z1", 19.4, -99.1)], PlanningContext::default());

        let err = RunModelsNode.run(state, &ctx).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Timeout { .. }));
        assert!(err.is_retryable());
    }
}
