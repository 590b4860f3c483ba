#[cfg(test)]
mod tests {
    use crate::error::OrchestratorError;
    use crate::generator::graph::TerminationReason;
    use crate::generator::test_support::{
        INEQUALITY, INFRA, ScriptedTools, context_with, fast_config,
    };
    use crate::generator::workflow::run_orchestration;
    use crate::types::zone::PlanRequest;
    use serde_json::json;
    use std::sync::Arc;

    fn request() -> PlanRequest {
        serde_json::from_value(json!({
            "zones": [{
                "id": "z1",
                "lat": 19.4,
                "lon": -99.1,
                "geometry": {"type": "Point", "coordinates": [-99.1, 19.4]}
            }],
            "filters": {"alcaldia": "Cuauhtémoc"},
            "objectives": ["más áreas verdes"]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_run_orchestration_result_envelope() {
        let tools = ScriptedTools::default()
            .respond(INEQUALITY, json!({"lat": 19.4, "lon": -99.1, "construction": "Park"}));
        let (ctx, _rx) = context_with(fast_config(), Arc::new(tools));

        let result = run_orchestration(&ctx, request()).await.unwrap();

        assert_eq!(result.summary.as_deref(), Some("resumen"));
        assert_eq!(result.map_json.len(), 1);
        assert!(result.model_outputs.contains_key("z1"));
        assert!(result.errors.is_empty());
        assert_eq!(result.termination, TerminationReason::Recommendation);

        let value = serde_json::to_value(&result).unwrap();
        for key in ["summary", "map_json", "model_outputs", "errors", "iterations", "termination"] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(value["map_json"]["type"], "FeatureCollection");
        assert_eq!(value["termination"], "recommendation");
    }

    #[tokio::test]
    async fn test_failed_tool_keeps_zone_key_with_empty_outputs() {
        let tools = ScriptedTools::default()
            .respond(INFRA, json!({"suggestions": []}))
            .fail(INEQUALITY);
        let (ctx, _rx) = context_with(fast_config(), Arc::new(tools));

        let result = run_orchestration(&ctx, request()).await.unwrap();

        assert_eq!(result.errors.len(), 3);
        assert!(result.errors.iter().all(|e| e.node == "run_models"));
        let output = &result.model_outputs["z1"];
        assert!(output.infra.is_empty());
        assert!(output.inequality.is_empty());
        assert_eq!(result.termination, TerminationReason::Degraded);
    }

    #[tokio::test]
    async fn test_structural_errors_are_not_swallowed() {
        let (ctx, _rx) = context_with(fast_config(), Arc::new(ScriptedTools::default()));
        let request: PlanRequest = serde_json::from_value(json!({
            "zones": [
                {"id": "z1", "geometry": {"type": "Point", "coordinates": [0, 0]}},
                {"id": "z1", "geometry": {"type": "Point", "coordinates": [1, 1]}}
            ]
        }))
        .unwrap();

        let err = run_orchestration(&ctx, request).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_empty_request_terminates_immediately() {
        let tools = Arc::new(ScriptedTools::default());
        let (ctx, _rx) = context_with(fast_config(), tools.clone());

        let result = run_orchestration(&ctx, PlanRequest::default()).await.unwrap();

        assert_eq!(result.termination, TerminationReason::NoZones);
        assert_eq!(result.iterations, 1);
        assert!(tools.call_log().is_empty());
        assert!(result.map_json.is_empty());
    }
}
