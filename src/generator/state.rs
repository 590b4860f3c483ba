//! 编排运行状态
//!
//! 每个节点按值接收 [`RunState`] 并返回新的状态；节点之间不共享可变引用。

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::OrchestratorResult;
use crate::generator::context_builder::ZoneContext;
use crate::types::geojson::FeatureCollection;
use crate::types::patch::PatchOperation;
use crate::types::zone::Zone;

/// 规划上下文：过滤条件与目标
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanningContext {
    #[serde(default)]
    pub filters: Map<String, Value>,
    #[serde(default)]
    pub objectives: Vec<String>,
}

/// 单个区域的两个模型输出（已归一化）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneOutput {
    pub infra: Map<String, Value>,
    pub inequality: Map<String, Value>,
}

impl ZoneOutput {
    /// 是否包含可执行的建议：非空 suggestions 或建设类型标签
    pub fn has_recommendation(&self) -> bool {
        let has_suggestions = self
            .infra
            .get("suggestions")
            .and_then(Value::as_array)
            .is_some_and(|items| !items.is_empty());
        let has_construction = self
            .inequality
            .get("construction")
            .is_some_and(|v| !v.is_null() && v.as_str() != Some(""));
        has_suggestions || has_construction
    }
}

/// 错误记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub node: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub at: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            message: message.into(),
            context: None,
            at: Utc::now(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// 一次编排运行的完整状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunState {
    /// 输入区域（运行期间不可变）
    pub zones: Vec<Zone>,
    pub context: PlanningContext,
    /// 预处理阶段构建的请求载荷
    pub zone_contexts: IndexMap<String, ZoneContext>,
    /// 区域 id → 模型输出，按区域输入顺序排列
    pub model_outputs: IndexMap<String, ZoneOutput>,
    /// 输出文档
    pub map_json: FeatureCollection,
    /// 已应用的补丁，按应用顺序
    pub patch_log: Vec<PatchOperation>,
    pub summary: Option<String>,
    /// 只追加，运行期间不会清空
    pub errors: Vec<ErrorRecord>,
}

impl RunState {
    pub fn new(zones: Vec<Zone>, context: PlanningContext) -> Self {
        Self {
            zones,
            context,
            ..Default::default()
        }
    }

    pub fn with_zone_context(mut self, zone_id: impl Into<String>, context: ZoneContext) -> Self {
        self.zone_contexts.insert(zone_id.into(), context);
        self
    }

    pub fn with_model_output(mut self, zone_id: impl Into<String>, output: ZoneOutput) -> Self {
        self.model_outputs.insert(zone_id.into(), output);
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_error(mut self, record: ErrorRecord) -> Self {
        self.errors.push(record);
        self
    }

    /// 原子地应用一批补丁并记入补丁日志
    pub fn with_patches(mut self, patches: Vec<PatchOperation>) -> OrchestratorResult<Self> {
        self.map_json.apply_patches(&patches)?;
        self.patch_log.extend(patches);
        Ok(self)
    }

    /// 输出文档或任一区域输出中是否已有可执行建议
    pub fn has_recommendation(&self) -> bool {
        !self.map_json.is_empty() || self.model_outputs.values().any(ZoneOutput::has_recommendation)
    }

    /// 某节点记录的错误数
    pub fn error_count(&self, node: &str) -> usize {
        self.errors.iter().filter(|e| e.node == node).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::geojson::Feature;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn feature() -> Feature {
        Feature::from_value(&json!({"type": "Feature", "geometry": null, "properties": {}}))
            .unwrap()
    }

    #[test]
    fn test_with_patches_updates_document_and_log() {
        let state = RunState::default()
            .with_patches(vec![PatchOperation::append_feature(feature())])
            .unwrap();

        assert_eq!(state.map_json.len(), 1);
        assert_eq!(state.patch_log.len(), 1);
        assert_eq!(
            FeatureCollection::replay(&state.patch_log).unwrap(),
            state.map_json
        );
    }

    #[test]
    fn test_empty_outputs_are_not_recommendations() {
        let state = RunState::default().with_model_output("z1", ZoneOutput::default());
        assert!(!state.has_recommendation());
    }

    #[test]
    fn test_suggestions_or_construction_are_recommendations() {
        let with_suggestions = ZoneOutput {
            infra: object(json!({"suggestions": [{"type": "Feature"}]})),
            ..Default::default()
        };
        let with_construction = ZoneOutput {
            inequality: object(json!({"construction": "School"})),
            ..Default::default()
        };
        let empty_suggestions = ZoneOutput {
            infra: object(json!({"suggestions": []})),
            inequality: object(json!({"construction": null})),
        };

        assert!(with_suggestions.has_recommendation());
        assert!(with_construction.has_recommendation());
        assert!(!empty_suggestions.has_recommendation());
    }

    #[test]
    fn test_model_outputs_keep_insertion_order() {
        let state = RunState::default()
            .with_model_output("z2", ZoneOutput::default())
            .with_model_output("z1", ZoneOutput::default());
        let ids: Vec<&str> = state.model_outputs.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["z2", "z1"]);
    }

    #[test]
    fn test_error_record_serialization() {
        let record = ErrorRecord::new("run_models", "boom").with_context("attempt 1/3");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["node"], "run_models");
        assert_eq!(value["context"], "attempt 1/3");

        let bare = serde_json::to_value(ErrorRecord::new("finalize", "x")).unwrap();
        assert!(bare.get("context").is_none());
    }
}
