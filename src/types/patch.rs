//! 输出文档的增量补丁（JSON Patch 子集）

use serde::{Deserialize, Serialize};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::types::geojson::{Feature, FeatureCollection};

/// 追加到要素序列末尾的 JSON Pointer
pub const APPEND_FEATURE_PATH: &str = "/features/-";

/// 单条补丁操作
///
/// 序列化格式与 RFC 6902 一致：`{"op": "add", "path": "/features/-", "value": {...}}`。
/// 目前只使用追加一种操作。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    Add { path: String, value: Feature },
}

impl PatchOperation {
    pub fn append_feature(feature: Feature) -> Self {
        PatchOperation::Add {
            path: APPEND_FEATURE_PATH.to_string(),
            value: feature,
        }
    }

    fn validate(&self) -> OrchestratorResult<()> {
        match self {
            PatchOperation::Add { path, .. } if path == APPEND_FEATURE_PATH => Ok(()),
            PatchOperation::Add { path, .. } => Err(OrchestratorError::Patch(format!(
                "unsupported path `{}`, only `{}` is allowed",
                path, APPEND_FEATURE_PATH
            ))),
        }
    }
}

impl FeatureCollection {
    /// 原子地应用一批补丁：先整体校验，全部合法后按顺序追加
    pub fn apply_patches(&mut self, patches: &[PatchOperation]) -> OrchestratorResult<()> {
        for patch in patches {
            patch.validate()?;
        }
        for patch in patches {
            match patch {
                PatchOperation::Add { value, .. } => self.features.push(value.clone()),
            }
        }
        Ok(())
    }

    /// 通过重放有序补丁日志重建文档
    pub fn replay(patch_log: &[PatchOperation]) -> OrchestratorResult<Self> {
        let mut collection = FeatureCollection::new();
        collection.apply_patches(patch_log)?;
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(tag: &str) -> Feature {
        Feature::from_value(&json!({
            "type": "Feature",
            "geometry": null,
            "properties": {"tag": tag}
        }))
        .unwrap()
    }

    #[test]
    fn test_patch_serializes_as_json_patch() {
        let patch = PatchOperation::append_feature(feature("a"));
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value["op"], "add");
        assert_eq!(value["path"], "/features/-");
        assert_eq!(value["value"]["type"], "Feature");
    }

    #[test]
    fn test_apply_appends_in_order() {
        let mut collection = FeatureCollection::new();
        collection
            .apply_patches(&[
                PatchOperation::append_feature(feature("a")),
                PatchOperation::append_feature(feature("b")),
            ])
            .unwrap();
        collection
            .apply_patches(&[PatchOperation::append_feature(feature("c"))])
            .unwrap();

        let tags: Vec<_> = collection
            .iter()
            .map(|f| f.property_str("tag").unwrap().to_string())
            .collect();
        assert_eq!(tags, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_apply_is_atomic() {
        let mut collection = FeatureCollection::new();
        let result = collection.apply_patches(&[
            PatchOperation::append_feature(feature("a")),
            PatchOperation::Add {
                path: "/features/0".to_string(),
                value: feature("b"),
            },
        ]);

        assert!(matches!(result, Err(OrchestratorError::Patch(_))));
        assert!(collection.is_empty());
    }

    #[test]
    fn test_replay_rebuilds_document() {
        let log = vec![
            PatchOperation::append_feature(feature("a")),
            PatchOperation::append_feature(feature("b")),
        ];
        let mut incremental = FeatureCollection::new();
        incremental.apply_patches(&log[..1]).unwrap();
        incremental.apply_patches(&log[1..]).unwrap();

        assert_eq!(FeatureCollection::replay(&log).unwrap(), incremental);
    }
}
