//! 外部模型能力（MCP 工具）接口

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::OrchestratorResult;

pub mod mcp;

pub use mcp::McpToolClient;

/// 外部工具的异构响应
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalResponse {
    /// 已结构化的对象
    Structured(Map<String, Value>),
    /// 纯文本，可能是 JSON 字符串
    PlainText(String),
    /// 其他任意值
    Raw(Value),
}

impl ExternalResponse {
    /// 归一化为普通映射，永不失败
    ///
    /// - 空值 → `{}`
    /// - 对象 → 原样
    /// - 可解析为 JSON 对象的文本 → 解析结果
    /// - 其余 → `{"value": 原值}`
    pub fn normalize(self) -> Map<String, Value> {
        match self {
            ExternalResponse::Structured(map) => map,
            ExternalResponse::PlainText(text) => normalize_text(text),
            ExternalResponse::Raw(Value::Null) => Map::new(),
            ExternalResponse::Raw(Value::Object(map)) => map,
            ExternalResponse::Raw(Value::String(text)) => normalize_text(text),
            ExternalResponse::Raw(other) => wrap_value(other),
        }
    }
}

fn normalize_text(text: String) -> Map<String, Value> {
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => map,
        _ => wrap_value(Value::String(text)),
    }
}

fn wrap_value(value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("value".to_string(), value);
    map
}

/// 外部能力客户端：`call_tool(name, payload) -> response`
#[async_trait]
pub trait CapabilityClient: Send + Sync {
    async fn call_tool(&self, name: &str, payload: Value) -> OrchestratorResult<ExternalResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structured_passthrough() {
        let map = json!({"suggestions": []}).as_object().cloned().unwrap();
        assert_eq!(ExternalResponse::Structured(map.clone()).normalize(), map);
    }

    #[test]
    fn test_json_text_is_parsed() {
        let normalized =
            ExternalResponse::PlainText(r#"{"lat": 19.4, "construction": "School"}"#.to_string())
                .normalize();
        assert_eq!(normalized["construction"], "School");
    }

    #[test]
    fn test_non_json_text_is_wrapped() {
        let normalized = ExternalResponse::PlainText("sin resultados".to_string()).normalize();
        assert_eq!(Value::Object(normalized), json!({"value": "sin resultados"}));
    }

    #[test]
    fn test_json_array_text_is_wrapped_as_text() {
        let normalized = ExternalResponse::PlainText("[1, 2]".to_string()).normalize();
        assert_eq!(Value::Object(normalized), json!({"value": "[1, 2]"}));
    }

    #[test]
    fn test_raw_values() {
        assert!(ExternalResponse::Raw(Value::Null).normalize().is_empty());
        assert_eq!(
            Value::Object(ExternalResponse::Raw(json!(42)).normalize()),
            json!({"value": 42})
        );
        assert_eq!(
            Value::Object(ExternalResponse::Raw(json!({"a": 1})).normalize()),
            json!({"a": 1})
        );
    }
}
