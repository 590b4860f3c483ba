//! 基于 streamable HTTP 的 MCP 工具客户端（JSON-RPC `tools/call`）
//!
//! 首次调用工具前完成 `initialize` / `notifications/initialized` 握手；
//! 服务端返回的 `Mcp-Session-Id` 会附加在之后的每个请求上。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use tracing::debug;

use super::{CapabilityClient, ExternalResponse};
use crate::config::ToolsConfig;
use crate::error::{OrchestratorError, OrchestratorResult};

/// 会话头
pub const SESSION_HEADER: &str = "mcp-session-id";

/// 客户端声明的协议版本
pub const PROTOCOL_VERSION: &str = "2025-03-26";

#[derive(Debug, Serialize)]
struct JsonRpcRequest<P> {
    jsonrpc: &'static str,
    /// 通知没有 id
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<P>,
}

#[derive(Debug, Serialize)]
struct ToolCallParams<'a> {
    name: &'a str,
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// MCP 工具客户端
pub struct McpToolClient {
    endpoint: String,
    http: reqwest::Client,
    next_id: AtomicU64,
    /// 握手结果；无状态服务端不返回会话 id
    session: OnceCell<Option<String>>,
}

impl McpToolClient {
    pub fn new(config: &ToolsConfig) -> OrchestratorResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            endpoint: config.endpoint.clone(),
            http,
            next_id: AtomicU64::new(1),
            session: OnceCell::new(),
        })
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn post<T: Serialize>(&self, body: &T, session: Option<&str>) -> reqwest::RequestBuilder {
        let builder = self
            .http
            .post(&self.endpoint)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(body);
        match session {
            Some(id) => builder.header(SESSION_HEADER, id),
            None => builder,
        }
    }

    /// 握手只成功一次；失败时下次调用重新尝试
    async fn session(&self, tool: &str) -> OrchestratorResult<Option<&str>> {
        let session = self
            .session
            .get_or_try_init(|| self.initialize(tool))
            .await?;
        Ok(session.as_deref())
    }

    async fn initialize(&self, tool: &str) -> OrchestratorResult<Option<String>> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: Some(self.next_id()),
            method: "initialize",
            params: Some(initialize_params()),
        };
        let response = self.post(&request, None).send().await?;
        let session = session_id(response.headers());
        let status = response.status();
        let is_event_stream = is_event_stream(response.headers());
        let body = response.text().await?;

        if !status.is_success() {
            return Err(OrchestratorError::tool(
                tool,
                format!("initialize failed with http {}: {}", status, body),
            ));
        }
        let envelope = parse_envelope(tool, &body, is_event_stream)?;
        if let Some(error) = envelope.error {
            return Err(OrchestratorError::tool(
                tool,
                format!("initialize rejected {}: {}", error.code, error.message),
            ));
        }

        let notification: JsonRpcRequest<Value> = JsonRpcRequest {
            jsonrpc: "2.0",
            id: None,
            method: "notifications/initialized",
            params: None,
        };
        let response = self.post(&notification, session.as_deref()).send().await?;
        if !response.status().is_success() {
            return Err(OrchestratorError::tool(
                tool,
                format!("initialized notification failed with http {}", response.status()),
            ));
        }

        debug!(session = ?session, "mcp session ready");
        Ok(session)
    }
}

#[async_trait]
impl CapabilityClient for McpToolClient {
    async fn call_tool(&self, name: &str, payload: Value) -> OrchestratorResult<ExternalResponse> {
        let session = self.session(name).await?;
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: Some(self.next_id()),
            method: "tools/call",
            params: Some(ToolCallParams {
                name,
                arguments: payload,
            }),
        };
        debug!(tool = name, id = ?request.id, "calling mcp tool");

        let response = self.post(&request, session).send().await?;
        let status = response.status();
        let is_event_stream = is_event_stream(response.headers());
        let body = response.text().await?;

        if !status.is_success() {
            return Err(OrchestratorError::tool(
                name,
                format!("http {}: {}", status, body),
            ));
        }

        let envelope = parse_envelope(name, &body, is_event_stream)?;
        into_response(name, envelope)
    }
}

fn initialize_params() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }
    })
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/event-stream"))
}

/// 解析响应体；事件流取最后一条 `data:` 消息
///
/// 无法解码的响应体（网关错误页、被截断的帧）按工具错误处理，可重试。
fn parse_envelope(
    name: &str,
    body: &str,
    is_event_stream: bool,
) -> OrchestratorResult<JsonRpcResponse> {
    let data = if is_event_stream {
        body.lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .ok_or_else(|| OrchestratorError::tool(name, "empty event stream"))?
    } else {
        body
    };
    serde_json::from_str(data)
        .map_err(|e| OrchestratorError::tool(name, format!("malformed response: {}", e)))
}

fn into_response(name: &str, envelope: JsonRpcResponse) -> OrchestratorResult<ExternalResponse> {
    if let Some(error) = envelope.error {
        return Err(OrchestratorError::tool(
            name,
            format!("json-rpc error {}: {}", error.code, error.message),
        ));
    }
    let result = envelope.result.unwrap_or(Value::Null);

    let first_text = result
        .get("content")
        .and_then(Value::as_array)
        .and_then(|blocks| {
            blocks
                .iter()
                .find(|b| b.get("type").and_then(Value::as_str) == Some("text"))
        })
        .and_then(|b| b.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string);

    if result.get("isError").and_then(Value::as_bool) == Some(true) {
        return Err(OrchestratorError::tool(
            name,
            first_text.unwrap_or_else(|| "tool reported an error".to_string()),
        ));
    }

    if let Some(Value::Object(map)) = result.get("structuredContent") {
        return Ok(ExternalResponse::Structured(map.clone()));
    }
    match first_text {
        Some(text) => Ok(ExternalResponse::PlainText(text)),
        None => Ok(ExternalResponse::Raw(result)),
    }
}
