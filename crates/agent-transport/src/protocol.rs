//! Wire Protocol
//!
//! Server → client traffic is a server-sent event stream; client → server
//! traffic is JSON-RPC 2.0 requests POSTed to the endpoint announced in the
//! first event. Responses come back on the event stream, correlated by id.
//!
//! ```text
//! client                         server
//!   │ GET /sse ─────────────────────▶│
//!   │◀──────── event: endpoint ──────│  data: /messages?connection=<id>
//!   │ POST initialize {user_id} ────▶│
//!   │◀──────── event: message ───────│  {session_id}
//!   │ POST tools/list ──────────────▶│
//!   │◀──────── event: message ───────│  {tools: [...]}
//!   │ POST tools/call ──────────────▶│
//!   │◀──────── event: ping ──────────│  (heartbeat)
//!   │◀──────── event: message ───────│  {content, is_error}
//!   │ POST shutdown ────────────────▶│
//!   │◀──────── event: close ─────────│
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use agent_core::ToolSchema;

pub const EVENT_ENDPOINT: &str = "endpoint";
pub const EVENT_MESSAGE: &str = "message";
pub const EVENT_PING: &str = "ping";
pub const EVENT_CLOSE: &str = "close";

pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_LIST_TOOLS: &str = "tools/list";
pub const METHOD_CALL_TOOL: &str = "tools/call";
pub const METHOD_SHUTDOWN: &str = "shutdown";

pub const PARSE_ERROR: i64 = -32700;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const UNKNOWN_SESSION: i64 = -32001;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            method: method.into(),
            params,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn ok(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: u64, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InitializeParams {
    pub client: String,
    pub user_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InitializeResult {
    pub server: String,
    pub session_id: String,
}

/// Session-scoped request parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionParams {
    pub session_id: String,
}

/// Advertised tool
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemoteToolSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl RemoteToolSpec {
    pub fn to_schema(&self) -> ToolSchema {
        ToolSchema::from_json_schema(&self.name, &self.description, &self.input_schema)
    }
}

impl From<&ToolSchema> for RemoteToolSpec {
    fn from(schema: &ToolSchema) -> Self {
        Self {
            name: schema.name.clone(),
            description: schema.description.clone(),
            input_schema: schema.to_json_schema(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<RemoteToolSpec>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallToolParams {
    pub session_id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Map<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallToolResult {
    pub content: Value,
    #[serde(default)]
    pub is_error: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::ParameterSchema;
    use serde_json::json;

    #[test]
    fn test_tool_spec_uses_camel_case_schema_key() {
        let schema = ToolSchema {
            name: "list_directory".into(),
            description: "List a folder".into(),
            parameters: vec![ParameterSchema::optional("folder", "string", "Folder", Some(json!("")))],
            category: None,
            has_side_effects: false,
        };
        let spec = RemoteToolSpec::from(&schema);
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["inputSchema"]["properties"]["folder"]["default"], "");
        assert_eq!(spec.to_schema().parameters[0].name, "folder");
    }

    #[test]
    fn test_error_response_omits_result() {
        let value = serde_json::to_value(JsonRpcResponse::err(7, METHOD_NOT_FOUND, "nope")).unwrap();
        assert!(value.get("result").is_none());
        assert_eq!(value["error"]["code"], -32601);
    }
}
