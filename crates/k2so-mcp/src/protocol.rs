//! Wire types for the line-delimited JSON-RPC tool protocol
//!
//! Each message is one JSON object on one line. A response carries either
//! `result` or `error`, never both.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Unknown method or unknown tool
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Arguments missing, mistyped, or out of range
pub const INVALID_PARAMS: i64 = -32602;
/// Unparsable input or an unexpected server-side failure
pub const INTERNAL_ERROR: i64 = -32603;

fn jsonrpc_version() -> String {
    JSONRPC_VERSION.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default = "jsonrpc_version")]
    pub jsonrpc: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    pub method: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id: Some(json!(id)),
            method: method.into(),
            params,
        }
    }

    pub fn initialize(id: u64, client_name: &str, client_version: &str) -> Self {
        Self::new(
            id,
            "initialize",
            Some(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": { "name": client_name, "version": client_version }
            })),
        )
    }

    pub fn list_tools(id: u64) -> Self {
        Self::new(id, "tools/list", None)
    }

    pub fn call_tool(id: u64, tool: &str, arguments: Value) -> Self {
        Self::new(
            id,
            "tools/call",
            Some(json!({ "name": tool, "arguments": arguments })),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn method_not_found(message: impl Into<String>) -> Self {
        Self::new(METHOD_NOT_FOUND, message)
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default = "jsonrpc_version")]
    pub jsonrpc: String,

    #[serde(default)]
    pub id: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Numeric id, if the peer echoed one
    pub fn numeric_id(&self) -> Option<u64> {
        self.id.as_u64()
    }

    pub fn into_result(self) -> Result<Value, RpcError> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(error),
            (Some(result), None) => Ok(result),
            (None, None) => Err(RpcError::internal(
                "Response carried neither result nor error",
            )),
        }
    }
}

/// Metadata for one callable tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(rename = "inputSchema", default = "empty_schema")]
    pub input_schema: Value,
}

fn empty_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Parse the `tools` array of a `tools/list` result
pub fn parse_tool_list(result: &Value) -> Result<Vec<ToolDescriptor>, serde_json::Error> {
    match result.get("tools") {
        Some(tools) => serde_json::from_value(tools.clone()),
        None => Ok(Vec::new()),
    }
}

/// Wrap a tool's structured output in the `content` envelope
pub fn text_content(payload: &Value) -> Value {
    let text = match payload {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    json!({ "content": [{ "type": "text", "text": text }] })
}

/// Flatten a `tools/call` result into text
///
/// Text parts are joined with newlines. Results without a `content`
/// array are returned as their JSON encoding.
pub fn result_text(result: &Value) -> String {
    let parts: Vec<&str> = result
        .get("content")
        .and_then(|c| c.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("text").and_then(|t| t.as_str()))
                .collect()
        })
        .unwrap_or_default();

    if !parts.is_empty() {
        return parts.join("\n");
    }

    match result {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = JsonRpcRequest::call_tool(3, "get_joke_by_index", json!({"index": 2}));
        let line = serde_json::to_string(&request).unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 3);
        assert_eq!(value["method"], "tools/call");
        assert_eq!(value["params"]["name"], "get_joke_by_index");
        assert_eq!(value["params"]["arguments"]["index"], 2);
    }

    #[test]
    fn test_list_request_omits_params() {
        let line = serde_json::to_string(&JsonRpcRequest::list_tools(7)).unwrap();
        assert!(!line.contains("params"));
    }

    #[test]
    fn test_failure_response_has_no_result() {
        let response = JsonRpcResponse::failure(json!(0), RpcError::internal("Parse error"));
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("result").is_none());
        assert_eq!(value["error"]["code"], INTERNAL_ERROR);
    }

    #[test]
    fn test_into_result() {
        let ok = JsonRpcResponse::success(json!(1), json!({"tools": []}));
        assert!(ok.into_result().is_ok());

        let err = JsonRpcResponse::failure(json!(1), RpcError::invalid_params("Index must be 0-7"));
        assert_eq!(err.into_result().unwrap_err().code, INVALID_PARAMS);

        let empty: JsonRpcResponse = serde_json::from_str(r#"{"jsonrpc":"2.0","id":1}"#).unwrap();
        assert!(empty.into_result().is_err());
    }

    #[test]
    fn test_parse_tool_list() {
        let result = json!({
            "tools": [
                {"name": "get_current_time", "description": "Get the current time"},
                {"name": "count_jokes", "description": "Count", "inputSchema": {"type": "object"}}
            ]
        });
        let tools = parse_tool_list(&result).unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].input_schema["type"], "object");
        assert!(parse_tool_list(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn test_result_text() {
        let wrapped = text_content(&json!({"total_jokes": 8}));
        assert_eq!(result_text(&wrapped), r#"{"total_jokes":8}"#);

        let multi = json!({"content": [{"type": "text", "text": "a"}, {"type": "text", "text": "b"}]});
        assert_eq!(result_text(&multi), "a\nb");

        assert_eq!(result_text(&json!({"ok": true})), r#"{"ok":true}"#);
    }
}
