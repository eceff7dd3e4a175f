//! Server side of the tool protocol
//!
//! Tool server binaries implement [`ToolHandler`] and hand it to
//! [`serve_stdio`]. Every input line yields exactly one output line, and a
//! bad line never stops the loop.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::protocol::{
    text_content, JsonRpcResponse, RpcError, ToolDescriptor, PROTOCOL_VERSION,
};

/// Request id used when the client omits one
const DEFAULT_REQUEST_ID: u64 = 1;

const ENCODE_FAILURE: &str =
    r#"{"jsonrpc":"2.0","id":0,"error":{"code":-32603,"message":"Failed to encode response"}}"#;

/// The tools one server exposes
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn server_name(&self) -> &str;

    fn server_version(&self) -> &str;

    fn tools(&self) -> Vec<ToolDescriptor>;

    /// Run a tool that is known to exist; the returned value is wrapped as text content
    async fn call(&self, tool: &str, arguments: &Value) -> Result<Value, RpcError>;
}

/// Turn one request line into one response line (without the trailing newline)
pub async fn handle_line<H: ToolHandler + ?Sized>(handler: &H, line: &str) -> String {
    let response = match serde_json::from_str::<Value>(line) {
        Ok(request) => handle_request(handler, &request).await,
        Err(e) => {
            debug!(error = %e, "Unparsable request line");
            JsonRpcResponse::failure(json!(0), RpcError::internal(format!("Parse error: {}", e)))
        }
    };

    serde_json::to_string(&response).unwrap_or_else(|_| ENCODE_FAILURE.to_string())
}

async fn handle_request<H: ToolHandler + ?Sized>(handler: &H, request: &Value) -> JsonRpcResponse {
    let id = request
        .get("id")
        .filter(|id| !id.is_null())
        .cloned()
        .unwrap_or_else(|| json!(DEFAULT_REQUEST_ID));

    let method = request.get("method").and_then(|m| m.as_str()).unwrap_or("");

    match method {
        "initialize" => JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": { "listChanged": false } },
                "serverInfo": {
                    "name": handler.server_name(),
                    "version": handler.server_version()
                }
            }),
        ),
        "tools/list" => JsonRpcResponse::success(id, json!({ "tools": handler.tools() })),
        "tools/call" => handle_tool_call(handler, id, request).await,
        other => JsonRpcResponse::failure(
            id,
            RpcError::method_not_found(format!("Unknown method: {}", other)),
        ),
    }
}

async fn handle_tool_call<H: ToolHandler + ?Sized>(
    handler: &H,
    id: Value,
    request: &Value,
) -> JsonRpcResponse {
    let params = request.get("params");
    let tool = params
        .and_then(|p| p.get("name"))
        .and_then(|n| n.as_str())
        .unwrap_or("");
    let arguments = params
        .and_then(|p| p.get("arguments"))
        .filter(|a| !a.is_null())
        .cloned()
        .unwrap_or_else(|| json!({}));

    if !handler.tools().iter().any(|t| t.name == tool) {
        return JsonRpcResponse::failure(
            id,
            RpcError::method_not_found(format!("Unknown tool: {}", tool)),
        );
    }

    debug!(tool = %tool, arguments = %arguments, "Calling tool");

    match handler.call(tool, &arguments).await {
        Ok(payload) => JsonRpcResponse::success(id, text_content(&payload)),
        Err(e) => JsonRpcResponse::failure(id, e),
    }
}

/// Serve requests from `reader`, writing responses to `writer`, until EOF
pub async fn serve_lines<H, R, W>(handler: &H, mut reader: R, mut writer: W) -> std::io::Result<()>
where
    H: ToolHandler + ?Sized,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        // Undecodable bytes become U+FFFD and fail JSON parsing like any other bad line
        let raw = String::from_utf8_lossy(&buf);
        let line = raw.trim_end_matches(['\n', '\r']);
        debug!(line = %line, "Received");
        let mut response = handle_line(handler, line).await;
        response.push('\n');
        writer.write_all(response.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Serve on the process's stdin/stdout
pub async fn serve_stdio<H: ToolHandler + ?Sized>(handler: &H) -> std::io::Result<()> {
    info!(
        server = handler.server_name(),
        version = handler.server_version(),
        "Tool server listening on stdio"
    );

    let reader = BufReader::new(tokio::io::stdin());
    serve_lines(handler, reader, tokio::io::stdout()).await?;

    info!(server = handler.server_name(), "stdin closed, shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND};

    struct EchoHandler;

    #[async_trait]
    impl ToolHandler for EchoHandler {
        fn server_name(&self) -> &str {
            "echo"
        }

        fn server_version(&self) -> &str {
            "0.0.1"
        }

        fn tools(&self) -> Vec<ToolDescriptor> {
            vec![ToolDescriptor::new(
                "echo",
                "Echo a message",
                json!({"type": "object", "properties": {"message": {"type": "string"}}}),
            )]
        }

        async fn call(&self, _tool: &str, arguments: &Value) -> Result<Value, RpcError> {
            match arguments.get("message").and_then(|m| m.as_str()) {
                Some(message) => Ok(json!({ "message": message })),
                None => Err(RpcError::invalid_params("message is required")),
            }
        }
    }

    async fn roundtrip(line: &str) -> Value {
        serde_json::from_str(&handle_line(&EchoHandler, line).await).unwrap()
    }

    #[tokio::test]
    async fn test_malformed_line_yields_internal_error_with_id_zero() {
        let response = roundtrip("{not json").await;
        assert_eq!(response["id"], 0);
        assert_eq!(response["error"]["code"], INTERNAL_ERROR);
        assert!(response.get("result").is_none());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = roundtrip(r#"{"method":"resources/list","id":4}"#).await;
        assert_eq!(response["id"], 4);
        assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let response =
            roundtrip(r#"{"method":"tools/call","id":5,"params":{"name":"nope","arguments":{}}}"#)
                .await;
        assert_eq!(response["id"], 5);
        assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_params() {
        let response =
            roundtrip(r#"{"method":"tools/call","id":6,"params":{"name":"echo"}}"#).await;
        assert_eq!(response["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_list_then_call_round_trip() {
        let listed = roundtrip(r#"{"method":"tools/list","id":7}"#).await;
        assert_eq!(listed["id"], 7);
        assert!(listed.get("error").is_none());

        let tools = listed["result"]["tools"].as_array().unwrap();
        for (offset, tool) in tools.iter().enumerate() {
            let id = 8 + offset as u64;
            let request = json!({
                "method": "tools/call",
                "id": id,
                "params": { "name": tool["name"], "arguments": { "message": "hi" } }
            });
            let response = roundtrip(&request.to_string()).await;
            assert_eq!(response["id"], id);
            assert!(response.get("result").is_some());
            assert!(response.get("error").is_none());
            assert_eq!(response["result"]["content"][0]["type"], "text");
        }
    }

    #[tokio::test]
    async fn test_missing_id_defaults_to_one() {
        let response = roundtrip(r#"{"method":"tools/list"}"#).await;
        assert_eq!(response["id"], 1);
    }

    #[tokio::test]
    async fn test_initialize_reports_server_info() {
        let response = roundtrip(r#"{"method":"initialize","id":1,"params":{}}"#).await;
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], "echo");
    }

    #[tokio::test]
    async fn test_loop_survives_bad_line() {
        let input = b"garbage\n{\"method\":\"tools/list\",\"id\":2}\n".to_vec();
        let mut output = Vec::new();

        serve_lines(&EchoHandler, &input[..], &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["error"]["code"], INTERNAL_ERROR);
        assert_eq!(lines[1]["id"], 2);
        assert!(lines[1]["result"]["tools"].is_array());
    }

    #[tokio::test]
    async fn test_loop_survives_invalid_utf8() {
        let mut input = b"{\"method\":\"tools/list\",\"id\":1}\n".to_vec();
        input.extend_from_slice(&[0xff, 0xfe, b'\n']);
        input.extend_from_slice(b"{\"method\":\"tools/list\",\"id\":3}\n");
        let mut output = Vec::new();

        serve_lines(&EchoHandler, &input[..], &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["id"], 0);
        assert_eq!(lines[1]["error"]["code"], INTERNAL_ERROR);
        assert_eq!(lines[2]["id"], 3);
        assert!(lines[2]["result"]["tools"].is_array());
    }
}
