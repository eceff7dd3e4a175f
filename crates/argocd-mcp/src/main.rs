//! argocd-mcp - ArgoCD application tools over stdio JSON-RPC
//!
//! Wraps the `argocd` CLI through `k2so_tools::argocd`. Rollbacks are two-step:
//! the first call returns a plan, and nothing runs until the caller repeats
//! the request with `confirmed: true`.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

use k2so_core::K2soError;
use k2so_mcp::{serve_stdio, RpcError, ToolDescriptor, ToolHandler};
use k2so_tools::ArgoCdClient;

const DEFAULT_HISTORY_LIMIT: usize = 10;

struct ArgoCdServer {
    client: ArgoCdClient,
}

fn app_schema(extra: Value, required: &[&str]) -> Value {
    let mut properties = json!({
        "app": { "type": "string", "description": "ArgoCD application name" }
    });
    if let (Some(props), Some(more)) = (properties.as_object_mut(), extra.as_object()) {
        props.extend(more.clone());
    }
    json!({ "type": "object", "properties": properties, "required": required })
}

fn required_str<'a>(arguments: &'a Value, key: &str) -> Result<&'a str, RpcError> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RpcError::invalid_params(format!("'{}' is required", key)))
}

/// Revision ids arrive as numbers or numeric strings
fn revision_id(arguments: &Value) -> Result<i64, RpcError> {
    let id = match arguments.get("revision") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().trim_start_matches('#').parse().ok(),
        _ => None,
    };
    id.ok_or_else(|| RpcError::invalid_params("'revision' must be a revision id"))
}

fn history_limit(arguments: &Value) -> usize {
    arguments
        .get("limit")
        .and_then(Value::as_u64)
        .and_then(|l| usize::try_from(l).ok())
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
}

fn is_confirmed(arguments: &Value) -> bool {
    arguments
        .get("confirmed")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// CLI failures travel as internal errors carrying the user-facing text
fn cli_error(e: K2soError) -> RpcError {
    match e {
        K2soError::Tool(msg) | K2soError::Timeout(msg) => RpcError::internal(msg),
        other => RpcError::internal(other.to_string()),
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::internal(e.to_string()))
}

impl ArgoCdServer {
    async fn rollback(&self, arguments: &Value) -> Result<Value, RpcError> {
        let app = required_str(arguments, "app")?;
        let revision = revision_id(arguments)?;

        if !is_confirmed(arguments) {
            let plan = self
                .client
                .prepare_rollback(app, revision)
                .await
                .map_err(cli_error)?;
            return Ok(json!({
                "status": "confirmation_required",
                "message": format!(
                    "Rolling back {} from {} to revision #{} ({}). Repeat with confirmed: true to proceed.",
                    plan.app_name, plan.current_revision, plan.revision_id, plan.target.revision
                ),
                "plan": to_value(&plan)?,
            }));
        }

        info!(app = %app, revision, "Confirmed rollback");
        let outcome = self.client.rollback(app, revision).await.map_err(cli_error)?;
        Ok(json!({
            "status": "rolled_back",
            "outcome": to_value(&outcome)?,
        }))
    }
}

#[async_trait]
impl ToolHandler for ArgoCdServer {
    fn server_name(&self) -> &str {
        "argocd"
    }

    fn server_version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new(
                "list_applications",
                "List ArgoCD applications with sync and health status",
                json!({ "type": "object", "properties": {} }),
            ),
            ToolDescriptor::new(
                "get_application_status",
                "Get sync status, health and revision of an application",
                app_schema(json!({}), &["app"]),
            ),
            ToolDescriptor::new(
                "get_application_history",
                "Get deployment history of an application, newest first",
                app_schema(
                    json!({ "limit": { "type": "integer", "description": "Maximum revisions (default 10)" } }),
                    &["app"],
                ),
            ),
            ToolDescriptor::new(
                "sync_application",
                "Trigger a sync of an application",
                app_schema(json!({}), &["app"]),
            ),
            ToolDescriptor::new(
                "rollback_application",
                "Roll an application back to a previous revision (requires confirmation)",
                app_schema(
                    json!({
                        "revision": { "type": "integer", "description": "Revision id from the history" },
                        "confirmed": { "type": "boolean", "description": "Set to true to perform the rollback" }
                    }),
                    &["app", "revision"],
                ),
            ),
        ]
    }

    async fn call(&self, tool: &str, arguments: &Value) -> Result<Value, RpcError> {
        match tool {
            "list_applications" => {
                let apps = self.client.list_applications().await.map_err(cli_error)?;
                Ok(json!({ "count": apps.len(), "applications": to_value(&apps)? }))
            }
            "get_application_status" => {
                let app = required_str(arguments, "app")?;
                let status = self.client.application_status(app).await.map_err(cli_error)?;
                to_value(&status)
            }
            "get_application_history" => {
                let app = required_str(arguments, "app")?;
                let history = self
                    .client
                    .history(app, history_limit(arguments))
                    .await
                    .map_err(cli_error)?;
                Ok(json!({ "app": app, "revisions": to_value(&history)? }))
            }
            "sync_application" => {
                let app = required_str(arguments, "app")?;
                let output = self.client.sync(app, None).await.map_err(cli_error)?;
                Ok(json!({ "app": app, "status": "sync_triggered", "output": output }))
            }
            "rollback_application" => self.rollback(arguments).await,
            other => Err(RpcError::method_not_found(format!("Unknown tool: {}", other))),
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let server = ArgoCdServer {
        client: ArgoCdClient::new(),
    };
    serve_stdio(&server).await
}
