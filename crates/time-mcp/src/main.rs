//! time-mcp - current time and Unix timestamp over stdio JSON-RPC
//!
//! Logs go to stderr; stdout carries protocol lines only.

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use serde_json::{json, Value};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use k2so_mcp::{serve_stdio, RpcError, ToolDescriptor, ToolHandler};

struct TimeServer;

fn no_arguments() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// Payload for `get_current_time`
fn current_time<Tz: TimeZone>(now: &DateTime<Tz>) -> Value
where
    Tz::Offset: std::fmt::Display,
{
    json!({
        "iso_format": now.to_rfc3339(),
        "human_readable": now.format("%I:%M %p on %A, %B %d, %Y").to_string(),
        "time_only": now.format("%I:%M %p").to_string(),
        "date_only": now.format("%A, %B %d, %Y").to_string(),
        "day_of_week": now.format("%A").to_string(),
    })
}

/// Payload for `get_timestamp`
fn timestamp<Tz: TimeZone>(now: &DateTime<Tz>) -> Value {
    json!({
        "unix_timestamp": now.timestamp(),
        "description": "Seconds since January 1, 1970 00:00:00 UTC",
    })
}

#[async_trait]
impl ToolHandler for TimeServer {
    fn server_name(&self) -> &str {
        "time"
    }

    fn server_version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new(
                "get_current_time",
                "Get the current date and time",
                no_arguments(),
            ),
            ToolDescriptor::new(
                "get_timestamp",
                "Get the current Unix timestamp",
                no_arguments(),
            ),
        ]
    }

    async fn call(&self, tool: &str, _arguments: &Value) -> Result<Value, RpcError> {
        let now = Local::now();
        debug!(tool = %tool, "Tool call");
        match tool {
            "get_current_time" => Ok(current_time(&now)),
            "get_timestamp" => Ok(timestamp(&now)),
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

    serve_stdio(&TimeServer).await
}
