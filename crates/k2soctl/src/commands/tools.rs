//! Tools command - list and call tool servers from the terminal
//!
//! Uses the same registrations as `serve`, so it doubles as a check that the
//! configured servers launch and answer.

use anyhow::{anyhow, bail, Context};
use serde_json::Value;

use k2so_mcp::{McpRegistry, ToolProvider};

use super::serve::{build_registry, ServeConfig};

fn load_registry(config_file: Option<&str>) -> anyhow::Result<McpRegistry> {
    let config = ServeConfig::load(config_file)?;
    let registry = build_registry(&config.spec)?;
    if registry.is_empty() {
        bail!("No tool servers configured");
    }
    Ok(registry)
}

/// Parse `--args`; only a JSON object is accepted
pub fn parse_arguments(raw: &str) -> anyhow::Result<Value> {
    let value: Value = serde_json::from_str(raw).context("--args must be valid JSON")?;
    if !value.is_object() {
        return Err(anyhow!("--args must be a JSON object, got: {}", raw));
    }
    Ok(value)
}

pub async fn list(config_file: Option<&str>) -> anyhow::Result<()> {
    let registry = load_registry(config_file)?;
    let all = registry.list_all_tools().await;

    for (server, tools) in &all {
        if tools.is_empty() {
            println!("{} (unavailable)", server);
            continue;
        }
        println!("{} ({} tools)", server, tools.len());
        for tool in tools {
            println!("  {:<28} {}", tool.name, tool.description);
        }
    }

    registry.cleanup().await;
    Ok(())
}

pub async fn call(
    config_file: Option<&str>,
    server: &str,
    tool: &str,
    raw_args: &str,
) -> anyhow::Result<()> {
    let arguments = parse_arguments(raw_args)?;
    let registry = load_registry(config_file)?;
    if !registry.has_server(server) {
        bail!(
            "Unknown tool server '{}' (registered: {})",
            server,
            registry.server_names().join(", ")
        );
    }

    let result = registry.call_tool(server, tool, arguments).await;
    registry.cleanup().await;

    let text = result.with_context(|| format!("{}.{} failed", server, tool))?;
    println!("{}", text);
    Ok(())
}
