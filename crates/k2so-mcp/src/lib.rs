//! K2SO MCP - tool servers over line-delimited JSON-RPC
//!
//! Client side: [`McpRegistry`] launches registered subprocesses on demand,
//! discovers their tools, and invokes them. Server side: [`server`] holds the
//! request loop shared by the bundled tool server binaries.
//!
//! ```rust,ignore
//! use k2so_core::ToolServerConfig;
//! use k2so_mcp::{McpRegistry, ToolProvider};
//!
//! let registry = McpRegistry::new();
//! registry.register(ToolServerConfig::new("time", "time-mcp"))?;
//! let text = registry.call_tool("time", "get_current_time", serde_json::json!({})).await?;
//! registry.cleanup().await;
//! ```

pub mod client;
pub mod protocol;
pub mod registry;
pub mod server;

pub use client::McpSession;
pub use protocol::{JsonRpcRequest, JsonRpcResponse, RpcError, ToolDescriptor};
pub use registry::{McpRegistry, ToolProvider};
pub use server::{handle_line, serve_stdio, ToolHandler};
