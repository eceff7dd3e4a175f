//! Error types shared across the K2SO crates

use thiserror::Error;

/// Result alias used throughout the workspace
pub type K2soResult<T> = Result<T, K2soError>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum K2soError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Connection to tool server '{server}' failed: {message}")]
    Connection { server: String, message: String },

    #[error("Tool call {server}.{tool} failed: {message}")]
    ToolCall {
        server: String,
        tool: String,
        message: String,
    },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl K2soError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    pub fn tool(msg: impl Into<String>) -> Self {
        Self::Tool(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn connection(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            server: server.into(),
            message: message.into(),
        }
    }

    pub fn tool_call(
        server: impl Into<String>,
        tool: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ToolCall {
            server: server.into(),
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Whether the failure happened at the transport layer (the session is unusable)
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Io(_))
    }
}
