// K2SO Core - shared types and traits for the K2SO chat-ops bot
//
// Everything here is transport-agnostic: errors, tool server registrations,
// and the language-model abstraction.

pub mod error;
pub mod mcp;
pub mod model;

pub use error::{K2soError, K2soResult};
pub use mcp::ToolServerConfig;
pub use model::{GenerationOptions, Model, ModelConfig, ModelProvider};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
