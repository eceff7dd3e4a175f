//! Free-text assistant for direct messages

pub mod fallback;
pub mod instructions;
pub mod negotiator;
pub mod parse;

pub use fallback::{detect_intent, FallbackIntent};
pub use instructions::tool_instruction;
pub use negotiator::{
    tool_footer, Negotiator, GENERIC_ERROR_MESSAGE, INVALID_SERVER_MESSAGE,
    NOT_CONFIGURED_MESSAGE, TOOL_FAILURE_MESSAGE, TOOL_SELECTION_TEMPERATURE,
};
pub use parse::{parse_decision, parse_tool_request, ModelDecision, ToolInvocationRequest};
