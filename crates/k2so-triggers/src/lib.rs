//! K2SO Triggers - chat front end for the ops bot
//!
//! - [`selection`]: menu-driven kubectl command construction
//! - [`assistant`]: model/tool negotiation for direct messages
//! - [`platforms`]: chat platform trait and the Slack adapter
//! - [`handler`]: event routing over a shared [`BotContext`]
//! - [`server`]: axum routes for Slack webhooks

pub mod assistant;
pub mod handler;
pub mod platforms;
pub mod selection;
pub mod server;

pub use assistant::Negotiator;
pub use handler::{best_effort, BotContext, BotHandler};
pub use platforms::{
    ActionId, ChatPlatform, InboundEvent, Menu, MessageRef, PlatformError, SlackConfig,
    SlackPlatform,
};
pub use selection::{
    transition, CommandCatalog, ConversationFlow, ConversationSelection, Effect, FlowState,
    SelectionError, SelectionEvent, SelectionField, SelectionStore, ShellCommand,
};
pub use server::{router, serve, AppState};
