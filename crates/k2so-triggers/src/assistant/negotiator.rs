//! Model ↔ tool negotiation for direct messages
//!
//! One round: the model sees the tool catalog and either answers or asks for
//! a single tool call; the tool result then goes back to the model for the
//! final wording.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use k2so_core::{GenerationOptions, K2soResult, Model};
use k2so_mcp::{ToolDescriptor, ToolProvider};

use super::fallback::detect_intent;
use super::instructions::tool_instruction;
use super::parse::{parse_decision, ModelDecision};

pub const NOT_CONFIGURED_MESSAGE: &str =
    "Sorry, the AI assistant is not configured. Please contact the administrator.";
pub const INVALID_SERVER_MESSAGE: &str =
    "Sorry, I tried to use a tool that isn't available right now.";
pub const TOOL_FAILURE_MESSAGE: &str =
    "Sorry, I had trouble using that tool. Please try again later.";
pub const GENERIC_ERROR_MESSAGE: &str =
    "Sorry, I encountered an error while processing your message. Please try again.";

/// Sampling temperature for the tool-selection call
pub const TOOL_SELECTION_TEMPERATURE: f32 = 0.3;

/// Tool descriptions in the catalog prompt are cut to this many characters
pub const MAX_DESCRIPTION_CHARS: usize = 100;

pub fn tool_footer(server: &str, tool: &str) -> String {
    format!("\n\n_🔧 Used tool: {}.{}_", server, tool)
}

pub struct Negotiator {
    model: Option<Arc<dyn Model>>,
    tools: Option<Arc<dyn ToolProvider>>,
}

impl Negotiator {
    pub fn new(model: Option<Arc<dyn Model>>, tools: Option<Arc<dyn ToolProvider>>) -> Self {
        Self { model, tools }
    }

    pub fn is_configured(&self) -> bool {
        self.model.is_some()
    }

    /// Answer a free-text message. Never fails; errors become an apology.
    pub async fn respond(&self, message: &str) -> String {
        let Some(model) = self.model.as_deref() else {
            return NOT_CONFIGURED_MESSAGE.to_string();
        };

        match self.negotiate(model, message).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "Assistant negotiation failed");
                GENERIC_ERROR_MESSAGE.to_string()
            }
        }
    }

    async fn negotiate(&self, model: &dyn Model, message: &str) -> K2soResult<String> {
        let conversational = model.default_options();

        let Some(tools) = self.tools.as_deref() else {
            return model.generate(message, conversational).await;
        };

        let catalog = tools.list_all_tools().await;
        if catalog.values().all(Vec::is_empty) {
            debug!("No tools discovered, answering directly");
            return model.generate(message, conversational).await;
        }

        let selection = GenerationOptions {
            temperature: TOOL_SELECTION_TEMPERATURE,
            ..conversational
        };
        let raw = model
            .generate(&build_selection_prompt(&catalog, message), selection)
            .await?;

        match parse_decision(&raw) {
            ModelDecision::UseTool {
                server,
                tool,
                arguments,
            } => {
                self.answer_with_tool(model, tools, message, &server, &tool, arguments)
                    .await
            }
            ModelDecision::Answer(answer) => Ok(self.fallback(tools, message, answer).await),
            ModelDecision::Unstructured => Ok(self.fallback(tools, message, raw).await),
        }
    }

    async fn answer_with_tool(
        &self,
        model: &dyn Model,
        tools: &dyn ToolProvider,
        message: &str,
        server: &str,
        tool: &str,
        arguments: Value,
    ) -> K2soResult<String> {
        if !tools.has_server(server) {
            warn!(server = %server, tool = %tool, "Model requested an unregistered tool server");
            return Ok(INVALID_SERVER_MESSAGE.to_string());
        }

        info!(server = %server, tool = %tool, "Calling tool for assistant");
        let result = match tools.call_tool(server, tool, arguments).await {
            Ok(result) => result,
            Err(e) => {
                error!(server = %server, tool = %tool, error = %e, "Tool call failed");
                return Ok(TOOL_FAILURE_MESSAGE.to_string());
            }
        };

        let footer = tool_footer(server, tool);
        let prompt = build_answer_prompt(message, server, tool, &result);
        match model.generate(&prompt, model.default_options()).await {
            Ok(answer) => Ok(format!("{}{}", answer.trim(), footer)),
            Err(e) => {
                warn!(server = %server, tool = %tool, error = %e, "Follow-up generation failed, returning raw tool result");
                Ok(format!("{}{}", result, footer))
            }
        }
    }

    /// Force a time or joke tool when the message obviously needs one
    async fn fallback(&self, tools: &dyn ToolProvider, message: &str, reply: String) -> String {
        let Some(intent) = detect_intent(message) else {
            return reply;
        };
        let (server, tool) = (intent.server(), intent.tool());
        if !tools.has_server(server) {
            return reply;
        }

        debug!(server = %server, tool = %tool, "Keyword fallback engaged");
        match tools.call_tool(server, tool, json!({})).await {
            Ok(result) => {
                let body = intent.render(&result).unwrap_or(result);
                format!("{}{}", body, tool_footer(server, tool))
            }
            Err(e) => {
                warn!(server = %server, tool = %tool, error = %e, "Fallback tool call failed");
                reply
            }
        }
    }
}

fn truncate_description(description: &str) -> String {
    if description.chars().count() <= MAX_DESCRIPTION_CHARS {
        description.to_string()
    } else {
        let cut: String = description.chars().take(MAX_DESCRIPTION_CHARS).collect();
        format!("{}...", cut)
    }
}

pub fn build_selection_prompt(
    catalog: &BTreeMap<String, Vec<ToolDescriptor>>,
    message: &str,
) -> String {
    let mut listing = String::new();
    for (server, tools) in catalog.iter().filter(|(_, tools)| !tools.is_empty()) {
        listing.push_str(&format!("\n{}:\n", server));
        for tool in tools {
            listing.push_str(&format!(
                "- {}.{}: {}\n",
                server,
                tool.name,
                truncate_description(&tool.description)
            ));
        }
    }

    format!(
        "You are a helpful DevOps assistant with access to these tools:\n{listing}\n\
         Decide whether answering the user's message needs exactly one of these tools.\n\
         Respond with JSON only, no markdown and no extra text.\n\
         To use a tool:\n\
         {{\"use_tool\": true, \"server\": \"<server>\", \"tool\": \"<tool>\", \"arguments\": {{}}}}\n\
         To answer directly:\n\
         {{\"use_tool\": false, \"response\": \"<your answer>\"}}\n\n\
         User message: {message}"
    )
}

pub fn build_answer_prompt(message: &str, server: &str, tool: &str, result: &str) -> String {
    let hint = tool_instruction(server, tool);
    let hint = if hint.is_empty() {
        String::new()
    } else {
        format!("\nHow to present it:\n{}\n", hint)
    };

    format!(
        "The user asked: {message}\n\n\
         Data retrieved for this question:\n{result}\n{hint}\n\
         Answer the user in a natural, friendly way using this data. \
         Do not mention tools, servers or function names."
    )
}
