//! Chat platform abstraction
//!
//! The handler talks to a [`ChatPlatform`]; inbound webhooks are parsed by
//! the concrete adapter into [`InboundEvent`]s.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod slack;

pub use slack::{SlackConfig, SlackPlatform};

/// Platform-specific errors
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("API error: {0}")]
    ApiError(String),
}

/// Identifies which menu an interaction came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionId {
    #[serde(rename = "kubectl_command_select")]
    CommandSelect,
    #[serde(rename = "kubectl_sub_command_select")]
    SubCommandSelect,
    #[serde(rename = "kubectl_namespace_select")]
    NamespaceSelect,
    #[serde(rename = "kubectl_pod_select")]
    PodSelect,
    #[serde(rename = "kubectl_deployment_select")]
    DeploymentSelect,
}

impl ActionId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CommandSelect => "kubectl_command_select",
            Self::SubCommandSelect => "kubectl_sub_command_select",
            Self::NamespaceSelect => "kubectl_namespace_select",
            Self::PodSelect => "kubectl_pod_select",
            Self::DeploymentSelect => "kubectl_deployment_select",
        }
    }

    pub fn parse(action_id: &str) -> Option<Self> {
        [
            Self::CommandSelect,
            Self::SubCommandSelect,
            Self::NamespaceSelect,
            Self::PodSelect,
            Self::DeploymentSelect,
        ]
        .into_iter()
        .find(|a| a.as_str() == action_id)
    }
}

/// A single-choice dropdown; each option's label is also its value
#[derive(Debug, Clone, PartialEq)]
pub struct Menu {
    pub prompt: String,
    pub placeholder: String,
    pub action: ActionId,
    pub options: Vec<String>,
}

impl Menu {
    pub fn new(
        prompt: impl Into<String>,
        placeholder: impl Into<String>,
        action: ActionId,
        options: Vec<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            placeholder: placeholder.into(),
            action,
            options,
        }
    }

    pub fn commands(user: &str, options: Vec<String>) -> Self {
        Self::new(
            format!("Hello <@{}>! Select a kubectl command:", user),
            "Select a command",
            ActionId::CommandSelect,
            options,
        )
    }

    pub fn sub_commands(options: Vec<String>) -> Self {
        Self::new(
            "Please select a sub-command:",
            "Select a sub-command",
            ActionId::SubCommandSelect,
            options,
        )
    }

    pub fn namespaces(options: Vec<String>) -> Self {
        Self::new(
            "Please select a namespace:",
            "Select a namespace",
            ActionId::NamespaceSelect,
            options,
        )
    }

    pub fn pods(options: Vec<String>) -> Self {
        Self::new("Please select a pod:", "Select a pod", ActionId::PodSelect, options)
    }

    pub fn deployments(options: Vec<String>) -> Self {
        Self::new(
            "Please select a deployment:",
            "Select a deployment",
            ActionId::DeploymentSelect,
            options,
        )
    }
}

/// Handle to a posted message, used for later deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub channel: String,
    pub ts: String,
}

/// Normalized inbound traffic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    UrlVerification {
        challenge: String,
    },
    Mention {
        conversation: String,
        user: String,
    },
    DirectMessage {
        conversation: String,
        user: String,
        text: String,
    },
    Action {
        conversation: String,
        action: ActionId,
        value: String,
    },
    SlashCommand {
        conversation: String,
        user: String,
        text: String,
    },
    /// Bot echoes, edits, unknown actions and other traffic with nothing to do
    Ignored,
}

/// Outbound messaging
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    fn platform_name(&self) -> &'static str;

    async fn post_text(&self, channel: &str, text: &str) -> Result<MessageRef, PlatformError>;

    async fn post_menu(&self, channel: &str, menu: &Menu) -> Result<MessageRef, PlatformError>;

    async fn delete_message(&self, channel: &str, ts: &str) -> Result<(), PlatformError>;
}
