//! Central event handler
//!
//! Routes normalized inbound events to the menu flow or the assistant and
//! posts the results back through the [`ChatPlatform`]. Entry points return
//! `Result` for testing, but [`BotHandler::handle_event`] only logs failures.

use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use k2so_core::Model;
use k2so_mcp::ToolProvider;
use k2so_tools::{format_for_chat, ClusterInventory, CommandRunner};

use crate::assistant::{Negotiator, NOT_CONFIGURED_MESSAGE};
use crate::platforms::{ActionId, ChatPlatform, InboundEvent, Menu, PlatformError};
use crate::selection::{
    transition, CommandCatalog, Effect, SelectionEvent, SelectionStore, ShellCommand,
};

pub const THINKING_MESSAGE: &str = "🤔 Thinking...";

/// Run a fallible side effect whose failure doesn't matter to the user
pub async fn best_effort<F, T, E>(label: &str, fut: F)
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    if let Err(e) = fut.await {
        debug!(operation = %label, error = %e, "Best-effort operation failed");
    }
}

/// Everything the handler needs, built once at startup
pub struct BotContext {
    pub platform: Arc<dyn ChatPlatform>,
    pub store: Arc<SelectionStore>,
    pub catalog: CommandCatalog,
    pub inventory: Arc<dyn ClusterInventory>,
    pub runner: Arc<dyn CommandRunner>,
    pub negotiator: Negotiator,
    pub tools: Option<Arc<dyn ToolProvider>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl BotContext {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        inventory: Arc<dyn ClusterInventory>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            platform,
            store: Arc::new(SelectionStore::new()),
            catalog: CommandCatalog::default(),
            inventory,
            runner,
            negotiator: Negotiator::new(None, None),
            tools: None,
            sweeper: Mutex::new(None),
        }
    }

    pub fn with_catalog(mut self, catalog: CommandCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_store(mut self, store: Arc<SelectionStore>) -> Self {
        self.store = store;
        self
    }

    /// Configure the assistant; either half may be absent
    pub fn with_assistant(
        mut self,
        model: Option<Arc<dyn Model>>,
        tools: Option<Arc<dyn ToolProvider>>,
    ) -> Self {
        self.negotiator = Negotiator::new(model, tools.clone());
        self.tools = tools;
        self
    }

    /// Start the idle-selection sweeper; replaces any running one
    pub fn start_eviction(&self, max_idle: Duration, interval: Duration) {
        let handle = self.store.spawn_eviction(max_idle, interval);
        if let Ok(mut sweeper) = self.sweeper.lock() {
            if let Some(previous) = sweeper.replace(handle) {
                previous.abort();
            }
        }
    }

    /// Stop the sweeper and close every tool session
    pub async fn shutdown(&self) {
        let sweeper = self.sweeper.lock().ok().and_then(|mut s| s.take());
        if let Some(handle) = sweeper {
            handle.abort();
        }
        if let Some(tools) = &self.tools {
            tools.cleanup().await;
        }
        info!("Bot context shut down");
    }
}

#[derive(Clone)]
pub struct BotHandler {
    ctx: Arc<BotContext>,
}

impl BotHandler {
    pub fn new(ctx: Arc<BotContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<BotContext> {
        &self.ctx
    }

    /// Dispatch one event; errors are logged, never returned
    pub async fn handle_event(&self, event: InboundEvent) {
        let result = match event {
            InboundEvent::Mention { conversation, user }
            | InboundEvent::SlashCommand {
                conversation, user, ..
            } => self.handle_mention(&conversation, &user).await,
            InboundEvent::Action {
                conversation,
                action,
                value,
            } => self.handle_action(&conversation, action, value).await,
            InboundEvent::DirectMessage {
                conversation, text, ..
            } => self.handle_direct_message(&conversation, &text).await,
            InboundEvent::UrlVerification { .. } | InboundEvent::Ignored => Ok(()),
        };

        if let Err(e) = result {
            error!(
                platform = self.ctx.platform.platform_name(),
                error = %e,
                "Failed to handle event"
            );
        }
    }

    /// Greet the user with the command menu
    pub async fn handle_mention(&self, conversation: &str, user: &str) -> Result<(), PlatformError> {
        info!(conversation = %conversation, user = %user, "Starting kubectl menu");
        let menu = Menu::commands(user, self.ctx.catalog.command_names());
        self.ctx.platform.post_menu(conversation, &menu).await?;
        Ok(())
    }

    /// Apply a menu pick to the conversation's flow and act on the result
    pub async fn handle_action(
        &self,
        conversation: &str,
        action: ActionId,
        value: String,
    ) -> Result<(), PlatformError> {
        let event = match action {
            ActionId::CommandSelect => SelectionEvent::CommandChosen(value),
            ActionId::SubCommandSelect => SelectionEvent::SubCommandChosen(value),
            ActionId::NamespaceSelect => SelectionEvent::NamespaceChosen(value),
            ActionId::PodSelect => SelectionEvent::PodChosen(value),
            ActionId::DeploymentSelect => SelectionEvent::DeploymentChosen(value),
        };
        debug!(conversation = %conversation, event = ?event, "Menu selection");

        let current = self.ctx.store.get(conversation).unwrap_or_default();
        match transition(&self.ctx.catalog, &current, event) {
            Ok(next) => {
                self.ctx.store.put(conversation, next.flow);
                self.perform(conversation, next.effect).await
            }
            Err(e) => {
                warn!(conversation = %conversation, error = %e, "Rejected menu selection");
                self.ctx
                    .platform
                    .post_text(conversation, &e.user_message())
                    .await?;
                Ok(())
            }
        }
    }

    async fn perform(&self, conversation: &str, effect: Effect) -> Result<(), PlatformError> {
        let platform = &self.ctx.platform;
        let inventory = &self.ctx.inventory;

        match effect {
            Effect::PromptSubCommands { options, .. } => {
                platform
                    .post_menu(conversation, &Menu::sub_commands(options))
                    .await?;
            }
            Effect::PromptNamespaces => match inventory.namespaces().await {
                Ok(names) if names.is_empty() => {
                    platform.post_text(conversation, "No namespaces found.").await?;
                }
                Ok(names) => {
                    platform.post_menu(conversation, &Menu::namespaces(names)).await?;
                }
                Err(e) => {
                    platform
                        .post_text(conversation, &format!("Failed to list namespaces: {}", e))
                        .await?;
                }
            },
            Effect::PromptPods { namespace } => match inventory.pods(&namespace).await {
                Ok(names) if names.is_empty() => {
                    platform
                        .post_text(
                            conversation,
                            &format!("No pods found in namespace `{}`.", namespace),
                        )
                        .await?;
                }
                Ok(names) => {
                    platform.post_menu(conversation, &Menu::pods(names)).await?;
                }
                Err(e) => {
                    platform
                        .post_text(conversation, &format!("Failed to list pods: {}", e))
                        .await?;
                }
            },
            Effect::PromptDeployments { namespace } => {
                match inventory.deployments(&namespace).await {
                    Ok(names) if names.is_empty() => {
                        platform
                            .post_text(
                                conversation,
                                &format!("No deployments found in namespace `{}`.", namespace),
                            )
                            .await?;
                    }
                    Ok(names) => {
                        platform
                            .post_menu(conversation, &Menu::deployments(names))
                            .await?;
                    }
                    Err(e) => {
                        platform
                            .post_text(conversation, &format!("Failed to list deployments: {}", e))
                            .await?;
                    }
                }
            }
            Effect::Execute(command) => self.execute(conversation, &command).await?,
        }
        Ok(())
    }

    async fn execute(&self, conversation: &str, command: &ShellCommand) -> Result<(), PlatformError> {
        let line = command.to_shell_string();
        info!(conversation = %conversation, command = %line, "Executing menu command");

        self.ctx
            .platform
            .post_text(conversation, &format!("Running `{}`", line))
            .await?;

        let result = self.ctx.runner.run(&line).await;
        if let Err(e) = &result {
            warn!(command = %line, error = %e, "Command failed to run");
        }

        self.ctx
            .platform
            .post_text(conversation, &format_for_chat(&result))
            .await?;
        Ok(())
    }

    /// Free-text conversation with the assistant
    pub async fn handle_direct_message(
        &self,
        conversation: &str,
        text: &str,
    ) -> Result<(), PlatformError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let platform = &self.ctx.platform;

        match text.to_lowercase().as_str() {
            "/tools status" => {
                platform.post_text(conversation, &self.tools_status().await).await?;
                return Ok(());
            }
            "/tools list" => {
                platform.post_text(conversation, &self.tools_list().await).await?;
                return Ok(());
            }
            _ => {}
        }

        if !self.ctx.negotiator.is_configured() {
            platform.post_text(conversation, NOT_CONFIGURED_MESSAGE).await?;
            return Ok(());
        }

        let placeholder = platform.post_text(conversation, THINKING_MESSAGE).await?;
        let reply = self.ctx.negotiator.respond(text).await;
        best_effort(
            "delete thinking placeholder",
            platform.delete_message(&placeholder.channel, &placeholder.ts),
        )
        .await;

        platform.post_text(conversation, &reply).await?;
        info!(conversation = %conversation, "Responded to direct message");
        Ok(())
    }

    async fn tools_status(&self) -> String {
        let Some(tools) = &self.ctx.tools else {
            return "No tool servers are configured.".to_string();
        };

        let catalog = tools.list_all_tools().await;
        let total: usize = catalog.values().map(Vec::len).sum();
        let mut text = format!(
            "📊 *Tools Status:*\n\n*Servers:* {}  *Tools:* {}\n",
            catalog.len(),
            total
        );
        for (server, descriptors) in &catalog {
            if descriptors.is_empty() {
                text.push_str(&format!("  ⚠️ `{}` - unavailable\n", server));
            } else {
                text.push_str(&format!(
                    "  ✅ `{}` - {} tool(s)\n",
                    server,
                    descriptors.len()
                ));
            }
        }
        text.push_str("\n💡 *Commands:*\n  • `/tools status` - Show this status\n  • `/tools list` - List all tools with details");
        text
    }

    async fn tools_list(&self) -> String {
        let Some(tools) = &self.ctx.tools else {
            return "No tool servers are configured.".to_string();
        };

        let catalog = tools.list_all_tools().await;
        if catalog.values().all(Vec::is_empty) {
            return "No tools are available right now.".to_string();
        }

        let mut text = String::from("🔧 *Available Tools:*\n");
        for (server, descriptors) in catalog.iter().filter(|(_, d)| !d.is_empty()) {
            text.push_str(&format!("\n*📁 {}*\n", server));
            for tool in descriptors {
                text.push_str(&format!("  • `{}` - {}\n", tool.name, tool.description));
            }
        }
        text
    }
}
