//! Serve command - starts the K2SO Slack webhook server
//!
//! Builds the bot context (Slack adapter, cluster inventory, shell executor,
//! tool registry, language model) from a YAML config or the environment and
//! serves until Ctrl+C.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use k2so_core::{Model, ModelConfig, ModelProvider, ToolServerConfig};
use k2so_mcp::{McpRegistry, ToolProvider};
use k2so_tools::{
    ArgoCdClient, KubectlInventory, ShellExecutor, DEFAULT_MAX_OUTPUT_CHARS, DEFAULT_TIMEOUT_SECS,
};
use k2so_triggers::{AppState, BotContext, BotHandler, ChatPlatform, SlackConfig, SlackPlatform};

/// Server configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeConfig {
    /// API version (k2so.dev/v1)
    #[serde(rename = "apiVersion")]
    pub api_version: Option<String>,

    /// Kind (BotConfig)
    pub kind: Option<String>,

    #[serde(default)]
    pub metadata: ConfigMetadata,

    #[serde(default)]
    pub spec: ServeSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigMetadata {
    pub name: Option<String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeSpec {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub slack: SlackSection,

    #[serde(default)]
    pub model: ModelSection,

    #[serde(default)]
    pub executor: ExecutorSection,

    #[serde(default)]
    pub selection: SelectionSection,

    /// Extra tool servers launched on demand
    #[serde(default)]
    pub tool_servers: Vec<ToolServerConfig>,

    /// Register the time, joke and argocd servers shipped next to this binary
    #[serde(default = "default_true")]
    pub bundled_tools: bool,
}

impl Default for ServeSpec {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            slack: SlackSection::default(),
            model: ModelSection::default(),
            executor: ExecutorSection::default(),
            selection: SelectionSection::default(),
            tool_servers: Vec::new(),
            bundled_tools: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackSection {
    /// Bot token (or env var name with _env suffix)
    pub bot_token: Option<String>,
    #[serde(default = "default_bot_token_env")]
    pub bot_token_env: Option<String>,

    /// Signing secret (or env var name)
    pub signing_secret: Option<String>,
    #[serde(default = "default_signing_secret_env")]
    pub signing_secret_env: Option<String>,

    /// Detected via auth.test when omitted
    pub bot_user_id: Option<String>,
}

impl Default for SlackSection {
    fn default() -> Self {
        Self {
            bot_token: None,
            bot_token_env: default_bot_token_env(),
            signing_secret: None,
            signing_secret_env: default_signing_secret_env(),
            bot_user_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSection {
    #[serde(default)]
    pub provider: ModelProvider,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,

    pub endpoint: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            provider: ModelProvider::default(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            endpoint: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_model_timeout(),
        }
    }
}

impl ModelSection {
    pub fn to_model_config(&self) -> ModelConfig {
        ModelConfig {
            model: self.model.clone(),
            provider: self.provider,
            api_key: resolve_env_value(None, self.api_key_env.as_deref()),
            endpoint: self.endpoint.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout_secs: self.timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorSection {
    #[serde(default = "default_executor_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_executor_timeout(),
            max_output_chars: default_max_output_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionSection {
    /// Conversations idle longer than this lose their menu selections
    #[serde(default = "default_idle_ttl")]
    pub idle_ttl_secs: u64,

    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for SelectionSection {
    fn default() -> Self {
        Self {
            idle_ttl_secs: default_idle_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_true() -> bool {
    true
}

fn default_bot_token_env() -> Option<String> {
    Some("SLACK_BOT_TOKEN".to_string())
}

fn default_signing_secret_env() -> Option<String> {
    Some("SLACK_SIGNING_SECRET".to_string())
}

fn default_api_key_env() -> Option<String> {
    Some("GEMINI_API_KEY".to_string())
}

fn default_model() -> String {
    ModelConfig::default().model
}

fn default_temperature() -> f32 {
    ModelConfig::default().temperature
}

fn default_max_tokens() -> u32 {
    ModelConfig::default().max_tokens
}

fn default_model_timeout() -> u64 {
    ModelConfig::default().timeout_secs
}

fn default_executor_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_output_chars() -> usize {
    DEFAULT_MAX_OUTPUT_CHARS
}

fn default_idle_ttl() -> u64 {
    30 * 60
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            api_version: Some("k2so.dev/v1".to_string()),
            kind: Some("BotConfig".to_string()),
            metadata: ConfigMetadata::default(),
            spec: ServeSpec::default(),
        }
    }
}

impl ServeConfig {
    /// Read the YAML file, or fall back to environment-driven defaults
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path))?;
                serde_yaml::from_str(&content)
                    .with_context(|| format!("Invalid config file {}", path))
            }
            None => Ok(Self::default()),
        }
    }
}

/// Resolve a value that can come from config or environment variable
pub fn resolve_env_value(direct: Option<&str>, env_name: Option<&str>) -> Option<String> {
    if let Some(val) = direct.filter(|v| !v.is_empty()) {
        return Some(val.to_string());
    }

    env_name
        .and_then(|var| std::env::var(var).ok())
        .filter(|v| !v.is_empty())
}

/// Fill empty env overlay entries from the bot's own environment
///
/// `env: { GITHUB_TOKEN: "" }` passes the bot's GITHUB_TOKEN through to that
/// server without writing the secret into the config file.
pub fn fill_env_overlay(
    mut config: ToolServerConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> ToolServerConfig {
    for (key, value) in config.env.iter_mut() {
        if value.is_empty() {
            match lookup(key) {
                Some(found) => *value = found,
                None => warn!(server = %config.name, var = %key, "Requested env var is not set"),
            }
        }
    }
    config
}

/// Bundled tool server binaries and the server names they register under
const BUNDLED_SERVERS: &[(&str, &str)] = &[
    ("time", "time-mcp"),
    ("joke", "joke-mcp"),
    ("argocd", "argocd-mcp"),
];

fn locate_binary(dir: Option<&Path>, binary: &str) -> Option<PathBuf> {
    let file = format!("{}{}", binary, std::env::consts::EXE_SUFFIX);
    dir.map(|d| d.join(&file))
        .filter(|p| p.is_file())
        .or_else(|| which::which(binary).ok())
}

/// Registrations for the bundled servers found in `dir` (or PATH)
///
/// The argocd server is only offered when the argocd CLI itself is installed.
pub fn bundled_tool_servers(dir: Option<&Path>, argocd_available: bool) -> Vec<ToolServerConfig> {
    BUNDLED_SERVERS
        .iter()
        .filter(|(name, _)| {
            if *name == "argocd" && !argocd_available {
                info!("argocd CLI not found; ArgoCD tools disabled");
                return false;
            }
            true
        })
        .filter_map(|(name, binary)| match locate_binary(dir, binary) {
            Some(path) => Some(ToolServerConfig::new(*name, path.to_string_lossy())),
            None => {
                warn!(server = %name, binary = %binary, "Bundled tool server binary not found");
                None
            }
        })
        .collect()
}

/// Register configured and bundled tool servers
///
/// A configured server shadows a bundled one with the same name.
pub fn build_registry(spec: &ServeSpec) -> anyhow::Result<McpRegistry> {
    let registry = McpRegistry::new();

    for server in &spec.tool_servers {
        let server = fill_env_overlay(server.clone(), |var| std::env::var(var).ok());
        registry
            .register(server)
            .context("Invalid tool server registration")?;
    }

    if spec.bundled_tools {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf));
        let argocd_available = ArgoCdClient::new().is_available();

        for server in bundled_tool_servers(exe_dir.as_deref(), argocd_available) {
            if registry.has_server(&server.name) {
                continue;
            }
            registry.register(server)?;
        }
    }

    Ok(registry)
}

fn build_model(section: &ModelSection) -> Option<Arc<dyn Model>> {
    match k2so_llm::create_model(section.to_model_config()) {
        Ok(model) => {
            info!(model = %section.model, "Language model configured");
            Some(Arc::from(model))
        }
        Err(e) => {
            warn!(error = %e, "Assistant disabled");
            None
        }
    }
}

async fn build_slack(section: &SlackSection) -> anyhow::Result<Arc<SlackPlatform>> {
    let bot_token = resolve_env_value(section.bot_token.as_deref(), section.bot_token_env.as_deref())
        .ok_or_else(|| anyhow!("Slack bot token not configured (set bot_token or SLACK_BOT_TOKEN)"))?;
    let signing_secret = resolve_env_value(
        section.signing_secret.as_deref(),
        section.signing_secret_env.as_deref(),
    )
    .ok_or_else(|| {
        anyhow!("Slack signing secret not configured (set signing_secret or SLACK_SIGNING_SECRET)")
    })?;

    let mut config = SlackConfig::new(bot_token, signing_secret);
    config.bot_user_id = section.bot_user_id.clone().unwrap_or_default();

    let platform = SlackPlatform::new_with_auto_detection(config)
        .await
        .context("Failed to create Slack platform")?;
    Ok(Arc::new(platform))
}

/// Execute the serve command
pub async fn execute(
    config_file: Option<&str>,
    port: Option<u16>,
    host: Option<&str>,
) -> anyhow::Result<()> {
    if let Some(path) = config_file {
        println!("Loading configuration from: {}", path);
    }
    let config = ServeConfig::load(config_file)?;
    let spec = &config.spec;

    // Apply CLI overrides
    let server_port = port.unwrap_or(spec.server.port);
    let server_host = host.unwrap_or(&spec.server.host);
    let bind_addr: SocketAddr = format!("{}:{}", server_host, server_port)
        .parse()
        .map_err(|e| anyhow!("Invalid bind address: {}", e))?;

    println!("Starting K2SO bot");
    println!("  Bind address: {}", bind_addr);

    let slack = build_slack(&spec.slack).await?;

    let inventory = KubectlInventory::new();
    if !inventory.is_available() {
        warn!("kubectl not found in PATH; menus will fail to list cluster resources");
    }
    let runner = ShellExecutor::new()
        .with_timeout(Duration::from_secs(spec.executor.timeout_secs))
        .with_max_output_chars(spec.executor.max_output_chars);

    let registry = build_registry(spec)?;
    let tools: Option<Arc<dyn ToolProvider>> = if registry.is_empty() {
        warn!("No tool servers registered");
        None
    } else {
        println!("  Tool servers: {}", registry.server_names().join(", "));
        Some(Arc::new(registry))
    };
    let model = build_model(&spec.model);

    let ctx = Arc::new(
        BotContext::new(
            slack.clone() as Arc<dyn ChatPlatform>,
            Arc::new(inventory),
            Arc::new(runner),
        )
        .with_assistant(model, tools),
    );
    ctx.start_eviction(
        Duration::from_secs(spec.selection.idle_ttl_secs),
        Duration::from_secs(spec.selection.sweep_interval_secs),
    );

    let state = AppState::new(slack, BotHandler::new(ctx.clone()));

    println!("  Health check: http://{}/health", bind_addr);
    println!("Press Ctrl+C to stop");

    let outcome = tokio::select! {
        result = k2so_triggers::serve(bind_addr, state) => {
            result.map_err(|e| anyhow!("Server error: {}", e))
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "Failed to listen for Ctrl+C");
            }
            println!("\nShutdown signal received, stopping server...");
            Ok(())
        }
    };

    ctx.shutdown().await;
    println!("Server stopped");
    outcome
}
