//! In-memory fakes for the handler and negotiator seams

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use k2so_core::{GenerationOptions, K2soError, K2soResult, Model, ModelConfig};
use k2so_mcp::{ToolDescriptor, ToolProvider};
use k2so_tools::{ClusterInventory, CommandOutput, CommandRunner};
use k2so_triggers::{ChatPlatform, Menu, MessageRef, PlatformError};

#[derive(Debug, Clone, PartialEq)]
pub enum Posted {
    Text { channel: String, text: String },
    Menu { channel: String, menu: Menu },
    Deleted { channel: String, ts: String },
}

#[derive(Default)]
pub struct FakePlatform {
    pub log: Mutex<Vec<Posted>>,
    next_ts: AtomicUsize,
    /// When set, `delete_message` fails without touching the log
    pub fail_deletes: AtomicBool,
}

impl FakePlatform {
    pub fn posts(&self) -> Vec<Posted> {
        self.log.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.posts()
            .into_iter()
            .filter_map(|p| match p {
                Posted::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn menus(&self) -> Vec<Menu> {
        self.posts()
            .into_iter()
            .filter_map(|p| match p {
                Posted::Menu { menu, .. } => Some(menu),
                _ => None,
            })
            .collect()
    }

    pub fn failing_deletes() -> Self {
        let platform = Self::default();
        platform.fail_deletes.store(true, Ordering::SeqCst);
        platform
    }

    pub fn clear(&self) {
        self.log.lock().unwrap().clear();
    }

    fn message_ref(&self, channel: &str) -> MessageRef {
        let n = self.next_ts.fetch_add(1, Ordering::SeqCst);
        MessageRef {
            channel: channel.to_string(),
            ts: format!("1700000000.{:06}", n),
        }
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    fn platform_name(&self) -> &'static str {
        "fake"
    }

    async fn post_text(&self, channel: &str, text: &str) -> Result<MessageRef, PlatformError> {
        self.log.lock().unwrap().push(Posted::Text {
            channel: channel.to_string(),
            text: text.to_string(),
        });
        Ok(self.message_ref(channel))
    }

    async fn post_menu(&self, channel: &str, menu: &Menu) -> Result<MessageRef, PlatformError> {
        self.log.lock().unwrap().push(Posted::Menu {
            channel: channel.to_string(),
            menu: menu.clone(),
        });
        Ok(self.message_ref(channel))
    }

    async fn delete_message(&self, channel: &str, ts: &str) -> Result<(), PlatformError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(PlatformError::ApiError("message_not_found".to_string()));
        }
        self.log.lock().unwrap().push(Posted::Deleted {
            channel: channel.to_string(),
            ts: ts.to_string(),
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeInventory {
    pub namespaces: Vec<String>,
    pub pods: HashMap<String, Vec<String>>,
    pub deployments: HashMap<String, Vec<String>>,
    pub fail: bool,
}

impl FakeInventory {
    pub fn cluster() -> Self {
        let mut pods = HashMap::new();
        pods.insert("prod".to_string(), vec!["web-1".to_string(), "web-2".to_string()]);
        let mut deployments = HashMap::new();
        deployments.insert("prod".to_string(), vec!["api".to_string()]);
        Self {
            namespaces: vec!["default".into(), "prod".into(), "empty".into()],
            pods,
            deployments,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn check(&self) -> K2soResult<()> {
        if self.fail {
            Err(K2soError::tool("connection refused"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ClusterInventory for FakeInventory {
    async fn namespaces(&self) -> K2soResult<Vec<String>> {
        self.check()?;
        Ok(self.namespaces.clone())
    }

    async fn pods(&self, namespace: &str) -> K2soResult<Vec<String>> {
        self.check()?;
        Ok(self.pods.get(namespace).cloned().unwrap_or_default())
    }

    async fn deployments(&self, namespace: &str) -> K2soResult<Vec<String>> {
        self.check()?;
        Ok(self.deployments.get(namespace).cloned().unwrap_or_default())
    }
}

/// Records every command and answers with fixed output
#[derive(Default)]
pub struct FakeRunner {
    pub commands: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, command: &str) -> K2soResult<CommandOutput> {
        self.commands.lock().unwrap().push(command.to_string());
        Ok(CommandOutput {
            exit_code: 0,
            stdout: format!("ran: {}", command),
            stderr: String::new(),
            success: true,
            truncated: false,
        })
    }
}

/// Replays scripted replies in order and records each prompt
pub struct FakeModel {
    config: ModelConfig,
    replies: Mutex<VecDeque<K2soResult<String>>>,
    pub calls: Mutex<Vec<(String, GenerationOptions)>>,
}

impl FakeModel {
    pub fn new(replies: Vec<K2soResult<String>>) -> Self {
        Self {
            config: ModelConfig::default(),
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn calls(&self) -> Vec<(String, GenerationOptions)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Model for FakeModel {
    async fn generate(&self, prompt: &str, options: GenerationOptions) -> K2soResult<String> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), options));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(K2soError::model("no scripted reply left")))
    }

    fn config(&self) -> &ModelConfig {
        &self.config
    }
}

/// Tool servers with canned results; a `None` result makes the call fail
#[derive(Default)]
pub struct FakeTools {
    pub servers: BTreeMap<String, Vec<ToolDescriptor>>,
    pub results: HashMap<(String, String), Option<String>>,
    pub calls: Mutex<Vec<(String, String, Value)>>,
}

impl FakeTools {
    pub fn with_tool(mut self, server: &str, tool: &str, result: Option<&str>) -> Self {
        self.servers
            .entry(server.to_string())
            .or_default()
            .push(ToolDescriptor::new(tool, format!("{} tool", tool), json!({"type": "object"})));
        self.results.insert(
            (server.to_string(), tool.to_string()),
            result.map(str::to_string),
        );
        self
    }

    /// The bundled time and joke servers
    pub fn standard() -> Self {
        Self::default()
            .with_tool(
                "time",
                "get_current_time",
                Some(r#"{"human_readable": "02:30 PM on Friday, January 17, 2025", "day_of_week": "Friday"}"#),
            )
            .with_tool("time", "get_timestamp", Some(r#"{"unix_timestamp": 1737124200}"#))
            .with_tool(
                "joke",
                "get_random_joke",
                Some(r#"{"setup": "Why do programmers prefer dark mode?", "punchline": "Because light attracts bugs!"}"#),
            )
    }

    pub fn calls(&self) -> Vec<(String, String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolProvider for FakeTools {
    fn server_names(&self) -> Vec<String> {
        self.servers.keys().cloned().collect()
    }

    fn has_server(&self, name: &str) -> bool {
        self.servers.contains_key(name)
    }

    async fn list_tools(&self, server: &str) -> K2soResult<Vec<ToolDescriptor>> {
        self.servers
            .get(server)
            .cloned()
            .ok_or_else(|| K2soError::connection(server, "not registered"))
    }

    async fn list_all_tools(&self) -> BTreeMap<String, Vec<ToolDescriptor>> {
        self.servers.clone()
    }

    async fn call_tool(&self, server: &str, tool: &str, arguments: Value) -> K2soResult<String> {
        self.calls
            .lock()
            .unwrap()
            .push((server.to_string(), tool.to_string(), arguments));
        match self.results.get(&(server.to_string(), tool.to_string())) {
            Some(Some(result)) => Ok(result.clone()),
            Some(None) => Err(K2soError::tool_call(server, tool, "tool raised")),
            None => Err(K2soError::tool_call(server, tool, "unknown tool")),
        }
    }

    async fn cleanup(&self) {}
}
